use manager_core::Config;

const SAMPLE_CONFIG: &str = r#"# flowctl configuration

manager:
  host: 10.0.0.5
  protocol: https
  # port defaults to 443 for https, 80 for http
  tenant: default_tenant
  username: admin
  password: admin

defaults:
  timeout_secs: 900
  batch_size: 100
  poll_interval_ms: 1000
  include_logs: false
"#;

pub fn run(path: bool, init: bool) -> anyhow::Result<()> {
    let config_path = Config::default_path();

    if path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config already exists at: {}", config_path.display());
            println!("Remove it first if you want to reinitialize.");
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&config_path, SAMPLE_CONFIG)?;
        println!("Sample config written to: {}", config_path.display());
        return Ok(());
    }

    println!("Config path: {}", config_path.display());
    if !config_path.exists() {
        println!("Status:      not found, using built-in defaults");
        println!("Run `flowctl config --init` to create one.");
    }

    let config = Config::load_default()?;
    println!("Manager:     {}", config.manager_url());
    println!(
        "Tenant:      {}",
        config.manager.tenant.as_deref().unwrap_or("-")
    );
    println!(
        "User:        {}",
        config.manager.username.as_deref().unwrap_or("-")
    );
    println!("Timeout:     {}s", config.defaults.timeout_secs);
    println!("Batch size:  {}", config.defaults.batch_size);

    Ok(())
}
