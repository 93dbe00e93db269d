use manager_core::config::Config;
use manager_core::error::ManagerError;
use manager_rest::RestGateway;
use tracing::debug;

/// Create the manager gateway described by config.
pub fn create_gateway(config: &Config) -> Result<RestGateway, ManagerError> {
    let gateway = RestGateway::new(config)?;
    debug!("Using manager at {}", gateway.base_url());
    Ok(gateway)
}
