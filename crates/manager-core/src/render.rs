use crate::error::ManagerError;
use crate::event::Event;

/// One-line human form of an event:
/// `<timestamp> <LOG|CFY> <deployment> [node.operation] LEVEL: text`
pub fn format_event(event: &Event) -> String {
    let ctx = &event.context;
    let timestamp = event
        .reported_timestamp
        .as_deref()
        .or(event.timestamp.as_deref())
        .unwrap_or("-");
    let indicator = if event.is_log() { "LOG" } else { "CFY" };

    let mut line = format!(
        "{} {} <{}> ",
        timestamp,
        indicator,
        ctx.deployment_id.as_deref().unwrap_or("")
    );

    match (&ctx.source_id, &ctx.target_id, &ctx.node_id) {
        (Some(source), Some(target), _) => {
            line.push_str(&format!(
                "[{}->{}|{}] ",
                source,
                target,
                ctx.operation.as_deref().unwrap_or("")
            ));
        }
        (_, _, Some(node_id)) => match &ctx.operation {
            Some(operation) => line.push_str(&format!("[{}.{}] ", node_id, operation)),
            None => line.push_str(&format!("[{}] ", node_id)),
        },
        _ => {}
    }

    if event.is_log() {
        if let Some(level) = &event.level {
            line.push_str(&format!("{}: ", level.to_uppercase()));
        }
    }

    line.push_str(&event.message.text);
    line
}

/// The adapted event as a single JSON line.
pub fn format_event_json(event: &Event) -> Result<String, ManagerError> {
    Ok(serde_json::to_string(event)?)
}
