//! Commands exposed to the caller

use serde_json::Value;

use super::MethodResult;
use crate::core::StartParameters;
use crate::service::TaskManager;

pub const START_FOREGROUND_SERVICE: &str = "startForegroundService";
pub const STOP_FOREGROUND_SERVICE: &str = "stopForegroundService";

/// A recognized bridge command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start(StartParameters),
    Stop,
}

impl Command {
    /// Parse a method call. Returns `None` for unknown method names.
    pub fn parse(method: &str, args: &Value) -> Option<Self> {
        match method {
            START_FOREGROUND_SERVICE => Some(Command::Start(StartParameters::from_value(args))),
            STOP_FOREGROUND_SERVICE => Some(Command::Stop),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Start(_) => START_FOREGROUND_SERVICE,
            Command::Stop => STOP_FOREGROUND_SERVICE,
        }
    }
}

/// Run a command against the task manager
pub fn execute(manager: &TaskManager, command: Command) -> MethodResult {
    let name = command.name();
    let outcome = match command {
        Command::Start(params) => manager.start(params),
        Command::Stop => manager.stop(),
    };

    match outcome {
        Ok(()) => MethodResult::success(true),
        Err(e) => {
            tracing::warn!(command = name, "Command failed: {}", e);
            MethodResult::error(e.code(), e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_start_with_args() {
        let command = Command::parse(
            "startForegroundService",
            &json!({"title": "T", "content": "C", "icon": "i"}),
        );
        assert_eq!(
            command,
            Some(Command::Start(StartParameters::new("T", "C", "i")))
        );
    }

    #[test]
    fn test_parse_start_without_args() {
        assert_eq!(
            Command::parse(START_FOREGROUND_SERVICE, &Value::Null),
            Some(Command::Start(StartParameters::default()))
        );
    }

    #[test]
    fn test_parse_stop_ignores_args() {
        assert_eq!(
            Command::parse(STOP_FOREGROUND_SERVICE, &json!({"title": "x"})),
            Some(Command::Stop)
        );
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(Command::parse("foo", &json!({})), None);
        assert_eq!(Command::parse("StartForegroundService", &json!({})), None);
    }

    #[test]
    fn test_command_names() {
        assert_eq!(Command::Stop.name(), "stopForegroundService");
        assert_eq!(
            Command::Start(StartParameters::default()).name(),
            "startForegroundService"
        );
    }
}
