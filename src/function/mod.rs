//! Function module
//!
//! The wrapped function is an external collaborator: it receives the parsed
//! request parameters and returns a JSON result or an error message.
//! Two implementations ship with the watchdog:
//! - `ProcessFunction` spawns a configured program per request
//! - `EchoFunction` returns the parameters unchanged

mod echo;
mod process;

pub use echo::EchoFunction;
pub use process::ProcessFunction;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::FunctionConfig;

/// Parsed request parameters, no schema beyond "JSON object"
pub type Params = Map<String, Value>;

/// Failure reported by a function invocation
///
/// The `Display` output becomes the message of the error envelope.
#[derive(Debug, Error)]
pub enum FunctionError {
    /// Failure raised by the function itself, message passed through verbatim
    #[error("{0}")]
    Failed(String),
    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("function i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{}", exit_message(.code, .stderr))]
    Exit { code: Option<i32>, stderr: String },
    #[error("function returned invalid JSON: {0}")]
    InvalidOutput(serde_json::Error),
    #[error("function timed out after {0:?}")]
    Timeout(Duration),
}

#[allow(clippy::ref_option)]
fn exit_message(code: &Option<i32>, stderr: &str) -> String {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    match *code {
        Some(code) => format!("process exited with status {code}"),
        None => "process terminated by signal".to_string(),
    }
}

/// Something the watchdog can invoke
#[async_trait]
pub trait Function: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    async fn call(&self, params: Params) -> Result<Value, FunctionError>;
}

/// Build the function collaborator described by the configuration
pub fn from_config(config: &FunctionConfig) -> Arc<dyn Function> {
    match config.command {
        Some(ref command) => Arc::new(ProcessFunction::from_config(command, config)),
        None => Arc::new(EchoFunction),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_message_is_verbatim() {
        assert_eq!(FunctionError::Failed("boom".into()).to_string(), "boom");
    }

    #[test]
    fn test_exit_message_prefers_stderr() {
        let err = FunctionError::Exit {
            code: Some(1),
            stderr: "  division by zero\n".into(),
        };
        assert_eq!(err.to_string(), "division by zero");

        let err = FunctionError::Exit {
            code: Some(3),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "process exited with status 3");
    }

    #[test]
    fn test_timeout_message() {
        let err = FunctionError::Timeout(Duration::from_millis(750));
        assert_eq!(err.to_string(), "function timed out after 750ms");
    }

    #[test]
    fn test_from_config_selects_collaborator() {
        assert_eq!(from_config(&FunctionConfig::default()).name(), "echo");

        let config = FunctionConfig {
            command: Some("cat".into()),
            ..FunctionConfig::default()
        };
        assert_eq!(from_config(&config).name(), "cat");
    }
}
