//! Process-backed function
//!
//! Each invocation spawns the configured program, writes the parameters as
//! JSON to its stdin and reads one JSON value back from its stdout.
//! A non-zero exit status is a function failure whose message is the
//! program's stderr. The caller bounds the call; dropping it kills the child.

use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{Function, FunctionError, Params};
use crate::config::FunctionConfig;
use crate::logger;

pub struct ProcessFunction {
    command: String,
    args: Vec<String>,
    working_dir: Option<String>,
}

impl ProcessFunction {
    pub fn new(command: &str, args: Vec<String>) -> Self {
        Self {
            command: command.to_string(),
            args,
            working_dir: None,
        }
    }

    pub fn from_config(command: &str, config: &FunctionConfig) -> Self {
        let mut function = Self::new(command, config.args.clone());
        function.working_dir.clone_from(&config.working_dir);
        function
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl Function for ProcessFunction {
    fn name(&self) -> &str {
        &self.command
    }

    async fn call(&self, params: Params) -> Result<Value, FunctionError> {
        let input = serde_json::to_vec(&params)
            .map_err(|e| FunctionError::Failed(format!("failed to encode parameters: {e}")))?;

        let mut child = self
            .build_command()
            .spawn()
            .map_err(|source| FunctionError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        // Feed stdin on its own task so a chatty child cannot block on a full stdout pipe
        if let Some(mut stdin) = child.stdin.take() {
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&input).await {
                    // Programs that ignore their input close the pipe early
                    if e.kind() != std::io::ErrorKind::BrokenPipe {
                        logger::log_debug(&format!("Failed to write function stdin: {e}"));
                    }
                }
            });
        }

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(FunctionError::Exit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(FunctionError::InvalidOutput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: &Value) -> Params {
        value.as_object().cloned().unwrap_or_default()
    }

    fn sh(script: &str) -> ProcessFunction {
        ProcessFunction::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn test_params_are_passed_on_stdin() {
        let input = json!({"x": 1, "name": "watchdog"});
        let result = ProcessFunction::new("cat", Vec::new())
            .call(params(&input))
            .await
            .unwrap();
        assert_eq!(result, input);
    }

    #[tokio::test]
    async fn test_stdout_becomes_result() {
        let result = sh(r#"cat > /dev/null; echo '{"y": 2}'"#)
            .call(params(&json!({"x": 1})))
            .await
            .unwrap();
        assert_eq!(result, json!({"y": 2}));
    }

    #[tokio::test]
    async fn test_non_zero_exit_reports_stderr() {
        let err = sh("echo boom >&2; exit 1")
            .call(Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FunctionError::Exit { code: Some(1), .. }));
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_invalid_stdout() {
        let err = sh("echo not json").call(Params::new()).await.unwrap_err();
        assert!(matches!(err, FunctionError::InvalidOutput(_)));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = ProcessFunction::new("/nonexistent/watchdog-fprocess", Vec::new())
            .call(Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FunctionError::Spawn { .. }));
        assert!(err.to_string().contains("/nonexistent/watchdog-fprocess"));
    }
}
