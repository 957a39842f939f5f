//! Formatting through the external `manyleb format <path>` tool.
//!
//! The formatter rewrites the file in place. We only run it and report the
//! outcome: stdout is discarded, stderr is kept for the error message, and
//! nothing is assumed about the file when the run fails.

use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use miette::Diagnostic;
use tokio::process::Command;

use crate::config::FormatterConfig;

#[derive(Debug, Clone)]
pub struct ExternalFormatter {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ExternalFormatter {
    pub fn new(config: &FormatterConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            timeout: config.timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `<command> <args...> <path>` to completion.
    ///
    /// The child is killed if the timeout expires or if the returned future
    /// is dropped before it resolves.
    pub async fn format_file(&self, path: &Path) -> Result<(), FormatError> {
        tracing::debug!(command = %self.command, path = %path.display(), "running formatter");

        let child = Command::new(&self.command)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FormatError::Spawn {
                command: self.command.clone(),
                message: e.to_string(),
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| FormatError::TimedOut {
                command: self.command.clone(),
                timeout: self.timeout,
            })?
            .map_err(|e| FormatError::Io(e.to_string()))?;

        if output.status.success() {
            tracing::debug!(path = %path.display(), "formatter finished");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::warn!(code = ?output.status.code(), %stderr, "formatter failed");
        Err(FormatError::Failed {
            path: path.to_path_buf(),
            code: output.status.code(),
            stderr,
        })
    }
}

#[derive(Debug)]
pub enum FormatError {
    /// The formatter could not be started at all.
    Spawn { command: String, message: String },
    /// The formatter ran and exited unsuccessfully.
    Failed {
        path: PathBuf,
        code: Option<i32>,
        stderr: String,
    },
    TimedOut { command: String, timeout: Duration },
    Io(String),
}

impl Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::Spawn { command, message } => {
                write!(f, "failed to start formatter '{}': {}", command, message)
            }
            FormatError::Failed { path, code, stderr } => {
                write!(f, "failed to format {}", path.display())?;
                if let Some(code) = code {
                    write!(f, " (exit status {})", code)?;
                }
                if !stderr.is_empty() {
                    write!(f, ": {}", stderr)?;
                }
                Ok(())
            }
            FormatError::TimedOut { command, timeout } => {
                write!(f, "formatter '{}' did not finish within {:?}", command, timeout)
            }
            FormatError::Io(e) => write!(f, "IO error while waiting for formatter: {}", e),
        }
    }
}

impl std::error::Error for FormatError {}

impl Diagnostic for FormatError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        let code = match self {
            FormatError::Spawn { .. } => "manyleb::format::spawn",
            FormatError::Failed { .. } => "manyleb::format::failed",
            FormatError::TimedOut { .. } => "manyleb::format::timeout",
            FormatError::Io(_) => "manyleb::format::io",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        match self {
            FormatError::Spawn { .. } => Some(Box::new(
                "install the manyleb CLI or set formatter.command in manyleb-ide.json",
            )),
            FormatError::TimedOut { .. } => Some(Box::new("raise formatter.timeoutSecs")),
            _ => None,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str) -> ExternalFormatter {
        ExternalFormatter::new(&FormatterConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string(), "sh".to_string()],
            timeout_secs: 10,
        })
    }

    #[tokio::test]
    async fn test_success_rewrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.manyleb");
        std::fs::write(&path, "object   A{}").unwrap();

        shell(r#"printf 'object A {\n}\n' > "$1""#)
            .format_file(&path)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "object A {\n}\n");
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.manyleb");
        std::fs::write(&path, "object").unwrap();

        let err = shell("echo 'Expected identifier.' >&2; exit 3")
            .format_file(&path)
            .await
            .unwrap_err();

        match &err {
            FormatError::Failed { code, stderr, .. } => {
                assert_eq!(*code, Some(3));
                assert_eq!(stderr, "Expected identifier.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("exit status 3"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "object");
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let formatter = ExternalFormatter::new(&FormatterConfig {
            command: "manyleb-formatter-that-does-not-exist".to_string(),
            ..FormatterConfig::default()
        });
        let err = formatter.format_file(Path::new("x.manyleb")).await.unwrap_err();
        assert!(matches!(err, FormatError::Spawn { .. }));
        assert!(err.help().is_some());
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.manyleb");

        let err = shell("sleep 5")
            .with_timeout(Duration::from_millis(100))
            .format_file(&path)
            .await
            .unwrap_err();
        assert!(matches!(err, FormatError::TimedOut { .. }));
    }
}
