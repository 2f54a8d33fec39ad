//! Assisted rewriting seam. The assistant is a black box that turns a source
//! configuration into a candidate for the target; whatever it returns is
//! validated before use.

use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::detect::Dialect;
use crate::interface_map::InterfaceMapping;

#[derive(Debug, Clone, Serialize)]
pub struct RewriteRequest {
    pub source_config: String,
    pub source_version: String,
    pub source_device: String,
    pub target_version: String,
    pub target_device: String,
    pub target_dialect: Dialect,
    pub interface_mapping: InterfaceMapping,
    pub strict_preserve: bool,
    #[serde(skip)]
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum AssistError {
    #[error("assistant timed out after {0:?}")]
    Timeout(Duration),
    #[error("assistant failed: {0}")]
    Failed(String),
    #[error("assistant i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("assistant output is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("failed to encode assistant request: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait AssistedRewriter: Send + Sync {
    fn rewrite(&self, request: &RewriteRequest) -> Result<String, AssistError>;
}

/// Runs an external program: the request as JSON on stdin, the candidate
/// configuration on stdout. The child is killed once the request deadline
/// passes.
#[derive(Debug, Clone)]
pub struct CommandRewriter {
    program: String,
    args: Vec<String>,
}

const POLL_INTERVAL: Duration = Duration::from_millis(20);

impl CommandRewriter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl AssistedRewriter for CommandRewriter {
    fn rewrite(&self, request: &RewriteRequest) -> Result<String, AssistError> {
        let deadline = Instant::now() + request.timeout;
        let payload = serde_json::to_vec(request)?;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        debug!(program = %self.program, bytes = payload.len(), "assistant started");

        if let Some(mut stdin) = child.stdin.take() {
            thread::spawn(move || {
                // A child that exits without reading closes the pipe; that is
                // reported through its exit status instead.
                let _ = stdin.write_all(&payload);
            });
        }
        let Some(mut stdout) = child.stdout.take() else {
            return Err(AssistError::Failed("assistant stdout unavailable".to_string()));
        };
        let (tx, rx) = bounded(1);
        thread::spawn(move || {
            let mut buf = Vec::new();
            let result = stdout.read_to_end(&mut buf).map(|_| buf);
            let _ = tx.send(result);
        });

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                warn!(program = %self.program, "assistant killed at deadline");
                return Err(AssistError::Timeout(request.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };
        if !status.success() {
            return Err(AssistError::Failed(format!("exited with {status}")));
        }

        let remaining = deadline.saturating_duration_since(Instant::now()).max(POLL_INTERVAL);
        let output = match rx.recv_timeout(remaining) {
            Ok(result) => result?,
            Err(RecvTimeoutError::Timeout) => return Err(AssistError::Timeout(request.timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(AssistError::Failed("assistant output lost".to_string()))
            }
        };
        Ok(String::from_utf8(output)?)
    }
}

/// Call `rewriter` on a worker thread and give up after `request.timeout`.
/// The worker is left to finish on its own when the deadline passes.
pub fn run_with_timeout(
    rewriter: Arc<dyn AssistedRewriter>,
    request: RewriteRequest,
) -> Result<String, AssistError> {
    let timeout = request.timeout;
    let (tx, rx) = bounded(1);
    thread::spawn(move || {
        let _ = tx.send(rewriter.rewrite(&request));
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(AssistError::Timeout(timeout)),
        Err(RecvTimeoutError::Disconnected) => {
            Err(AssistError::Failed("assistant worker exited".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{run_with_timeout, AssistError, AssistedRewriter, CommandRewriter, RewriteRequest};
    use crate::detect::Dialect;
    use crate::interface_map::InterfaceMapping;
    use std::sync::Arc;
    use std::time::Duration;

    fn request(timeout: Duration) -> RewriteRequest {
        RewriteRequest {
            source_config: "/system identity\nset name=r1\n".to_string(),
            source_version: "6.49.2".to_string(),
            source_device: "CCR1036-8G-2S+".to_string(),
            target_version: "7.15".to_string(),
            target_device: "CCR2216-1G-12XS-2XQ".to_string(),
            target_dialect: Dialect::Modern,
            interface_mapping: InterfaceMapping::default(),
            strict_preserve: true,
            timeout,
        }
    }

    struct Sleepy;

    impl AssistedRewriter for Sleepy {
        fn rewrite(&self, _request: &RewriteRequest) -> Result<String, AssistError> {
            std::thread::sleep(Duration::from_secs(2));
            Ok(String::new())
        }
    }

    #[test]
    fn worker_timeout_is_reported() {
        let err = run_with_timeout(Arc::new(Sleepy), request(Duration::from_millis(50))).unwrap_err();
        assert!(matches!(err, AssistError::Timeout(_)));
    }

    #[test]
    fn command_output_is_the_candidate() {
        let rewriter = CommandRewriter::new(
            "sh",
            vec![
                "-c".to_string(),
                "cat > /dev/null; printf '/system identity\\nset name=r1\\n'".to_string(),
            ],
        );
        let out = rewriter.rewrite(&request(Duration::from_secs(10))).expect("rewrite");
        assert_eq!(out, "/system identity\nset name=r1\n");
    }

    #[test]
    fn command_is_killed_at_deadline() {
        let rewriter = CommandRewriter::new("sh", vec!["-c".to_string(), "sleep 5".to_string()]);
        let err = rewriter.rewrite(&request(Duration::from_millis(100))).unwrap_err();
        assert!(matches!(err, AssistError::Timeout(_)));
    }

    #[test]
    fn failing_command_is_an_error() {
        let rewriter = CommandRewriter::new("sh", vec!["-c".to_string(), "exit 3".to_string()]);
        let err = rewriter.rewrite(&request(Duration::from_secs(10))).unwrap_err();
        assert!(matches!(err, AssistError::Failed(_)));
    }
}
