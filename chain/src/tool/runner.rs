//! Blocking execution of external binaries with a timeout.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

use crate::ChainError;

/// Output fragments that mean the tool could not reach the node or network.
const CONNECTIVITY_MARKERS: &[&str] = &[
    "connection refused",
    "failed to connect",
    "connection reset",
    "network is unreachable",
    "timed out",
    "timeout",
];

/// Runs one binary with a fixed working directory and timeout.
#[derive(Clone, Debug)]
pub struct ToolRunner {
    exec_path: PathBuf,
    cwd: PathBuf,
    timeout: Duration,
}

impl ToolRunner {
    pub fn new(exec_path: impl Into<PathBuf>, cwd: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            exec_path: exec_path.into(),
            cwd: cwd.into(),
            timeout,
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn run(&self, args: &[String]) -> Result<String, ChainError> {
        self.run_redacted(args, &[])
    }

    /// Run with `args` and return stdout.
    ///
    /// Every occurrence of a string in `secrets` is masked in log lines and
    /// error messages.
    pub fn run_redacted(&self, args: &[String], secrets: &[&str]) -> Result<String, ChainError> {
        let shown = redact(&args.join(" "), secrets);
        tracing::debug!(tool = %self.exec_path.display(), args = %shown, "running");

        std::fs::create_dir_all(&self.cwd).map_err(|e| {
            ChainError::Execution(format!("cannot create {}: {e}", self.cwd.display()))
        })?;

        let mut child = Command::new(&self.exec_path)
            .args(args)
            .current_dir(&self.cwd)
            // the chain tools misbehave without a stdin attached
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ChainError::Execution(format!("failed to spawn {}: {e}", self.exec_path.display()))
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                kill(&mut child);
                return Err(ChainError::Connectivity(format!(
                    "{} {shown} timed out after {}s",
                    self.exec_path.display(),
                    self.timeout.as_secs()
                )));
            }
            Err(e) => {
                kill(&mut child);
                return Err(ChainError::Execution(format!("wait failed: {e}")));
            }
        };

        let out = join(stdout);
        let err = join(stderr);
        if status.success() {
            tracing::trace!(output = %redact(&out, secrets), "tool output");
            return Ok(out);
        }

        let message = redact(
            &format!(
                "{} {shown} exited with {status}: {}{}",
                self.exec_path.display(),
                out.trim(),
                err.trim()
            ),
            secrets,
        );
        Err(classify(message))
    }
}

/// Connectivity if the message carries a known marker, execution otherwise.
pub(crate) fn classify(message: String) -> ChainError {
    let lower = message.to_lowercase();
    if CONNECTIVITY_MARKERS.iter().any(|m| lower.contains(m)) {
        ChainError::Connectivity(message)
    } else {
        ChainError::Execution(message)
    }
}

pub(crate) fn redact(text: &str, secrets: &[&str]) -> String {
    let mut out = text.to_string();
    for secret in secrets.iter().filter(|s| !s.is_empty()) {
        out = out.replace(secret, "***");
    }
    out
}

// Read pipes on their own threads so a chatty tool cannot block on a full pipe.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
