use crate::error::{Result, VersionError};
use crate::source::{timed_out, SourceProvider};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs a configured shell command and returns what it prints
///
/// `{repository}` and `{remote}` in the template are replaced with the
/// configured values before the command is handed to `sh -c`.
pub struct CommandProvider {
    template: String,
    repository: PathBuf,
    remote: String,
}

impl CommandProvider {
    pub fn new(template: impl Into<String>, repository: PathBuf, remote: impl Into<String>) -> Self {
        CommandProvider {
            template: template.into(),
            repository,
            remote: remote.into(),
        }
    }

    /// The command line after placeholder substitution
    pub fn command_line(&self) -> String {
        self.template
            .replace("{repository}", &self.repository.display().to_string())
            .replace("{remote}", &self.remote)
    }
}

impl SourceProvider for CommandProvider {
    fn describe(&self) -> String {
        format!("command `{}`", self.command_line())
    }

    fn fetch(&self, timeout: Duration) -> Result<String> {
        let command_line = self.command_line();
        let unavailable = |reason: String| VersionError::source_unavailable(self.describe(), reason);

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| unavailable(format!("failed to start: {}", e)))?;

        // Drain both pipes so a chatty provider cannot block on a full pipe.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    warn!(command = %command_line, "provider timed out, killing it");
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(unavailable(timed_out(timeout)));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    return Err(unavailable(format!("failed to wait: {}", e)));
                }
            }
        };
        debug!(command = %command_line, code = ?status.code(), "provider finished");

        // Background jobs started by the command inherit the pipes, so the
        // output is bounded by the same deadline as the process.
        if !status.success() {
            let stderr = collect(&stderr, deadline).unwrap_or_default();
            return Err(unavailable(format!(
                "exited with code {}: {}",
                status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        collect(&stdout, deadline).ok_or_else(|| {
            warn!(command = %command_line, "provider output still open at deadline");
            unavailable(timed_out(timeout))
        })
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(read_all(pipe));
    });
    rx
}

/// Wait for a drained pipe until `deadline`; `None` once it passes.
fn collect(rx: &Receiver<String>, deadline: Instant) -> Option<String> {
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(output) => Some(output),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
    }
}

fn read_all<R: Read>(pipe: Option<R>) -> String {
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut buf);
    }
    buf
}
