//! Command executor: runs a permitted command in a subprocess and captures its
//! output.
//!
//! The executor never re-audits — any late-stage safety is the filter's
//! responsibility — and never raises: spawn failures and timeouts are carried
//! inside the returned `ExecutionResult`. The working directory is passed to
//! the subprocess API explicitly; the gateway process's own cwd is never
//! touched, so concurrent executions cannot race on it.

use crate::utils::{expand_tilde, subprocess::scrubbed_command};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, warn};

/// Default wall-clock bound on one execution.
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(120);

/// Maximum combined stdout+stderr size before truncation.
const MAX_OUTPUT_BYTES: usize = 1024 * 1024; // 1 MB

/// Captured outcome of one subprocess run. `returncode` is `-1` when the
/// process could not be spawned, was killed by a signal, or timed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub returncode: i32,
}

impl ExecutionResult {
    fn fault(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            returncode: -1,
        }
    }
}

pub struct CommandExecutor {
    timeout: Duration,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_EXEC_TIMEOUT)
    }
}

impl CommandExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run the *original* (not normalized) command string through the system
    /// shell, optionally in `workdir`.
    pub async fn run(&self, command: &str, workdir: Option<&Path>) -> ExecutionResult {
        let mut cmd = scrubbed_command("sh");
        cmd.arg("-c").arg(command);
        if let Some(dir) = workdir {
            cmd.current_dir(expand_tilde(dir));
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        // Own process group, so a timeout can take the whole tree down with
        // it rather than leaving grandchildren running.
        #[cfg(unix)]
        cmd.process_group(0);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("failed to spawn shell: {}", e);
                return ExecutionResult::fault(format!("failed to spawn shell: {}", e));
            }
        };
        // Sweeps the process group if this future is dropped (client
        // disconnect) or the timeout fires; kill_on_drop only reaches the
        // direct sh child, not its descendants.
        #[cfg(unix)]
        let mut reaper = GroupReaper::armed(child.id());

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                #[cfg(unix)]
                reaper.disarm();
                let (stdout, stderr, truncated) = capture(&output.stdout, &output.stderr);
                let returncode = output.status.code().unwrap_or(-1);
                debug!("command exited with status {}", returncode);
                ExecutionResult {
                    stdout,
                    stderr: if truncated {
                        format!("{}\n[output truncated at 1MB]", stderr)
                    } else {
                        stderr
                    },
                    returncode,
                }
            }
            Ok(Err(e)) => ExecutionResult::fault(format!("failed to collect output: {}", e)),
            Err(_) => {
                warn!("command timed out after {}s", self.timeout.as_secs());
                ExecutionResult::fault(format!(
                    "command timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            }
        }
    }
}

/// SIGKILLs a spawned command's process group on drop unless disarmed.
#[cfg(unix)]
struct GroupReaper {
    pgid: Option<u32>,
    armed: bool,
}

#[cfg(unix)]
impl GroupReaper {
    fn armed(pgid: Option<u32>) -> Self {
        Self { pgid, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

#[cfg(unix)]
impl Drop for GroupReaper {
    fn drop(&mut self) {
        if self.armed
            && let Some(pid) = self.pgid
        {
            unsafe { libc::killpg(pid as i32, libc::SIGKILL) };
        }
    }
}

/// Lossy-decode captured bytes, capping combined size at `MAX_OUTPUT_BYTES`
/// (stdout first, stderr gets the remainder).
fn capture(stdout: &[u8], stderr: &[u8]) -> (String, String, bool) {
    let truncated = stdout.len() + stderr.len() > MAX_OUTPUT_BYTES;
    let stdout_slice = &stdout[..stdout.len().min(MAX_OUTPUT_BYTES)];
    let remaining = MAX_OUTPUT_BYTES - stdout_slice.len();
    let stderr_slice = &stderr[..stderr.len().min(remaining)];
    (
        String::from_utf8_lossy(stdout_slice).into_owned(),
        String::from_utf8_lossy(stderr_slice).into_owned(),
        truncated,
    )
}
