use tokio::process::Command;

/// Environment variables safe to pass through to audited commands.
const ALLOWED_ENV_VARS: &[&str] = &[
    "PATH", "HOME", "USER", "SHELL", "LANG", "LC_ALL", "TZ", "TERM", "TMPDIR",
];

/// Create a `Command` with a scrubbed environment.
///
/// Calls `env_clear()` then copies only the allowlisted variables from the
/// current process. The gateway's own secrets — `SENTINEL_AUTH_TOKEN`,
/// `ANTHROPIC_API_KEY` — must never be visible to the commands it executes.
pub fn scrubbed_command(program: &str) -> Command {
    let mut cmd = Command::new(program);
    cmd.env_clear();
    for &var in ALLOWED_ENV_VARS {
        if let Ok(val) = std::env::var(var) {
            cmd.env(var, val);
        }
    }
    cmd
}
