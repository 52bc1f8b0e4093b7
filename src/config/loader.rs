use crate::config::schema::Constitution;
use crate::errors::{SentinelError, SentinelResult};
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default gateway port, overridable via `SENTINEL_PORT`.
pub const DEFAULT_PORT: u16 = 8765;

/// Resolve the constitution path: `SENTINEL_CONSTITUTION_PATH` if set,
/// otherwise `constitution.yaml` in the working directory.
pub fn default_constitution_path() -> PathBuf {
    std::env::var_os("SENTINEL_CONSTITUTION_PATH")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("constitution.yaml"))
}

/// Load a constitution document from disk.
///
/// In strict mode a missing or unparseable document is a startup error (the
/// process should exit non-zero). Otherwise the problem is logged and the
/// built-in defaults apply — the defaults are themselves restrictive, and with
/// no LLM auditor configured the pipeline rejects everything anyway.
pub fn load_constitution(path: &Path, strict: bool) -> SentinelResult<Constitution> {
    if !path.exists() {
        if strict {
            return Err(SentinelError::Constitution(format!(
                "constitution not found at {}",
                path.display()
            )));
        }
        warn!(
            "constitution not found at {}; applying built-in defaults",
            path.display()
        );
        return Ok(Constitution::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read constitution from {}", path.display()))?;

    match serde_yaml_ng::from_str::<Constitution>(&content) {
        Ok(doc) => Ok(doc),
        Err(e) if strict => Err(SentinelError::Constitution(format!(
            "failed to parse {}: {}",
            path.display(),
            e
        ))),
        Err(e) => {
            warn!(
                "failed to parse constitution at {} ({}); applying built-in defaults",
                path.display(),
                e
            );
            Ok(Constitution::default())
        }
    }
}

/// Gateway listener configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `None` means auth is open (no token configured, or explicitly
    /// disabled) — local/testing use only.
    pub auth_token: Option<String>,
}

/// Read `SENTINEL_HOST`, `SENTINEL_PORT`, `SENTINEL_AUTH_TOKEN`, and
/// `SENTINEL_DISABLE_AUTH` into a `ServerConfig`.
pub fn server_config_from_env() -> SentinelResult<ServerConfig> {
    let host = std::env::var("SENTINEL_HOST")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "127.0.0.1".to_string());

    let port = match std::env::var("SENTINEL_PORT") {
        Ok(raw) if !raw.is_empty() => raw.parse::<u16>().map_err(|_| {
            SentinelError::Transport(format!("SENTINEL_PORT is not a port number: {}", raw))
        })?,
        _ => DEFAULT_PORT,
    };

    let auth_disabled = std::env::var("SENTINEL_DISABLE_AUTH")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let auth_token = if auth_disabled {
        None
    } else {
        std::env::var("SENTINEL_AUTH_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
    };

    if auth_token.is_none() {
        warn!("gateway auth is open (no token configured); local/testing use only");
    }

    Ok(ServerConfig {
        host,
        port,
        auth_token,
    })
}
