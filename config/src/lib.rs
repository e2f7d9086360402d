//! Load configuration from a project `.env` and apply to the process
//! environment with priority: **existing env > .env**.
//!
//! Also exposes the typed accessors the orchestrator needs:
//! `BACKEND_TOOL_SERVICE_HOST` (default `backend`) and
//! `BACKEND_TOOL_SERVICE_PORT` (default `50052`). No other host-level config
//! is required at this layer.

mod env_file;

use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("read .env: {0}")]
    DotenvRead(std::io::Error),
}

/// Environment key for the backend tool service host.
pub const BACKEND_TOOL_SERVICE_HOST: &str = "BACKEND_TOOL_SERVICE_HOST";
/// Environment key for the backend tool service port.
pub const BACKEND_TOOL_SERVICE_PORT: &str = "BACKEND_TOOL_SERVICE_PORT";

const DEFAULT_TOOL_SERVICE_HOST: &str = "backend";
const DEFAULT_TOOL_SERVICE_PORT: u16 = 50052;

/// Loads `.env` (current directory, or `override_dir` if given) and sets
/// each key only when it is **not** already present in the process
/// environment, so existing env always wins.
pub fn load_and_apply(override_dir: Option<&Path>) -> Result<(), LoadError> {
    let map = env_file::load_env_map(override_dir).map_err(LoadError::DotenvRead)?;
    for (key, value) in map {
        if std::env::var(&key).is_err() {
            std::env::set_var(&key, value);
        }
    }
    Ok(())
}

/// Backend tool service host, defaulting to `backend`.
pub fn tool_service_host() -> String {
    std::env::var(BACKEND_TOOL_SERVICE_HOST).unwrap_or_else(|_| DEFAULT_TOOL_SERVICE_HOST.into())
}

/// Backend tool service port, defaulting to `50052`. A malformed value falls
/// back to the default.
pub fn tool_service_port() -> u16 {
    std::env::var(BACKEND_TOOL_SERVICE_PORT)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_TOOL_SERVICE_PORT)
}

/// Base URL of the backend tool service built from host and port.
pub fn tool_service_url() -> String {
    format!("http://{}:{}", tool_service_host(), tool_service_port())
}
