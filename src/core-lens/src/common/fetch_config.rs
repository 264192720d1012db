use std::{num::ParseIntError, time::Duration};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Largest response body the analyzer will buffer: 10 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// How the page analyzer talks to remote servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub user_agent: String,
    /// Responses longer than this are fetch failures.
    pub max_body_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: default_user_agent(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

fn default_user_agent() -> String {
    format!("page-lens/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, thiserror::Error)]
pub enum FetchConfigError {
    #[error("FETCH_TIMEOUT_SECS must be a valid number: {0}")]
    InvalidTimeout(#[from] ParseIntError),

    #[error("FETCH_TIMEOUT_SECS must be positive")]
    ZeroTimeout,

    #[error("FETCH_MAX_BODY_BYTES must be a positive integer, got '{0}'")]
    InvalidMaxBody(String),
}

/// Reads FETCH_TIMEOUT_SECS, FETCH_USER_AGENT and FETCH_MAX_BODY_BYTES,
/// falling back to [`FetchConfig::default`].
pub fn get_fetch_config() -> Result<FetchConfig, FetchConfigError> {
    let timeout = match std::env::var("FETCH_TIMEOUT_SECS") {
        Ok(v) => v.trim().parse::<u64>()?,
        Err(_) => DEFAULT_TIMEOUT_SECS,
    };
    if timeout == 0 {
        return Err(FetchConfigError::ZeroTimeout);
    }

    let user_agent = std::env::var("FETCH_USER_AGENT")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(default_user_agent);

    let max_body_bytes = match std::env::var("FETCH_MAX_BODY_BYTES") {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse::<usize>() {
            Ok(bytes) if bytes > 0 => bytes,
            _ => return Err(FetchConfigError::InvalidMaxBody(raw)),
        },
        _ => DEFAULT_MAX_BODY_BYTES,
    };

    Ok(FetchConfig {
        timeout: Duration::from_secs(timeout),
        user_agent,
        max_body_bytes,
    })
}
