use std::env;

/// Default identity token lifetime: 72 hours.
pub const DEFAULT_TOKEN_DURATION_SECONDS: u64 = 72 * 60 * 60;

/// bcrypt work factor used when none is configured. Valid factors are 4 through 31.
pub const DEFAULT_PASSWORD_HASH_COST: u32 = 12;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC-SHA256 key that signs identity tokens.
    pub token_secret: String,
    pub token_duration_seconds: u64,
    pub password_hash_cost: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthConfigError {
    #[error("TOKEN_SECRET environment variable is required. Generate a secret with: openssl rand -base64 32")]
    MissingSecret,

    #[error("TOKEN_DURATION_SECONDS must be a positive number of seconds, got '{0}'")]
    InvalidDuration(String),

    #[error("PASSWORD_HASH_COST must be a number from 4 to 31, got '{0}'")]
    InvalidHashCost(String),
}

/// Reads TOKEN_SECRET (required), TOKEN_DURATION_SECONDS (default: 72 hours)
/// and PASSWORD_HASH_COST (default: 12).
pub fn get_auth_config() -> Result<AuthConfig, AuthConfigError> {
    let token_secret = env::var("TOKEN_SECRET")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .ok_or(AuthConfigError::MissingSecret)?;

    let token_duration_seconds = match env::var("TOKEN_DURATION_SECONDS") {
        Ok(v) => match v.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => secs,
            _ => return Err(AuthConfigError::InvalidDuration(v)),
        },
        Err(_) => DEFAULT_TOKEN_DURATION_SECONDS,
    };

    let password_hash_cost = match env::var("PASSWORD_HASH_COST") {
        Ok(v) => match v.trim().parse::<u32>() {
            Ok(cost) if (4..=31).contains(&cost) => cost,
            _ => return Err(AuthConfigError::InvalidHashCost(v)),
        },
        Err(_) => DEFAULT_PASSWORD_HASH_COST,
    };

    Ok(AuthConfig {
        token_secret,
        token_duration_seconds,
        password_hash_cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_env::ENV_MUTEX;

    #[test]
    fn test_missing_secret() {
        let _guard = ENV_MUTEX.lock().unwrap();
        unsafe {
            env::remove_var("TOKEN_SECRET");
        }
        assert!(matches!(get_auth_config(), Err(AuthConfigError::MissingSecret)));
    }

    #[test]
    fn test_default_duration() {
        let _guard = ENV_MUTEX.lock().unwrap();
        unsafe {
            env::set_var("TOKEN_SECRET", "s3cret");
            env::remove_var("TOKEN_DURATION_SECONDS");
            env::remove_var("PASSWORD_HASH_COST");
        }
        let config = get_auth_config().unwrap();
        assert_eq!(config.token_secret, "s3cret");
        assert_eq!(config.token_duration_seconds, 259200);
        assert_eq!(config.password_hash_cost, 12);
        unsafe {
            env::remove_var("TOKEN_SECRET");
        }
    }

    #[test]
    fn test_invalid_duration() {
        let _guard = ENV_MUTEX.lock().unwrap();
        unsafe {
            env::set_var("TOKEN_SECRET", "s3cret");
            env::set_var("TOKEN_DURATION_SECONDS", "0");
        }
        assert!(matches!(get_auth_config(), Err(AuthConfigError::InvalidDuration(_))));
        unsafe {
            env::set_var("TOKEN_DURATION_SECONDS", "soon");
        }
        assert!(matches!(get_auth_config(), Err(AuthConfigError::InvalidDuration(_))));
        unsafe {
            env::remove_var("TOKEN_SECRET");
            env::remove_var("TOKEN_DURATION_SECONDS");
        }
    }

    #[test]
    fn test_invalid_hash_cost() {
        let _guard = ENV_MUTEX.lock().unwrap();
        unsafe {
            env::set_var("TOKEN_SECRET", "s3cret");
            env::remove_var("TOKEN_DURATION_SECONDS");
            env::set_var("PASSWORD_HASH_COST", "3");
        }
        assert!(matches!(get_auth_config(), Err(AuthConfigError::InvalidHashCost(_))));
        unsafe {
            env::set_var("PASSWORD_HASH_COST", "4");
        }
        assert_eq!(get_auth_config().unwrap().password_hash_cost, 4);
        unsafe {
            env::remove_var("TOKEN_SECRET");
            env::remove_var("PASSWORD_HASH_COST");
        }
    }
}
