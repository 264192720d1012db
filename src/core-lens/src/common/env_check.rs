#[derive(Debug, thiserror::Error)]
#[error("{} required environment variables are missing or empty: {}", .0.len(), .0.join(", "))]
pub struct MissingEnvVars(pub Vec<String>);

/// Ensures that the listed environment variables exist and are non-empty.
/// Every offender is logged before the combined error is returned.
pub fn check_non_empty_env_vars(required_vars: &[&str]) -> Result<(), MissingEnvVars> {
    let mut missing = Vec::new();
    for var_name in required_vars {
        match std::env::var(var_name) {
            Ok(value) if !value.trim().is_empty() => {}
            Ok(_) => {
                tracing::error!("{} environment variable is set but empty.", var_name);
                missing.push(var_name.to_string());
            }
            Err(_) => {
                if *var_name == "TOKEN_SECRET" {
                    tracing::error!("Generate a secret with: openssl rand -base64 32");
                }
                tracing::error!("{} environment variable is required.", var_name);
                missing.push(var_name.to_string());
            }
        }
    }

    if missing.is_empty() { Ok(()) } else { Err(MissingEnvVars(missing)) }
}
