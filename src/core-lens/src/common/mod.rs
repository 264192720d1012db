//! Environment-driven configuration and process setup shared by the binaries.

pub mod auth_config;
pub mod db_env;
pub mod env_check;
pub mod fetch_config;
pub mod logging;
pub mod server_config;

pub use auth_config::{AuthConfig, AuthConfigError, get_auth_config};
pub use db_env::{DbEnvError, get_database_url, get_db_pool};
pub use env_check::{MissingEnvVars, check_non_empty_env_vars};
pub use fetch_config::{FetchConfig, FetchConfigError, get_fetch_config};
pub use logging::{DEFAULT_LOG_SETTINGS, setup_logging};
pub use server_config::{HostPortError, get_api_base_url, get_frontend_origin};
