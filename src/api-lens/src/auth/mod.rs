pub mod handlers;
pub mod middleware;
pub mod password;
pub mod token;

pub use handlers::{post_login, post_logout, post_register};
pub use middleware::{Identity, require_identity};
