use std::net::SocketAddr;

#[derive(Debug, thiserror::Error)]
pub enum HostPortError {
    #[error("Invalid port: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),

    #[error("Invalid hostname: {0}")]
    InvalidHostname(#[from] std::net::AddrParseError),
}

/// Gets the listen address from the env vars HOST and PORT.
/// Uses defaults `127.0.0.1:3000` when they are unset.
pub fn get_api_base_url() -> Result<SocketAddr, HostPortError> {
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = match std::env::var("PORT") {
        Ok(p) => p.trim().parse::<u16>()?,
        Err(_) => 3000,
    };
    let address = format!("{}:{}", host.trim(), port).parse::<SocketAddr>()?;
    Ok(address)
}

/// The browser origin allowed to call the API with credentials (FRONTEND_ORIGIN), if any.
pub fn get_frontend_origin() -> Option<String> {
    std::env::var("FRONTEND_ORIGIN")
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
}
