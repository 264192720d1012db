use axum::{
    Router,
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::state::AppState;

pub mod analyses;
pub mod logging_middleware;
pub mod profile;

/// Liveness check
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "healthy")
}

//
// Router
//

/// Builds the full application. `cors_origin` is the frontend origin allowed
/// to make credentialed cross-origin requests, if any.
pub fn router(state: AppState, cors_origin: Option<HeaderValue>) -> Router {
    // Public routes (no identity required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/register", post(auth::post_register))
        .route("/api/auth/login", post(auth::post_login))
        .route("/api/auth/logout", post(auth::post_logout));

    // Protected routes (valid token for an existing user required)
    let protected_routes = Router::new()
        .route("/api/analyses", post(analyses::post_analyses))
        .route("/api/analyses/queued", post(analyses::post_queued))
        .route("/api/analyses/running", post(analyses::post_running))
        .route("/api/analyses/result", post(analyses::post_result))
        .route(
            "/api/analyses/{id}",
            get(analyses::get_analysis).delete(analyses::delete_analysis),
        )
        .route("/api/analyses/{id}/toggle_pause", post(analyses::post_toggle_pause))
        .route("/api/profile", get(profile::get_profile).delete(profile::delete_profile))
        .route("/api/profile/analyses", delete(profile::delete_profile_analyses))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_identity));

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        // Custom route access logging
        .layer(middleware::from_fn(logging_middleware::log_route_access))
        // Tracing middleware
        .layer(TraceLayer::new_for_http());

    match cors_origin {
        Some(origin) => app.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_credentials(true)
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        ),
        None => app,
    }
}
