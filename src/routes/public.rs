use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Pages that render for anonymous viewers, plus the session and live update endpoints.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer. Never touches the data service.
        .route("/health", get(|| async { "ok" }))
        // GET /?page=&sort=&order=&organizer=&category=
        // Home page: open and upcoming registrations, then the closed events table.
        .route("/", get(handlers::home))
        // GET|POST /login?next=...
        .route("/login", get(handlers::login_form).post(handlers::login))
        // GET|POST /register
        // 404 unless ENABLE_REGISTRATION is set.
        .route("/register", get(handlers::register_form).post(handlers::register))
        // POST /logout ends the session with the service; GET /logout is the hard fallback.
        .route("/logout", get(handlers::hard_logout).post(handlers::logout))
        // GET /live/current-user
        // Server-sent events for changes of the current user.
        .route("/live/current-user", get(handlers::live_current_user))
}
