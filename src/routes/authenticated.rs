use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Pages restricted with `AuthRestrict::LOGGED_OUT`. Anonymous viewers are redirected to
/// `/login?next=...` by the shared layout.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /settings, /settings/{page}
        // Unknown sub-pages fall back to the profile page.
        .route("/settings", get(handlers::settings))
        .route("/settings/{*page}", get(handlers::settings))
        // GET|POST /create-event-category
        // Viewers without organization memberships are sent home.
        .route(
            "/create-event-category",
            get(handlers::create_event_category_form).post(handlers::create_event_category),
        )
}
