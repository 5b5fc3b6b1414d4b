use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Nested under `/admin`. Pages are restricted with `LOGGED_OUT | NOT_ADMIN`; the
/// `{resource}` segment is `event` or `event-category`, anything else is a 404.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/{resource}/list
        .route("/{resource}/list", get(handlers::admin_list))
        // GET /admin/{resource}/delete/{id} renders the confirmation prompt.
        // POST with `confirm=yes` runs the delete mutation.
        .route(
            "/{resource}/delete/{id}",
            get(handlers::confirm_delete).post(handlers::delete_entity),
        )
}
