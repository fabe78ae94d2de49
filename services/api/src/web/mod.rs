pub mod auth;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

// Re-export the handlers and router pieces the binary needs.
pub use auth::{login_handler, logout_handler, me_handler, signup_handler};
pub use middleware::require_session;
pub use rest::{
    add_contact_handler, book_appointment_handler, get_appointment_handler,
    list_activities_handler, list_appointments_handler, list_contacts_handler,
    remove_contact_handler, update_status_handler, ApiDoc,
};
pub use state::AppState;

/// Builds the API routes: public auth routes plus the session-protected ones.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (session required; role checks happen in the handlers)
    let protected_routes = Router::new()
        .route("/auth/me", get(me_handler))
        .route("/doctors/{doctor_id}/appointments", post(book_appointment_handler))
        .route("/appointments", get(list_appointments_handler))
        .route("/appointments/{id}", get(get_appointment_handler))
        .route("/appointments/{id}/status", put(update_status_handler))
        .route("/admin/activities", get(list_activities_handler))
        .route("/contacts", get(list_contacts_handler).post(add_contact_handler))
        .route("/contacts/{id}", delete(remove_contact_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_session,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
