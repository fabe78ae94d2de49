//! services/api/src/web/middleware.rs
//!
//! Session middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use appointment_core::Session;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::web::protocol::{core_error_response, error_response, ErrorResponse};
use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// Reads the session token from the `Cookie` header, if there is a well-formed one.
pub fn session_token(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            let (name, value) = c.trim().split_once('=')?;
            (name == SESSION_COOKIE).then(|| Uuid::parse_str(value).ok()).flatten()
        })
}

/// Looks up the live session behind `token`.
///
/// Sessions older than the configured max age are signed out on the spot and
/// treated like a missing one.
pub async fn resolve_session(state: &AppState, token: Uuid) -> Result<Session, ErrorResponse> {
    let sessions = state.session_store(token).await.map_err(|e| {
        error!("Failed to open session store: {:?}", e);
        core_error_response(e)
    })?;
    let Some(session) = sessions.current_session() else {
        return Err(error_response(StatusCode::UNAUTHORIZED, "authentication", "Not signed in"));
    };

    if session.is_expired(state.clock.now(), state.config.session_max_age()) {
        info!(user_id = %session.user_id, "Session expired");
        if let Err(e) = sessions.sign_out().await {
            error!("Failed to clear expired session: {:?}", e);
        }
        return Err(error_response(StatusCode::UNAUTHORIZED, "authentication", "Session expired"));
    }
    Ok(session)
}

/// Middleware that resolves the client's current session.
///
/// If one exists, the `Session` is inserted into request extensions for
/// handlers to use. If the cookie is missing or malformed, or the session is
/// gone or expired, returns 401 Unauthorized.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    // 1. Extract the session token
    let Some(token) = session_token(req.headers()) else {
        return error_response(StatusCode::UNAUTHORIZED, "authentication", "Not signed in").into_response();
    };

    // 2. Resolve it and insert the session into request extensions
    match resolve_session(&state, token).await {
        Ok(session) => {
            req.extensions_mut().insert(session);
        }
        Err(rejection) => return rejection.into_response(),
    }

    // 3. Continue to the handler
    next.run(req).await
}
