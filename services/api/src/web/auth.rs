//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for sign-up, login, logout, and the current session.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::Duration;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::adapters::{Registration, RegistrationError};
use crate::web::middleware::{session_token, SESSION_COOKIE};
use crate::web::protocol::{
    core_error_response, error_response, ErrorBody, ErrorResponse, LoginRequest, SessionResponse,
    SignupRequest,
};
use crate::web::state::AppState;
use appointment_core::{Credentials, Session};

fn session_cookie(token: Uuid, max_age: Duration) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        token,
        max_age.num_seconds()
    )
}

/// Signs `credentials` in on a freshly minted token.
///
/// A token the client already presented is never reused; once the new sign-in
/// succeeds, whatever session it held is ended.
async fn sign_in(
    state: &AppState,
    headers: &HeaderMap,
    credentials: &Credentials,
) -> Result<(Uuid, Session), ErrorResponse> {
    let token = Uuid::new_v4();
    let sessions = state.session_store(token).await.map_err(core_error_response)?;
    let session = sessions.sign_in(credentials).await.map_err(core_error_response)?;

    if let Some(previous) = session_token(headers) {
        if let Err(e) = state.end_session(previous).await {
            error!("Failed to end previous session: {:?}", e);
        }
    }
    Ok((token, session))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a patient account and sign in
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = SessionResponse),
        (status = 409, description = "Email already registered", body = ErrorBody),
        (status = 422, description = "Missing fields", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    // 1. Register the account (hashes the password and logs the sign-up)
    let registration = Registration {
        name: req.name,
        email: req.email,
        password: req.password.clone(),
        phone: req.phone,
    };
    let identity = state
        .accounts
        .register(registration, &state.activity)
        .await
        .map_err(|e| match e {
            RegistrationError::DuplicateEmail(_) => {
                error_response(StatusCode::CONFLICT, "duplicate_email", e.to_string())
            }
            RegistrationError::MissingField(_) => {
                error_response(StatusCode::UNPROCESSABLE_ENTITY, "validation", e.to_string())
            }
            RegistrationError::Hashing(_)
            | RegistrationError::Storage(_)
            | RegistrationError::Activity(_) => {
                error!("Failed to register account: {:?}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "storage", "Failed to create account")
            }
        })?;

    // 2. Sign in with the new credentials
    let credentials = Credentials::new(identity.email.clone(), req.password);
    let (token, session) = sign_in(&state, &headers, &credentials).await?;

    // 3. Return response with cookie
    let cookie = session_cookie(token, state.config.session_max_age());
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse::from(session)),
    ))
}

/// POST /auth/login - Sign in with existing credentials
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = SessionResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let credentials = Credentials::new(req.username, req.password);
    let (token, session) = sign_in(&state, &headers, &credentials).await?;
    info!(user_id = %session.user_id, "Login successful");

    let cookie = session_cookie(token, state.config.session_max_age());
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse::from(session)),
    ))
}

/// POST /auth/logout - Sign out. Safe to call without a session.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Signed out"),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ErrorResponse> {
    if let Some(token) = session_token(&headers) {
        state.end_session(token).await.map_err(|e| {
            error!("Failed to sign out: {:?}", e);
            core_error_response(e)
        })?;
    }

    let cookie = format!("{}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE);
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]))
}

/// GET /auth/me - The signed-in session
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current session", body = SessionResponse),
        (status = 401, description = "Not signed in", body = ErrorBody)
    )
)]
pub async fn me_handler(Extension(session): Extension<Session>) -> Json<SessionResponse> {
    Json(SessionResponse::from(session))
}
