//! Shared fixtures for the handler tests.

use crate::adapters::AccountVerifier;
use crate::config::Config;
use crate::web::middleware::SESSION_COOKIE;
use crate::web::state::AppState;
use appointment_core::testing::{FailingBlobStore, FakeVerifier, FixedClock};
use appointment_core::{IdentityVerifier, MemoryBlobStore, Role, Session};
use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// State plus handles on its clock and store, for tests that move time or
/// inject storage failures.
pub struct TestApp {
    pub state: Arc<AppState>,
    pub clock: Arc<FixedClock>,
    pub store: Arc<FailingBlobStore<MemoryBlobStore>>,
}

fn build(verifier: impl FnOnce(Arc<AccountVerifier>) -> Arc<dyn IdentityVerifier>) -> TestApp {
    let store = Arc::new(FailingBlobStore::new(MemoryBlobStore::new()));
    let clock = Arc::new(FixedClock::at(Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap()));
    let config = Config::from_lookup(|_| None).unwrap();
    let accounts = Arc::new(AccountVerifier::new(store.clone(), None));
    let state = Arc::new(AppState::new(
        store.clone(),
        clock.clone(),
        verifier(accounts.clone()),
        accounts,
        Arc::new(config),
    ));
    TestApp { state, clock, store }
}

/// Sign-ins go through `FakeVerifier`, with `admin` as the admin username.
/// The clock sits on 2025-05-01.
pub fn test_app() -> TestApp {
    build(|_| Arc::new(FakeVerifier::new().with_admin("admin")) as Arc<dyn IdentityVerifier>)
}

/// Sign-ins are checked against registered accounts, as in production.
pub fn account_app() -> TestApp {
    build(|accounts| accounts as Arc<dyn IdentityVerifier>)
}

pub fn test_state() -> Arc<AppState> {
    test_app().state
}

pub fn cookie_for(token: Uuid) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, token)).unwrap(),
    );
    headers
}

fn session(email: &str, role: Role) -> Session {
    Session {
        user_id: format!("fake-{}", email),
        display_name: format!("Patient {}", email),
        email: email.to_string(),
        role,
        phone: None,
        signed_in_at: Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap(),
    }
}

pub fn user_session(email: &str) -> Session {
    session(email, Role::User)
}

pub fn admin_session() -> Session {
    session("admin", Role::Admin)
}
