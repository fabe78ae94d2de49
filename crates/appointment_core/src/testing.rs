//! crates/appointment_core/src/testing.rs
//!
//! Test doubles for the core ports. Compiled for this crate's tests and for
//! downstream crates that enable the `testing` feature; never part of a
//! production build.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::Mutex;

use crate::domain::{Credentials, Identity, Role};
use crate::ports::{AuthError, BlobStore, Clock, IdentityVerifier, PortError, PortResult};

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Wraps a blob store and fails writes to chosen keys.
pub struct FailingBlobStore<S> {
    inner: S,
    failing: Mutex<HashSet<String>>,
    failing_removes: Mutex<HashSet<String>>,
}

impl<S: BlobStore> FailingBlobStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
            failing_removes: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_writes_to(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    /// Fails only `remove` on `key`; `set` still goes through.
    pub fn fail_removes_of(&self, key: &str) {
        self.failing_removes.lock().unwrap().insert(key.to_string());
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
        self.failing_removes.lock().unwrap().clear();
    }

    fn check(&self, key: &str) -> PortResult<()> {
        if self.failing.lock().unwrap().contains(key) {
            return Err(PortError::Unavailable(format!("injected failure writing '{}'", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: BlobStore> BlobStore for FailingBlobStore<S> {
    async fn get(&self, key: &str) -> PortResult<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> PortResult<()> {
        self.check(key)?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        self.check(key)?;
        if self.failing_removes.lock().unwrap().contains(key) {
            return Err(PortError::Unavailable(format!("injected failure removing '{}'", key)));
        }
        self.inner.remove(key).await
    }
}

/// The portal's old mock login made explicit: any non-empty username and
/// password pair signs in as a regular user, except the password `"wrong"`,
/// which is rejected so failure paths can be exercised.
#[derive(Debug, Default)]
pub struct FakeVerifier {
    admins: HashSet<String>,
}

impl FakeVerifier {
    pub const REJECTED_PASSWORD: &'static str = "wrong";

    pub fn new() -> Self {
        Self::default()
    }

    /// Usernames that verify with the admin role.
    pub fn with_admin(mut self, username: impl Into<String>) -> Self {
        self.admins.insert(username.into());
        self
    }
}

#[async_trait]
impl IdentityVerifier for FakeVerifier {
    async fn verify(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        if credentials.username.trim().is_empty()
            || credentials.password.is_empty()
            || credentials.password == Self::REJECTED_PASSWORD
        {
            return Err(AuthError::InvalidCredentials);
        }
        let role = if self.admins.contains(&credentials.username) {
            Role::Admin
        } else {
            Role::User
        };
        Ok(Identity {
            user_id: format!("fake-{}", credentials.username),
            display_name: credentials.username.clone(),
            email: credentials.username.clone(),
            role,
            phone: None,
        })
    }
}
