//! services/api/src/adapters/accounts.rs
//!
//! Password-based identity verification, the production implementation of the
//! `IdentityVerifier` port. Patient accounts are registered through sign-up and
//! kept under the `accounts` key with argon2 password hashes; the single admin
//! account comes from the environment as an argon2 hash.

use crate::config::AdminAccount;
use appointment_core::domain::{ActivityInput, ActivityType, Credentials, Identity, Role};
use appointment_core::ports::{AuthError, BlobStore, IdentityVerifier, PortError, PortResult};
use appointment_core::{roll_back, ActivityLog, CoreError};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

pub const ACCOUNTS_KEY: &str = "accounts";
const ADMIN_USER_ID: &str = "admin";

/// Errors raised while registering a new account.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("An account with email {0} already exists")]
    DuplicateEmail(String),
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Failed to hash password: {0}")]
    Hashing(String),
    #[error(transparent)]
    Storage(#[from] PortError),
    #[error("Failed to record registration: {0}")]
    Activity(#[from] CoreError),
}

/// What the sign-up form submits.
#[derive(Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

//=========================================================================================
// "Impure" Persisted Record
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRecord {
    user_id: Uuid,
    name: String,
    email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
    password_hash: String,
}

impl AccountRecord {
    fn to_identity(&self) -> Identity {
        Identity {
            user_id: self.user_id.to_string(),
            display_name: self.name.clone(),
            email: self.email.clone(),
            role: Role::User,
            phone: self.phone.clone(),
        }
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

pub struct AccountVerifier {
    store: Arc<dyn BlobStore>,
    admin: Option<AdminAccount>,
    write_lock: Mutex<()>,
}

impl AccountVerifier {
    pub fn new(store: Arc<dyn BlobStore>, admin: Option<AdminAccount>) -> Self {
        Self {
            store,
            admin,
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a patient account, records it in `activity`, and returns its identity.
    ///
    /// If the activity entry cannot be written the account is removed again,
    /// so a failed sign-up can simply be retried.
    pub async fn register(
        &self,
        registration: Registration,
        activity: &ActivityLog,
    ) -> Result<Identity, RegistrationError> {
        let name = registration.name.trim();
        let email = registration.email.trim();
        if name.is_empty() {
            return Err(RegistrationError::MissingField("name"));
        }
        if email.is_empty() {
            return Err(RegistrationError::MissingField("email"));
        }
        if registration.password.is_empty() {
            return Err(RegistrationError::MissingField("password"));
        }

        let _guard = self.write_lock.lock().await;
        let before = self.store.get(ACCOUNTS_KEY).await?;
        let mut accounts = self.load().await?;
        let taken = accounts.iter().any(|a| a.email.eq_ignore_ascii_case(email))
            || self
                .admin
                .as_ref()
                .is_some_and(|admin| admin.username.eq_ignore_ascii_case(email));
        if taken {
            return Err(RegistrationError::DuplicateEmail(email.to_string()));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(registration.password.as_bytes(), &salt)
            .map_err(|e| RegistrationError::Hashing(e.to_string()))?
            .to_string();

        let record = AccountRecord {
            user_id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            phone: registration
                .phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            password_hash,
        };
        let identity = record.to_identity();
        accounts.push(record);

        let bytes = serde_json::to_vec(&accounts)
            .map_err(|e| PortError::Unexpected(format!("failed to encode accounts: {}", e)))?;
        self.store.set(ACCOUNTS_KEY, bytes).await?;

        let details = format!("New user registered: {}", identity.email);
        if let Err(err) = activity
            .append(ActivityInput::new(ActivityType::User, "registered", details))
            .await
        {
            if let Err(e) = roll_back(self.store.as_ref(), ACCOUNTS_KEY, before, &err).await {
                error!(error = %e, "Failed to roll back accounts after activity log failure");
                return Err(e.into());
            }
            return Err(err.into());
        }

        info!(user_id = %identity.user_id, "Account registered");
        Ok(identity)
    }

    async fn load(&self) -> PortResult<Vec<AccountRecord>> {
        match self.store.get(ACCOUNTS_KEY).await? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| PortError::Corrupt {
                key: ACCOUNTS_KEY.to_string(),
                reason: e.to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }
}

/// Checks `password` against a PHC hash string. Unparseable hashes never match.
fn password_matches(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!("Failed to parse password hash: {:?}", e);
            false
        }
    }
}

//=========================================================================================
// `IdentityVerifier` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityVerifier for AccountVerifier {
    async fn verify(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        let username = credentials.username.trim();

        if let Some(admin) = self.admin.as_ref().filter(|a| a.username == username) {
            if !password_matches(&credentials.password, &admin.password_hash) {
                return Err(AuthError::InvalidCredentials);
            }
            return Ok(Identity {
                user_id: ADMIN_USER_ID.to_string(),
                display_name: "Admin User".to_string(),
                email: admin.username.clone(),
                role: Role::Admin,
                phone: None,
            });
        }

        let accounts = self
            .load()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;
        let account = accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(username))
            .ok_or(AuthError::InvalidCredentials)?;

        if !password_matches(&credentials.password, &account.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(account.to_identity())
    }
}
