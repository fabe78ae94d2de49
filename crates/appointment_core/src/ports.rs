//! crates/appointment_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core depends on.
//! These traits form the boundary of the hexagonal architecture: the core never
//! touches a concrete storage technology or identity provider, it is handed one
//! at construction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Credentials, Identity};

//=========================================================================================
// Port Error and Result Types
//=========================================================================================

/// A generic error type for blob store operations.
/// This abstracts away the specific errors of the backing technology (files, memory, ...).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Stored value under '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    /// A multi-key write failed half way and could not be undone.
    #[error("Store may be inconsistent at '{key}': {reason}")]
    Inconsistent { key: String, reason: String },
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Outcome of a failed identity verification.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

//=========================================================================================
// Blob store keys
//=========================================================================================

/// Logical collection names used with the blob store.
pub mod keys {
    pub const APPOINTMENTS: &str = "appointments";
    pub const ACTIVITIES: &str = "adminActivities";
    pub const SESSION: &str = "user";
    pub const EMERGENCY_CONTACTS: &str = "emergencyContacts";
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Key-value persistence standing in for browser local storage.
///
/// `set` must replace the value atomically: a reader sees either the old or the
/// new bytes, and a failed `set` leaves the old bytes in place.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>) -> PortResult<()>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> PortResult<()>;
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Checks credentials and resolves the identity they belong to.
    async fn verify(&self, credentials: &Credentials) -> Result<Identity, AuthError>;
}

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
