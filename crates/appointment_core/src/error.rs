//! crates/appointment_core/src/error.rs
//!
//! The error taxonomy surfaced by the core services.

use std::fmt;

use crate::domain::{AppointmentId, AppointmentStatus, ContactId};
use crate::ports::{AuthError, PortError};

/// What is wrong with a single form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldProblem {
    Missing,
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub problem: FieldProblem,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.problem {
            FieldProblem::Missing => write!(f, "{} is required", self.field),
            FieldProblem::Invalid(reason) => write!(f, "{} is invalid: {}", self.field, reason),
        }
    }
}

/// Every field that failed validation, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn missing(&mut self, field: &'static str) {
        self.0.push(FieldError {
            field,
            problem: FieldProblem::Missing,
        });
    }

    pub fn invalid(&mut self, field: &'static str, reason: impl Into<String>) {
        self.0.push(FieldError {
            field,
            problem: FieldProblem::Invalid(reason.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

/// The primary error type of the core services.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Malformed or missing booking input; the caller can correct and retry.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Appointment {0} not found")]
    NotFound(AppointmentId),

    #[error("Emergency contact {0} not found")]
    ContactNotFound(ContactId),

    #[error("Appointment {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: AppointmentId,
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Authentication failed: {0}")]
    Authentication(#[from] AuthError),

    /// The blob store failed. The operation was not applied unless the cause
    /// is `PortError::Inconsistent`.
    #[error("Storage error: {0}")]
    Storage(#[from] PortError),
}

/// A convenience type alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;
