//! services/api/src/web/protocol.rs
//!
//! Defines the JSON message shapes exchanged between the portal front-ends and
//! the API server, and how core errors are rendered to them.

use appointment_core::{
    ActivityEntry, Appointment, AppointmentInput, ConsultationMode, ContactInput, CoreError,
    EmergencyContact, FieldProblem, Session, ValidationErrors,
};
use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

//=========================================================================================
// Messages Sent FROM the Client TO the Server
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// `username` is an email for patients, or the configured admin name.
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(alias = "email")]
    pub username: String,
    pub password: String,
}

/// The booking form. Missing fields arrive as empty strings so that
/// validation can name all of them at once.
#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingRequest {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub email: String,
    pub phone: String,
    pub date: String,
    pub time: String,
    pub symptoms: String,
    /// `video` (default) or `inPerson`.
    #[serde(alias = "preferredMode")]
    pub mode: Option<String>,
}

impl BookingRequest {
    /// Converts the form into core input, failing only on an unknown `mode`.
    pub fn into_input(self, doctor_id: String) -> Result<AppointmentInput, ValidationErrors> {
        let mode = match self.mode.as_deref().map(str::trim) {
            None | Some("") => ConsultationMode::default(),
            Some(raw) => raw.parse().map_err(|_| {
                let mut errors = ValidationErrors::default();
                errors.invalid("mode", format!("'{}' is not one of video, inPerson", raw));
                errors
            })?,
        };
        Ok(AppointmentInput {
            doctor_id,
            name: self.name,
            age: self.age,
            gender: self.gender,
            email: self.email,
            phone: self.phone,
            date: self.date,
            time: self.time,
            symptoms: self.symptoms,
            mode,
        })
    }
}

#[derive(Deserialize, ToSchema)]
pub struct StatusUpdateRequest {
    /// `completed` or `cancelled`.
    pub status: String,
}

/// The emergency contact form; every field is required.
#[derive(Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct ContactRequest {
    pub name: String,
    pub relationship: String,
    pub phone: String,
}

impl From<ContactRequest> for ContactInput {
    fn from(req: ContactRequest) -> Self {
        Self {
            name: req.name,
            relationship: req.relationship,
            phone: req.phone,
        }
    }
}

#[derive(Deserialize, IntoParams, Default)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AppointmentQuery {
    pub doctor_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct ActivityQuery {
    /// Only the newest `limit` entries, newest first.
    pub limit: Option<usize>,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client
//=========================================================================================

#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub signed_in_at: String,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            user_id: session.user_id,
            display_name: session.display_name,
            email: session.email,
            role: session.role.to_string(),
            phone: session.phone,
            signed_in_at: session.signed_in_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct PatientResponse {
    pub name: String,
    pub age: u16,
    pub gender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentResponse {
    pub id: u64,
    pub doctor_id: String,
    pub patient: PatientResponse,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    pub symptoms: String,
    pub mode: String,
    pub status: String,
}

impl From<Appointment> for AppointmentResponse {
    fn from(a: Appointment) -> Self {
        Self {
            id: a.id,
            doctor_id: a.doctor_id,
            patient: PatientResponse {
                name: a.patient.name,
                age: a.patient.age,
                gender: a.patient.gender,
                email: a.patient.email,
                phone: a.patient.phone,
            },
            date: a.date.format("%Y-%m-%d").to_string(),
            time: a.time.format("%H:%M").to_string(),
            symptoms: a.symptoms,
            mode: a.mode.to_string(),
            status: a.status.to_string(),
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct ActivityResponse {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub action: String,
    pub details: String,
    pub timestamp: String,
}

impl From<ActivityEntry> for ActivityResponse {
    fn from(entry: ActivityEntry) -> Self {
        Self {
            id: entry.id,
            kind: entry.kind.to_string(),
            action: entry.action,
            details: entry.details,
            timestamp: entry.timestamp.to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct ContactResponse {
    pub id: u64,
    pub name: String,
    pub relationship: String,
    pub phone: String,
}

impl From<EmergencyContact> for ContactResponse {
    fn from(contact: EmergencyContact) -> Self {
        Self {
            id: contact.id,
            name: contact.name,
            relationship: contact.relationship,
            phone: contact.phone,
        }
    }
}

//=========================================================================================
// Errors
//=========================================================================================

#[derive(Serialize, ToSchema, Debug)]
pub struct FieldErrorBody {
    pub field: String,
    /// `missing` or `invalid`.
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldErrorBody>,
}

/// The error half of every handler's return type.
pub type ErrorResponse = (StatusCode, Json<ErrorBody>);

pub fn error_response(status: StatusCode, error: &str, message: impl Into<String>) -> ErrorResponse {
    (
        status,
        Json(ErrorBody {
            error: error.to_string(),
            message: message.into(),
            fields: Vec::new(),
        }),
    )
}

pub fn validation_response(errors: &ValidationErrors) -> ErrorResponse {
    let fields = errors
        .fields()
        .iter()
        .map(|e| {
            let (problem, reason) = match &e.problem {
                FieldProblem::Missing => ("missing", None),
                FieldProblem::Invalid(reason) => ("invalid", Some(reason.clone())),
            };
            FieldErrorBody {
                field: e.field.to_string(),
                problem: problem.to_string(),
                reason,
            }
        })
        .collect();
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorBody {
            error: "validation".to_string(),
            message: errors.to_string(),
            fields,
        }),
    )
}

pub fn core_error_response(err: CoreError) -> ErrorResponse {
    match &err {
        CoreError::Validation(errors) => validation_response(errors),
        CoreError::NotFound(_) | CoreError::ContactNotFound(_) => {
            error_response(StatusCode::NOT_FOUND, "not_found", err.to_string())
        }
        CoreError::InvalidTransition { .. } => {
            error_response(StatusCode::CONFLICT, "invalid_transition", err.to_string())
        }
        CoreError::Authentication(_) => {
            error_response(StatusCode::UNAUTHORIZED, "authentication", err.to_string())
        }
        CoreError::Storage(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage",
            "The appointment store is unavailable",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appointment_core::{AppointmentStatus, PortError};

    #[test]
    fn core_errors_map_to_distinct_statuses() {
        let cases = [
            (CoreError::NotFound(7), StatusCode::NOT_FOUND),
            (CoreError::ContactNotFound(7), StatusCode::NOT_FOUND),
            (
                CoreError::InvalidTransition {
                    id: 7,
                    from: AppointmentStatus::Completed,
                    to: AppointmentStatus::Cancelled,
                },
                StatusCode::CONFLICT,
            ),
            (
                CoreError::Storage(PortError::Unavailable("disk".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(core_error_response(err).0, expected);
        }
    }

    #[test]
    fn validation_body_lists_fields() {
        let mut errors = ValidationErrors::default();
        errors.missing("name");
        errors.invalid("date", "2025-02-30 is not a date");
        let (status, Json(body)) = validation_response(&errors);
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.fields.len(), 2);
        assert_eq!(body.fields[0].problem, "missing");
        assert_eq!(body.fields[1].reason.as_deref(), Some("2025-02-30 is not a date"));
    }

    #[test]
    fn booking_request_defaults_mode_and_rejects_unknown_modes() {
        let request: BookingRequest = serde_json::from_str(r#"{"name":"Alice"}"#).unwrap();
        let input = request.into_input("d1".into()).unwrap();
        assert_eq!(input.mode, ConsultationMode::Video);
        assert_eq!(input.doctor_id, "d1");
        assert!(input.age.is_empty());

        let request: BookingRequest = serde_json::from_str(r#"{"preferredMode":"phone"}"#).unwrap();
        let errors = request.into_input("d1".into()).unwrap_err();
        assert!(errors.contains("mode"));
    }
}
