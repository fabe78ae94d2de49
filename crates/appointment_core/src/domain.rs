//! crates/appointment_core/src/domain.rs
//!
//! Defines the pure, core data structures for the appointment store.
//! These structs are independent of the blob store and of any wire format;
//! persisted shapes live in `records.rs`, HTTP shapes in the `api` service.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use std::fmt;
use std::str::FromStr;

pub type AppointmentId = u64;
pub type ActivityId = u64;
pub type ContactId = u64;

/// Returned by the `FromStr` impls below when the text names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

//=========================================================================================
// Appointments
//=========================================================================================

/// Lifecycle of an appointment. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppointmentStatus {
    Upcoming,
    Completed,
    Cancelled,
}

string_enum!(AppointmentStatus, "appointment status", {
    Upcoming => "upcoming",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl AppointmentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, AppointmentStatus::Upcoming)
    }

    /// Whether the status machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        self == AppointmentStatus::Upcoming && next.is_terminal()
    }
}

/// How the patient wants to be seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConsultationMode {
    #[default]
    Video,
    InPerson,
}

string_enum!(ConsultationMode, "consultation mode", {
    Video => "video",
    InPerson => "inPerson",
});

/// Contact and triage details captured by the booking form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientDetails {
    pub name: String,
    pub age: u16,
    pub gender: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A booked appointment with a doctor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appointment {
    pub id: AppointmentId,
    pub doctor_id: String,
    pub patient: PatientDetails,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub symptoms: String,
    pub mode: ConsultationMode,
    pub status: AppointmentStatus,
}

/// Raw booking request, exactly as typed into the form.
///
/// Everything except `mode` is unparsed text; `AppointmentRepository::create`
/// validates it and reports every bad field at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentInput {
    pub doctor_id: String,
    pub name: String,
    pub age: String,
    pub gender: String,
    pub email: String,
    pub phone: String,
    pub date: String,
    pub time: String,
    pub symptoms: String,
    pub mode: ConsultationMode,
}

/// Narrows `AppointmentRepository::list`. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub doctor_id: Option<String>,
    pub status: Option<AppointmentStatus>,
    /// Case-insensitive match on the patient's email.
    pub patient_email: Option<String>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        let doctor_ok = self
            .doctor_id
            .as_deref()
            .map_or(true, |d| appointment.doctor_id == d);
        let status_ok = self.status.map_or(true, |s| appointment.status == s);
        let email_ok = self.patient_email.as_deref().map_or(true, |wanted| {
            appointment
                .patient
                .email
                .as_deref()
                .is_some_and(|email| email.eq_ignore_ascii_case(wanted))
        });
        doctor_ok && status_ok && email_ok
    }
}

//=========================================================================================
// Activity log
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityType {
    Appointment,
    User,
    Doctor,
}

string_enum!(ActivityType, "activity type", {
    Appointment => "appointment",
    User => "user",
    Doctor => "doctor",
});

/// What a caller asks the log to record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityInput {
    pub kind: ActivityType,
    pub action: String,
    pub details: String,
}

impl ActivityInput {
    pub fn new(kind: ActivityType, action: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            kind,
            action: action.into(),
            details: details.into(),
        }
    }
}

/// A recorded administrative action. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    pub id: ActivityId,
    pub kind: ActivityType,
    pub action: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

//=========================================================================================
// Emergency contacts
//=========================================================================================

/// Someone to call for a patient in an emergency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyContact {
    pub id: ContactId,
    pub name: String,
    pub relationship: String,
    pub phone: String,
}

/// Raw contact form input. All three fields are required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInput {
    pub name: String,
    pub relationship: String,
    pub phone: String,
}

//=========================================================================================
// Identity and sessions
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    #[default]
    User,
    Admin,
}

string_enum!(Role, "role", {
    User => "user",
    Admin => "admin",
});

/// A sign-in attempt. The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Who the verifier says the caller is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
}

/// The signed-in identity of one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub signed_in_at: DateTime<Utc>,
}

impl Session {
    pub fn from_identity(identity: Identity, signed_in_at: DateTime<Utc>) -> Self {
        Self {
            user_id: identity.user_id,
            display_name: identity.display_name,
            email: identity.email,
            role: identity.role,
            phone: identity.phone,
            signed_in_at,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True once `max_age` has passed since sign-in.
    pub fn is_expired(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.signed_in_at >= max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_upcoming_moves_and_only_to_terminal() {
        use AppointmentStatus::*;
        assert!(Upcoming.can_transition_to(Completed));
        assert!(Upcoming.can_transition_to(Cancelled));
        assert!(!Upcoming.can_transition_to(Upcoming));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Upcoming));
    }

    #[test]
    fn enums_use_the_stored_spelling() {
        assert_eq!("inPerson".parse::<ConsultationMode>(), Ok(ConsultationMode::InPerson));
        assert_eq!(ActivityType::Appointment.to_string(), "appointment");
        let err = "pending".parse::<AppointmentStatus>().unwrap_err();
        assert_eq!(err.value, "pending");
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("alice@example.com", "hunter2");
        let printed = format!("{:?}", creds);
        assert!(printed.contains("alice@example.com"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn filter_matches_email_case_insensitively() {
        let appointment = Appointment {
            id: 1,
            doctor_id: "d1".into(),
            patient: PatientDetails {
                name: "Alice".into(),
                age: 30,
                gender: "female".into(),
                email: Some("Alice@Example.com".into()),
                phone: None,
            },
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            symptoms: "fever".into(),
            mode: ConsultationMode::Video,
            status: AppointmentStatus::Upcoming,
        };
        let filter = AppointmentFilter {
            patient_email: Some("alice@example.com".into()),
            ..Default::default()
        };
        assert!(filter.matches(&appointment));

        let other_doctor = AppointmentFilter {
            doctor_id: Some("d2".into()),
            ..Default::default()
        };
        assert!(!other_doctor.matches(&appointment));
    }

    #[test]
    fn sessions_expire_after_their_max_age() {
        use chrono::TimeZone;
        let signed_in_at = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
        let session = Session {
            user_id: "u1".into(),
            display_name: "Alice".into(),
            email: "alice@example.com".into(),
            role: Role::User,
            phone: None,
            signed_in_at,
        };
        let max_age = Duration::days(30);
        assert!(!session.is_expired(signed_in_at + Duration::days(29), max_age));
        assert!(session.is_expired(signed_in_at + max_age, max_age));
    }
}
