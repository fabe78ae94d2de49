//! crates/appointment_core/src/records.rs
//!
//! "Impure" persisted shapes of the domain types and the JSON codec used to
//! read and write them through a `BlobStore`. Keys are camelCase so blobs look
//! like the ones the browser portal kept in local storage.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::domain::{
    ActivityEntry, ActivityId, Appointment, AppointmentId, ContactId, EmergencyContact,
    PatientDetails, Session,
};
use crate::ports::{BlobStore, PortError, PortResult};

//=========================================================================================
// Codec helpers
//=========================================================================================

/// Reads and decodes the value under `key`. Missing or blank blobs decode to `None`.
pub(crate) async fn load<R: DeserializeOwned>(
    store: &dyn BlobStore,
    key: &str,
) -> PortResult<Option<R>> {
    let Some(bytes) = store.get(key).await? else {
        return Ok(None);
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| corrupt(key, e))
}

pub(crate) async fn load_list<R: DeserializeOwned>(
    store: &dyn BlobStore,
    key: &str,
) -> PortResult<Vec<R>> {
    Ok(load(store, key).await?.unwrap_or_default())
}

pub(crate) fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> PortResult<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| PortError::Unexpected(format!("failed to encode '{}': {}", key, e)))
}

pub(crate) fn corrupt(key: &str, reason: impl ToString) -> PortError {
    PortError::Corrupt {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

//=========================================================================================
// Records
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PatientRecord {
    name: String,
    age: u16,
    gender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AppointmentRecord {
    id: AppointmentId,
    doctor_id: String,
    patient: PatientRecord,
    date: NaiveDate,
    time: NaiveTime,
    symptoms: String,
    mode: String,
    status: String,
}

impl AppointmentRecord {
    pub(crate) fn from_domain(appointment: &Appointment) -> Self {
        let patient = &appointment.patient;
        Self {
            id: appointment.id,
            doctor_id: appointment.doctor_id.clone(),
            patient: PatientRecord {
                name: patient.name.clone(),
                age: patient.age,
                gender: patient.gender.clone(),
                email: patient.email.clone(),
                phone: patient.phone.clone(),
            },
            date: appointment.date,
            time: appointment.time,
            symptoms: appointment.symptoms.clone(),
            mode: appointment.mode.as_str().to_string(),
            status: appointment.status.as_str().to_string(),
        }
    }

    pub(crate) fn to_domain(self, key: &str) -> PortResult<Appointment> {
        Ok(Appointment {
            id: self.id,
            doctor_id: self.doctor_id,
            patient: PatientDetails {
                name: self.patient.name,
                age: self.patient.age,
                gender: self.patient.gender,
                email: self.patient.email,
                phone: self.patient.phone,
            },
            date: self.date,
            time: self.time,
            symptoms: self.symptoms,
            mode: self.mode.parse().map_err(|e| corrupt(key, e))?,
            status: self.status.parse().map_err(|e| corrupt(key, e))?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ActivityRecord {
    id: ActivityId,
    #[serde(rename = "type")]
    kind: String,
    action: String,
    details: String,
    timestamp: DateTime<Utc>,
}

impl ActivityRecord {
    pub(crate) fn from_domain(entry: &ActivityEntry) -> Self {
        Self {
            id: entry.id,
            kind: entry.kind.as_str().to_string(),
            action: entry.action.clone(),
            details: entry.details.clone(),
            timestamp: entry.timestamp,
        }
    }

    pub(crate) fn to_domain(self, key: &str) -> PortResult<ActivityEntry> {
        Ok(ActivityEntry {
            id: self.id,
            kind: self.kind.parse().map_err(|e| corrupt(key, e))?,
            action: self.action,
            details: self.details,
            timestamp: self.timestamp,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionRecord {
    user_id: String,
    display_name: String,
    email: String,
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
    signed_in_at: DateTime<Utc>,
}

impl SessionRecord {
    pub(crate) fn from_domain(session: &Session) -> Self {
        Self {
            user_id: session.user_id.clone(),
            display_name: session.display_name.clone(),
            email: session.email.clone(),
            role: session.role.as_str().to_string(),
            phone: session.phone.clone(),
            signed_in_at: session.signed_in_at,
        }
    }

    pub(crate) fn to_domain(self, key: &str) -> PortResult<Session> {
        Ok(Session {
            user_id: self.user_id,
            display_name: self.display_name,
            email: self.email,
            role: self.role.parse().map_err(|e| corrupt(key, e))?,
            phone: self.phone,
            signed_in_at: self.signed_in_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContactRecord {
    id: ContactId,
    name: String,
    relationship: String,
    phone: String,
}

impl ContactRecord {
    pub(crate) fn from_domain(contact: &EmergencyContact) -> Self {
        Self {
            id: contact.id,
            name: contact.name.clone(),
            relationship: contact.relationship.clone(),
            phone: contact.phone.clone(),
        }
    }

    pub(crate) fn to_domain(self) -> EmergencyContact {
        EmergencyContact {
            id: self.id,
            name: self.name,
            relationship: self.relationship,
            phone: self.phone,
        }
    }
}
