//! crates/appointment_core/src/repository.rs
//!
//! The appointment repository: validates bookings, owns the appointment list
//! under the `appointments` key, and reports every mutation to the activity log.

use chrono::{NaiveDate, NaiveTime};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::activity::ActivityLog;
use crate::adapters::{next_id, roll_back};
use crate::domain::{
    ActivityInput, ActivityType, Appointment, AppointmentFilter, AppointmentId,
    AppointmentInput, AppointmentStatus, ConsultationMode, PatientDetails,
};
use crate::error::{CoreError, CoreResult, ValidationErrors};
use crate::ports::{keys, BlobStore, Clock, PortResult};
use crate::records::{self, AppointmentRecord};
use crate::snapshot::Snapshot;

const MAX_AGE: u16 = 150;

pub struct AppointmentRepository {
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    activity: Arc<ActivityLog>,
    write_lock: Mutex<()>,
}

impl AppointmentRepository {
    pub fn new(store: Arc<dyn BlobStore>, clock: Arc<dyn Clock>, activity: Arc<ActivityLog>) -> Self {
        Self {
            store,
            clock,
            activity,
            write_lock: Mutex::new(()),
        }
    }

    /// Books a new appointment.
    ///
    /// Fails with `CoreError::Validation` naming every missing or unparseable
    /// field, including a date earlier than today (UTC).
    pub async fn create(&self, input: AppointmentInput) -> CoreResult<Appointment> {
        let _guard = self.write_lock.lock().await;

        let now = self.clock.now();
        let validated = validate(input, now.date_naive())?;

        let before = self.store.get(keys::APPOINTMENTS).await?;
        let mut appointments = self.load().await?;
        let id = next_id(now, appointments.iter().map(|a| a.id).max());
        let appointment = validated.into_appointment(id);
        appointments.push(appointment.clone());
        self.persist(&appointments).await?;

        let details = format!("New appointment booked with Doctor ID: {}", appointment.doctor_id);
        self.record(before, ActivityInput::new(ActivityType::Appointment, "booked", details))
            .await?;

        info!(id = appointment.id, doctor_id = %appointment.doctor_id, date = %appointment.date, "Appointment booked");
        Ok(appointment)
    }

    /// A snapshot of the appointments matching `filter`, in booking order.
    pub async fn list(&self, filter: AppointmentFilter) -> CoreResult<Snapshot<Appointment>> {
        let appointments = self.load().await?;
        Ok(Snapshot::filtered(appointments, move |a| filter.matches(a)))
    }

    pub async fn get(&self, id: AppointmentId) -> CoreResult<Appointment> {
        self.load()
            .await?
            .into_iter()
            .find(|a| a.id == id)
            .ok_or(CoreError::NotFound(id))
    }

    /// Moves an upcoming appointment to `completed` or `cancelled`.
    ///
    /// Terminal appointments never move again, and nothing moves back to
    /// `upcoming`; both cases fail with `CoreError::InvalidTransition`.
    pub async fn update_status(
        &self,
        id: AppointmentId,
        status: AppointmentStatus,
    ) -> CoreResult<Appointment> {
        let _guard = self.write_lock.lock().await;

        let before = self.store.get(keys::APPOINTMENTS).await?;
        let mut appointments = self.load().await?;
        let appointment = appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(CoreError::NotFound(id))?;

        if !appointment.status.can_transition_to(status) {
            warn!(id, from = %appointment.status, to = %status, "Rejected status transition");
            return Err(CoreError::InvalidTransition {
                id,
                from: appointment.status,
                to: status,
            });
        }
        appointment.status = status;
        let updated = appointment.clone();
        self.persist(&appointments).await?;

        let details = format!("Appointment {} with Doctor ID: {} marked as {}", id, updated.doctor_id, status);
        self.record(before, ActivityInput::new(ActivityType::Appointment, status.as_str(), details))
            .await?;

        info!(id, status = %status, "Appointment status updated");
        Ok(updated)
    }

    async fn load(&self) -> PortResult<Vec<Appointment>> {
        let records: Vec<AppointmentRecord> =
            records::load_list(self.store.as_ref(), keys::APPOINTMENTS).await?;
        records
            .into_iter()
            .map(|r| r.to_domain(keys::APPOINTMENTS))
            .collect()
    }

    async fn persist(&self, appointments: &[Appointment]) -> PortResult<()> {
        let records: Vec<AppointmentRecord> =
            appointments.iter().map(AppointmentRecord::from_domain).collect();
        let bytes = records::encode(keys::APPOINTMENTS, &records)?;
        self.store
            .set(keys::APPOINTMENTS, bytes)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to persist appointments"))
    }

    /// Appends to the activity log, undoing the appointments write if that fails.
    async fn record(&self, before: Option<Vec<u8>>, input: ActivityInput) -> CoreResult<()> {
        let Err(err) = self.activity.append(input).await else {
            return Ok(());
        };

        if let Err(e) = roll_back(self.store.as_ref(), keys::APPOINTMENTS, before, &err).await {
            error!(error = %e, "Failed to roll back appointments after activity log failure");
            return Err(e.into());
        }
        Err(err)
    }
}

//=========================================================================================
// Validation
//=========================================================================================

struct ValidatedBooking {
    doctor_id: String,
    patient: PatientDetails,
    date: NaiveDate,
    time: NaiveTime,
    symptoms: String,
    mode: ConsultationMode,
}

impl ValidatedBooking {
    fn into_appointment(self, id: AppointmentId) -> Appointment {
        Appointment {
            id,
            doctor_id: self.doctor_id,
            patient: self.patient,
            date: self.date,
            time: self.time,
            symptoms: self.symptoms,
            mode: self.mode,
            status: AppointmentStatus::Upcoming,
        }
    }
}

fn required(errors: &mut ValidationErrors, field: &'static str, value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.missing(field);
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

fn validate(input: AppointmentInput, today: NaiveDate) -> CoreResult<ValidatedBooking> {
    let mut errors = ValidationErrors::default();

    let doctor_id = required(&mut errors, "doctorId", &input.doctor_id);
    let name = required(&mut errors, "name", &input.name);

    let age = required(&mut errors, "age", &input.age).and_then(|raw| match raw.parse::<u16>() {
        Ok(age) if age <= MAX_AGE => Some(age),
        _ => {
            errors.invalid("age", format!("'{}' is not a whole number between 0 and {}", raw, MAX_AGE));
            None
        }
    });

    let gender = required(&mut errors, "gender", &input.gender);

    let date = required(&mut errors, "date", &input.date).and_then(|raw| {
        match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(date) if date < today => {
                errors.invalid("date", format!("{} is in the past", date));
                None
            }
            Ok(date) => Some(date),
            Err(_) => {
                errors.invalid("date", format!("'{}' is not a YYYY-MM-DD date", raw));
                None
            }
        }
    });

    let time = required(&mut errors, "time", &input.time).and_then(|raw| {
        let parsed = parse_time(&raw);
        if parsed.is_none() {
            errors.invalid("time", format!("'{}' is not an HH:MM time", raw));
        }
        parsed
    });

    let symptoms = required(&mut errors, "symptoms", &input.symptoms);

    match (doctor_id, name, age, gender, date, time, symptoms) {
        (Some(doctor_id), Some(name), Some(age), Some(gender), Some(date), Some(time), Some(symptoms)) => {
            Ok(ValidatedBooking {
                doctor_id,
                patient: PatientDetails {
                    name,
                    age,
                    gender,
                    email: optional(&input.email),
                    phone: optional(&input.phone),
                },
                date,
                time,
                symptoms,
                mode: input.mode,
            })
        }
        _ => Err(CoreError::Validation(errors)),
    }
}
