//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the appointment and activity endpoints and the
//! master definition for the OpenAPI specification.

use crate::web::protocol::{
    core_error_response, error_response, validation_response, ActivityQuery, ActivityResponse,
    AppointmentQuery, AppointmentResponse, BookingRequest, ContactRequest, ContactResponse,
    ErrorBody, ErrorResponse, FieldErrorBody, LoginRequest, PatientResponse, SessionResponse,
    SignupRequest, StatusUpdateRequest,
};
use crate::web::state::AppState;
use appointment_core::{
    Appointment, AppointmentFilter, AppointmentId, AppointmentStatus, ContactId, CoreError,
    Session, ValidationErrors,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::auth::me_handler,
        book_appointment_handler,
        list_appointments_handler,
        get_appointment_handler,
        update_status_handler,
        list_activities_handler,
        list_contacts_handler,
        add_contact_handler,
        remove_contact_handler,
    ),
    components(
        schemas(
            SignupRequest,
            LoginRequest,
            SessionResponse,
            BookingRequest,
            StatusUpdateRequest,
            AppointmentResponse,
            PatientResponse,
            ActivityResponse,
            ContactRequest,
            ContactResponse,
            ErrorBody,
            FieldErrorBody,
        )
    ),
    tags(
        (name = "Appointment Portal API", description = "Booking, appointment status, emergency contact, and admin activity endpoints for the patient portal and admin console.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Access helpers
//=========================================================================================

/// Patients only see appointments booked under their own email, which the
/// booking handler stamps from the session.
fn can_see(session: &Session, appointment: &Appointment) -> bool {
    session.is_admin()
        || appointment
            .patient
            .email
            .as_deref()
            .is_some_and(|email| email.eq_ignore_ascii_case(&session.email))
}

fn log_storage_failure(context: &str, err: &CoreError) {
    if let CoreError::Storage(e) = err {
        error!("{}: {:?}", context, e);
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Book an appointment with a doctor.
///
/// A patient's booking always carries their own account email, whatever the
/// form says; a blank `name` is filled from the session. Admins booking on a
/// patient's behalf supply the patient's email themselves.
#[utoipa::path(
    post,
    path = "/doctors/{doctor_id}/appointments",
    request_body = BookingRequest,
    params(("doctor_id" = String, Path, description = "The doctor being booked.")),
    responses(
        (status = 201, description = "Appointment booked", body = AppointmentResponse),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 422, description = "Missing or invalid fields", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn book_appointment_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(doctor_id): Path<String>,
    Json(mut req): Json<BookingRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    if req.name.trim().is_empty() {
        req.name = session.display_name.clone();
    }
    if !session.is_admin() || req.email.trim().is_empty() {
        req.email = session.email.clone();
    }

    let input = req
        .into_input(doctor_id)
        .map_err(|errors| validation_response(&errors))?;
    let appointment = state.appointments.create(input).await.map_err(|e| {
        log_storage_failure("Failed to book appointment", &e);
        core_error_response(e)
    })?;

    info!(id = appointment.id, user_id = %session.user_id, "Booking accepted");
    Ok((StatusCode::CREATED, Json(AppointmentResponse::from(appointment))))
}

/// List appointments, optionally by doctor and status.
///
/// Admins see every appointment; patients see their own.
#[utoipa::path(
    get,
    path = "/appointments",
    params(AppointmentQuery),
    responses(
        (status = 200, description = "Appointments in booking order", body = [AppointmentResponse]),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 422, description = "Unknown status filter", body = ErrorBody)
    )
)]
pub async fn list_appointments_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(query): Query<AppointmentQuery>,
) -> Result<Json<Vec<AppointmentResponse>>, ErrorResponse> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(raw.parse::<AppointmentStatus>().map_err(|e| {
            let mut errors = ValidationErrors::default();
            errors.invalid("status", e.to_string());
            validation_response(&errors)
        })?),
        None => None,
    };
    let filter = AppointmentFilter {
        doctor_id: query.doctor_id,
        status,
        patient_email: (!session.is_admin()).then(|| session.email.clone()),
    };

    let snapshot = state.appointments.list(filter).await.map_err(|e| {
        log_storage_failure("Failed to list appointments", &e);
        core_error_response(e)
    })?;
    Ok(Json(snapshot.iter().cloned().map(AppointmentResponse::from).collect()))
}

/// Fetch a single appointment.
#[utoipa::path(
    get,
    path = "/appointments/{id}",
    params(("id" = u64, Path, description = "Appointment id.")),
    responses(
        (status = 200, description = "The appointment", body = AppointmentResponse),
        (status = 404, description = "No such appointment", body = ErrorBody)
    )
)]
pub async fn get_appointment_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<AppointmentId>,
) -> Result<Json<AppointmentResponse>, ErrorResponse> {
    let appointment = state.appointments.get(id).await.map_err(core_error_response)?;
    if !can_see(&session, &appointment) {
        return Err(core_error_response(CoreError::NotFound(id)));
    }
    Ok(Json(AppointmentResponse::from(appointment)))
}

/// Complete or cancel an appointment.
///
/// Admins may make any allowed transition. Patients may only cancel their own
/// appointments.
#[utoipa::path(
    put,
    path = "/appointments/{id}/status",
    request_body = StatusUpdateRequest,
    params(("id" = u64, Path, description = "Appointment id.")),
    responses(
        (status = 200, description = "Status updated", body = AppointmentResponse),
        (status = 403, description = "Not allowed for this user", body = ErrorBody),
        (status = 404, description = "No such appointment", body = ErrorBody),
        (status = 409, description = "Appointment is already completed or cancelled", body = ErrorBody),
        (status = 422, description = "Unknown status", body = ErrorBody)
    )
)]
pub async fn update_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<AppointmentId>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<AppointmentResponse>, ErrorResponse> {
    let status = req.status.parse::<AppointmentStatus>().map_err(|e| {
        let mut errors = ValidationErrors::default();
        errors.invalid("status", e.to_string());
        validation_response(&errors)
    })?;

    if !session.is_admin() {
        let appointment = state.appointments.get(id).await.map_err(core_error_response)?;
        if !can_see(&session, &appointment) {
            return Err(core_error_response(CoreError::NotFound(id)));
        }
        if status != AppointmentStatus::Cancelled {
            return Err(error_response(
                StatusCode::FORBIDDEN,
                "forbidden",
                "Patients can only cancel appointments",
            ));
        }
    }

    let appointment = state.appointments.update_status(id, status).await.map_err(|e| {
        log_storage_failure("Failed to update appointment status", &e);
        core_error_response(e)
    })?;
    Ok(Json(AppointmentResponse::from(appointment)))
}

/// The admin activity log.
#[utoipa::path(
    get,
    path = "/admin/activities",
    params(ActivityQuery),
    responses(
        (status = 200, description = "Activity entries; insertion order, or newest first with `limit`", body = [ActivityResponse]),
        (status = 403, description = "Admins only", body = ErrorBody)
    )
)]
pub async fn list_activities_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityResponse>>, ErrorResponse> {
    if !session.is_admin() {
        return Err(error_response(StatusCode::FORBIDDEN, "forbidden", "Admins only"));
    }

    let entries = match query.limit {
        Some(limit) => state.activity.recent(limit).await,
        None => state.activity.list().await,
    }
    .map_err(|e| {
        log_storage_failure("Failed to read activity log", &e);
        core_error_response(e)
    })?;
    Ok(Json(entries.iter().cloned().map(ActivityResponse::from).collect()))
}

/// The signed-in user's emergency contacts.
#[utoipa::path(
    get,
    path = "/contacts",
    responses(
        (status = 200, description = "Contacts in the order they were added", body = [ContactResponse]),
        (status = 401, description = "Not signed in", body = ErrorBody)
    )
)]
pub async fn list_contacts_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<ContactResponse>>, ErrorResponse> {
    let contacts = state.contacts.list(&session.user_id).await.map_err(|e| {
        log_storage_failure("Failed to read emergency contacts", &e);
        core_error_response(e)
    })?;
    Ok(Json(contacts.iter().cloned().map(ContactResponse::from).collect()))
}

/// Add an emergency contact.
#[utoipa::path(
    post,
    path = "/contacts",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Contact added", body = ContactResponse),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 422, description = "Missing fields", body = ErrorBody)
    )
)]
pub async fn add_contact_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(req): Json<ContactRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let contact = state
        .contacts
        .add(&session.user_id, req.into())
        .await
        .map_err(|e| {
            log_storage_failure("Failed to add emergency contact", &e);
            core_error_response(e)
        })?;
    Ok((StatusCode::CREATED, Json(ContactResponse::from(contact))))
}

/// Remove one of the signed-in user's emergency contacts.
#[utoipa::path(
    delete,
    path = "/contacts/{id}",
    params(("id" = u64, Path, description = "Contact id.")),
    responses(
        (status = 204, description = "Contact removed"),
        (status = 404, description = "No such contact", body = ErrorBody)
    )
)]
pub async fn remove_contact_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<ContactId>,
) -> Result<StatusCode, ErrorResponse> {
    state
        .contacts
        .remove(&session.user_id, id)
        .await
        .map_err(|e| {
            log_storage_failure("Failed to remove emergency contact", &e);
            core_error_response(e)
        })?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::test_support::{admin_session, test_state, user_session};

    fn booking() -> BookingRequest {
        BookingRequest {
            age: "30".into(),
            gender: "female".into(),
            date: "2025-06-01".into(),
            time: "10:00".into(),
            symptoms: "fever".into(),
            mode: Some("video".into()),
            ..Default::default()
        }
    }

    async fn book(state: &Arc<AppState>, session: &Session, doctor: &str) -> serde_json::Value {
        let response = book_appointment_handler(
            State(state.clone()),
            Extension(session.clone()),
            Path(doctor.to_string()),
            Json(booking()),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn id_of(booked: &serde_json::Value) -> AppointmentId {
        booked["id"].as_u64().unwrap()
    }

    #[tokio::test]
    async fn booking_fills_name_and_email_from_the_session() {
        let state = test_state();
        let alice = user_session("alice@example.com");
        let booked = book(&state, &alice, "d1").await;

        assert_eq!(booked["status"], "upcoming");
        assert_eq!(booked["doctorId"], "d1");
        assert_eq!(booked["patient"]["name"], alice.display_name.as_str());
        assert_eq!(booked["patient"]["email"], "alice@example.com");
        assert_eq!(booked["time"], "10:00");
    }

    #[tokio::test]
    async fn invalid_booking_is_unprocessable_with_field_list() {
        let state = test_state();
        let mut req = booking();
        req.date = "01/06/2025".into();
        req.symptoms = String::new();
        let err = book_appointment_handler(
            State(state),
            Extension(user_session("alice@example.com")),
            Path("d1".into()),
            Json(req),
        )
        .await
        .map(|_| ())
        .unwrap_err();

        assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);
        let fields: Vec<_> = err.1 .0.fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, ["date", "symptoms"]);
    }

    #[tokio::test]
    async fn patients_only_list_their_own_appointments() {
        let state = test_state();
        let alice = user_session("alice@example.com");
        let bob = user_session("bob@example.com");
        book(&state, &alice, "d1").await;
        book(&state, &bob, "d1").await;
        book(&state, &bob, "d2").await;

        let Json(for_bob) = list_appointments_handler(
            State(state.clone()),
            Extension(bob),
            Query(AppointmentQuery::default()),
        )
        .await
        .unwrap();
        assert_eq!(for_bob.len(), 2);

        let Json(for_admin) = list_appointments_handler(
            State(state),
            Extension(admin_session()),
            Query(AppointmentQuery {
                doctor_id: Some("d1".into()),
                status: Some("upcoming".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(for_admin.len(), 2);
    }

    #[tokio::test]
    async fn unknown_status_filter_is_rejected() {
        let err = list_appointments_handler(
            State(test_state()),
            Extension(admin_session()),
            Query(AppointmentQuery {
                doctor_id: None,
                status: Some("pending".into()),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn admin_completes_then_second_transition_conflicts() {
        let state = test_state();
        let booked = book(&state, &user_session("alice@example.com"), "d1").await;

        let Json(done) = update_status_handler(
            State(state.clone()),
            Extension(admin_session()),
            Path(id_of(&booked)),
            Json(StatusUpdateRequest {
                status: "completed".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(done.status, "completed");

        let err = update_status_handler(
            State(state.clone()),
            Extension(admin_session()),
            Path(id_of(&booked)),
            Json(StatusUpdateRequest {
                status: "cancelled".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::CONFLICT);

        let Json(log) = list_activities_handler(
            State(state),
            Extension(admin_session()),
            Query(ActivityQuery::default()),
        )
        .await
        .unwrap();
        let actions: Vec<_> = log.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, ["booked", "completed"]);
    }

    #[tokio::test]
    async fn patients_may_cancel_their_own_but_not_complete() {
        let state = test_state();
        let alice = user_session("alice@example.com");
        let booked = book(&state, &alice, "d1").await;

        let err = update_status_handler(
            State(state.clone()),
            Extension(alice.clone()),
            Path(id_of(&booked)),
            Json(StatusUpdateRequest {
                status: "completed".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::FORBIDDEN);

        let err = update_status_handler(
            State(state.clone()),
            Extension(user_session("mallory@example.com")),
            Path(id_of(&booked)),
            Json(StatusUpdateRequest {
                status: "cancelled".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);

        let Json(cancelled) = update_status_handler(
            State(state),
            Extension(alice),
            Path(id_of(&booked)),
            Json(StatusUpdateRequest {
                status: "cancelled".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(cancelled.status, "cancelled");
    }

    #[tokio::test]
    async fn unknown_appointment_is_not_found() {
        let err = get_appointment_handler(State(test_state()), Extension(admin_session()), Path(99))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn patients_cannot_book_under_someone_elses_email() {
        let state = test_state();
        let alice = user_session("alice@example.com");
        let bob = user_session("bob@example.com");

        let mut req = booking();
        req.email = "alice@example.com".into();
        let response = book_appointment_handler(
            State(state.clone()),
            Extension(bob.clone()),
            Path("d1".into()),
            Json(req),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let list_for = |session: Session| {
            list_appointments_handler(
                State(state.clone()),
                Extension(session),
                Query(AppointmentQuery::default()),
            )
        };
        let Json(for_bob) = list_for(bob).await.unwrap();
        assert_eq!(for_bob.len(), 1);
        assert_eq!(for_bob[0].patient.email.as_deref(), Some("bob@example.com"));
        let Json(for_alice) = list_for(alice).await.unwrap();
        assert!(for_alice.is_empty());
    }

    #[tokio::test]
    async fn admins_book_on_behalf_of_a_patient() {
        let state = test_state();
        let mut req = booking();
        req.name = "Alice".into();
        req.email = "alice@example.com".into();
        book_appointment_handler(
            State(state.clone()),
            Extension(admin_session()),
            Path("d1".into()),
            Json(req),
        )
        .await
        .unwrap();

        let Json(for_alice) = list_appointments_handler(
            State(state),
            Extension(user_session("alice@example.com")),
            Query(AppointmentQuery::default()),
        )
        .await
        .unwrap();
        assert_eq!(for_alice.len(), 1);
    }

    fn contact(name: &str) -> Json<ContactRequest> {
        Json(ContactRequest {
            name: name.into(),
            relationship: "Spouse".into(),
            phone: "+91 98765 43211".into(),
        })
    }

    #[tokio::test]
    async fn contacts_are_added_listed_and_removed_per_user() {
        let state = test_state();
        let alice = user_session("alice@example.com");
        let response = add_contact_handler(State(state.clone()), Extension(alice.clone()), contact("Jane Smith"))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let added: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let id = added["id"].as_u64().unwrap();

        let Json(listed) = list_contacts_handler(State(state.clone()), Extension(alice.clone()))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Jane Smith");

        let bob = user_session("bob@example.com");
        let Json(for_bob) = list_contacts_handler(State(state.clone()), Extension(bob.clone()))
            .await
            .unwrap();
        assert!(for_bob.is_empty());
        let err = remove_contact_handler(State(state.clone()), Extension(bob), Path(id))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);

        let status = remove_contact_handler(State(state.clone()), Extension(alice.clone()), Path(id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        let Json(listed) = list_contacts_handler(State(state), Extension(alice)).await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn incomplete_contact_is_unprocessable() {
        let err = add_contact_handler(
            State(test_state()),
            Extension(user_session("alice@example.com")),
            Json(ContactRequest {
                name: "Jane Smith".into(),
                ..Default::default()
            }),
        )
        .await
        .map(|_| ())
        .unwrap_err();
        assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);
        let fields: Vec<_> = err.1 .0.fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, ["relationship", "phone"]);
    }

    #[tokio::test]
    async fn activity_log_is_admin_only() {
        let err = list_activities_handler(
            State(test_state()),
            Extension(user_session("alice@example.com")),
            Query(ActivityQuery::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::FORBIDDEN);
    }
}
