pub mod activity;
pub mod adapters;
pub mod contacts;
pub mod domain;
pub mod error;
pub mod ports;
pub mod repository;
pub mod session;
pub mod snapshot;

mod records;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use activity::ActivityLog;
pub use adapters::{roll_back, MemoryBlobStore, ScopedBlobStore, SystemClock};
pub use contacts::ContactBook;
pub use domain::{
    ActivityEntry, ActivityInput, ActivityType, Appointment, AppointmentFilter, AppointmentId,
    AppointmentInput, AppointmentStatus, ConsultationMode, ContactId, ContactInput, Credentials,
    EmergencyContact, Identity, PatientDetails, Role, Session,
};
pub use error::{CoreError, CoreResult, FieldError, FieldProblem, ValidationErrors};
pub use ports::{AuthError, BlobStore, Clock, IdentityVerifier, PortError, PortResult};
pub use repository::AppointmentRepository;
pub use session::SessionStore;
pub use snapshot::Snapshot;
