//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-client session stores.

use crate::adapters::AccountVerifier;
use crate::config::Config;
use appointment_core::{
    ActivityLog, AppointmentRepository, BlobStore, Clock, ContactBook, CoreResult,
    IdentityVerifier, ScopedBlobStore, SessionStore,
};
use std::sync::Arc;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BlobStore>,
    pub clock: Arc<dyn Clock>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub accounts: Arc<AccountVerifier>,
    pub appointments: Arc<AppointmentRepository>,
    pub activity: Arc<ActivityLog>,
    pub contacts: Arc<ContactBook>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the core services over one shared blob store.
    ///
    /// `verifier` checks sign-ins; in production it is `accounts` itself.
    pub fn new(
        store: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        verifier: Arc<dyn IdentityVerifier>,
        accounts: Arc<AccountVerifier>,
        config: Arc<Config>,
    ) -> Self {
        let activity = Arc::new(ActivityLog::new(store.clone(), clock.clone()));
        let appointments = Arc::new(AppointmentRepository::new(
            store.clone(),
            clock.clone(),
            activity.clone(),
        ));
        let contacts = Arc::new(ContactBook::new(store.clone(), clock.clone()));
        Self {
            store,
            clock,
            verifier,
            accounts,
            appointments,
            activity,
            contacts,
            config,
        }
    }

    //=====================================================================================
    // SessionStore (Specific to One Client)
    //=====================================================================================

    /// Opens the session store of the client holding `token`.
    ///
    /// Every client gets its own namespace of the blob store, the way every
    /// browser had its own local storage.
    pub async fn session_store(&self, token: Uuid) -> CoreResult<SessionStore> {
        let scoped = ScopedBlobStore::new(self.store.clone(), format!("sessions/{}", token));
        SessionStore::open(Arc::new(scoped), self.verifier.clone(), self.clock.clone()).await
    }

    /// Signs out whoever holds `token`. A token with no session is a no-op.
    pub async fn end_session(&self, token: Uuid) -> CoreResult<()> {
        self.session_store(token).await?.sign_out().await
    }
}
