//! crates/appointment_core/src/session.rs
//!
//! Holds the signed-in identity of one client under the `user` key.

use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

use crate::domain::{Credentials, Session};
use crate::error::{CoreError, CoreResult};
use crate::ports::{keys, BlobStore, Clock, IdentityVerifier, PortError};
use crate::records::{self, SessionRecord};

pub struct SessionStore {
    store: Arc<dyn BlobStore>,
    verifier: Arc<dyn IdentityVerifier>,
    clock: Arc<dyn Clock>,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    /// Builds the store and restores any session persisted by an earlier run.
    pub async fn open(
        store: Arc<dyn BlobStore>,
        verifier: Arc<dyn IdentityVerifier>,
        clock: Arc<dyn Clock>,
    ) -> CoreResult<Self> {
        let persisted = match records::load::<SessionRecord>(store.as_ref(), keys::SESSION).await? {
            Some(record) => Some(record.to_domain(keys::SESSION)?),
            None => None,
        };
        Ok(Self {
            store,
            verifier,
            clock,
            current: RwLock::new(persisted),
        })
    }

    /// Verifies `credentials` and makes the resulting identity current.
    ///
    /// A rejected sign-in returns `CoreError::Authentication` and leaves the
    /// previous state exactly as it was. Retrying is the caller's business.
    pub async fn sign_in(&self, credentials: &Credentials) -> CoreResult<Session> {
        let identity = self.verifier.verify(credentials).await.map_err(|e| {
            warn!(username = %credentials.username, error = %e, "Sign-in rejected");
            CoreError::Authentication(e)
        })?;

        let session = Session::from_identity(identity, self.clock.now());
        let bytes = records::encode(keys::SESSION, &SessionRecord::from_domain(&session))?;
        self.store.set(keys::SESSION, bytes).await?;
        *self.current.write().map_err(|_| poisoned())? = Some(session.clone());

        info!(user_id = %session.user_id, role = %session.role, "Signed in");
        Ok(session)
    }

    /// The signed-in session, if any. A lock poisoned by a panicking writer
    /// still holds the last value that was fully stored, so it is read through.
    pub fn current_session(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Clears the session. Signing out with nobody signed in is a no-op.
    pub async fn sign_out(&self) -> CoreResult<()> {
        self.store.remove(keys::SESSION).await?;
        let previous = self.current.write().map_err(|_| poisoned())?.take();
        if let Some(session) = previous {
            info!(user_id = %session.user_id, "Signed out");
        }
        Ok(())
    }
}

fn poisoned() -> PortError {
    PortError::Unexpected("session lock poisoned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryBlobStore;
    use crate::domain::Role;
    use crate::testing::{FailingBlobStore, FakeVerifier, FixedClock};

    async fn open_with(store: Arc<dyn BlobStore>) -> SessionStore {
        let verifier = Arc::new(FakeVerifier::new().with_admin("admin"));
        SessionStore::open(store, verifier, Arc::new(FixedClock::default()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn sign_in_persists_and_survives_reopen() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        let sessions = open_with(store.clone()).await;
        assert!(sessions.current_session().is_none());

        let session = sessions
            .sign_in(&Credentials::new("alice@example.com", "secret"))
            .await
            .unwrap();
        assert_eq!(session.role, Role::User);
        assert_eq!(sessions.current_session(), Some(session.clone()));

        let reopened = open_with(store).await;
        assert_eq!(reopened.current_session(), Some(session));
    }

    #[tokio::test]
    async fn poisoned_lock_does_not_read_as_signed_out() {
        let sessions = open_with(Arc::new(MemoryBlobStore::new())).await;
        let session = sessions
            .sign_in(&Credentials::new("alice@example.com", "secret"))
            .await
            .unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = sessions.current.write().unwrap();
            panic!("writer died holding the lock");
        }));
        assert!(result.is_err());
        assert!(sessions.current.is_poisoned());
        assert_eq!(sessions.current_session(), Some(session));
    }

    #[tokio::test]
    async fn rejected_credentials_never_create_a_session() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        let sessions = open_with(store.clone()).await;

        let err = sessions
            .sign_in(&Credentials::new("alice@example.com", FakeVerifier::REJECTED_PASSWORD))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Authentication(_)));
        assert!(sessions.current_session().is_none());
        assert_eq!(store.get(keys::SESSION).await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_sign_in_keeps_the_previous_session() {
        let sessions = open_with(Arc::new(MemoryBlobStore::new())).await;
        let admin = sessions.sign_in(&Credentials::new("admin", "pw")).await.unwrap();
        assert!(admin.is_admin());

        assert!(sessions.sign_in(&Credentials::new("mallory", "wrong")).await.is_err());
        assert_eq!(sessions.current_session(), Some(admin));
    }

    #[tokio::test]
    async fn sign_out_is_idempotent() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        let sessions = open_with(store.clone()).await;
        sessions.sign_out().await.unwrap();

        sessions.sign_in(&Credentials::new("bob", "pw")).await.unwrap();
        sessions.sign_out().await.unwrap();
        sessions.sign_out().await.unwrap();

        assert!(sessions.current_session().is_none());
        assert!(open_with(store).await.current_session().is_none());
    }

    #[tokio::test]
    async fn storage_failure_on_sign_in_leaves_no_session() {
        let store = Arc::new(FailingBlobStore::new(MemoryBlobStore::new()));
        store.fail_writes_to(keys::SESSION);
        let sessions = open_with(store.clone()).await;

        let err = sessions.sign_in(&Credentials::new("bob", "pw")).await.unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
        assert!(sessions.current_session().is_none());
    }
}
