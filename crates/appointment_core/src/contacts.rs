//! crates/appointment_core/src/contacts.rs
//!
//! Each patient's emergency contacts, kept under `emergencyContacts/<owner>`.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::adapters::next_id;
use crate::domain::{ContactId, ContactInput, EmergencyContact};
use crate::error::{CoreError, CoreResult, ValidationErrors};
use crate::ports::{keys, BlobStore, Clock, PortResult};
use crate::records::{self, ContactRecord};
use crate::snapshot::Snapshot;

pub struct ContactBook {
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl ContactBook {
    pub fn new(store: Arc<dyn BlobStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Adds a contact for `owner`. Name, relationship and phone are all required.
    pub async fn add(&self, owner: &str, input: ContactInput) -> CoreResult<EmergencyContact> {
        let mut errors = ValidationErrors::default();
        let name = required(&mut errors, "name", &input.name);
        let relationship = required(&mut errors, "relationship", &input.relationship);
        let phone = required(&mut errors, "phone", &input.phone);
        let (Some(name), Some(relationship), Some(phone)) = (name, relationship, phone) else {
            return Err(CoreError::Validation(errors));
        };

        let _guard = self.write_lock.lock().await;
        let key = key_for(owner);
        let mut contacts = self.load(&key).await?;
        let contact = EmergencyContact {
            id: next_id(self.clock.now(), contacts.iter().map(|c| c.id).max()),
            name,
            relationship,
            phone,
        };
        contacts.push(contact.clone());
        self.persist(&key, &contacts).await?;

        info!(owner, id = contact.id, "Emergency contact added");
        Ok(contact)
    }

    /// `owner`'s contacts in the order they were added.
    pub async fn list(&self, owner: &str) -> CoreResult<Snapshot<EmergencyContact>> {
        Ok(Snapshot::new(self.load(&key_for(owner)).await?))
    }

    /// Removes one of `owner`'s contacts and returns it.
    pub async fn remove(&self, owner: &str, id: ContactId) -> CoreResult<EmergencyContact> {
        let _guard = self.write_lock.lock().await;
        let key = key_for(owner);
        let mut contacts = self.load(&key).await?;
        let index = contacts
            .iter()
            .position(|c| c.id == id)
            .ok_or(CoreError::ContactNotFound(id))?;
        let removed = contacts.remove(index);
        self.persist(&key, &contacts).await?;

        info!(owner, id, "Emergency contact removed");
        Ok(removed)
    }

    async fn load(&self, key: &str) -> PortResult<Vec<EmergencyContact>> {
        let records: Vec<ContactRecord> = records::load_list(self.store.as_ref(), key).await?;
        Ok(records.into_iter().map(ContactRecord::to_domain).collect())
    }

    async fn persist(&self, key: &str, contacts: &[EmergencyContact]) -> PortResult<()> {
        let records: Vec<ContactRecord> = contacts.iter().map(ContactRecord::from_domain).collect();
        let bytes = records::encode(key, &records)?;
        self.store
            .set(key, bytes)
            .await
            .inspect_err(|e| error!(error = %e, key, "Failed to persist emergency contacts"))
    }
}

fn key_for(owner: &str) -> String {
    format!("{}/{}", keys::EMERGENCY_CONTACTS, owner)
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
