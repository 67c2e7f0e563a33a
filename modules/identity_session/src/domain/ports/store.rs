use serde::{Deserialize, Serialize};

use crate::contract::model::{Credential, Identity};
use crate::domain::error::StoreError;

/// Persisted layout: `{credential, identity, originalCredential?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub credential: Credential,
    pub identity: Identity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_credential: Option<Credential>,
}

impl PersistedSession {
    /// Structural check applied on load; an invalid record is treated as absent.
    pub fn is_valid(&self) -> bool {
        if self.credential.is_blank() || self.identity.id.is_nil() {
            return false;
        }
        match &self.original_credential {
            Some(original) => !original.is_blank() && original != &self.credential,
            None => true,
        }
    }
}

/// Durable local persistence of the session. Synchronous.
///
/// `load` never fails: missing, partial or corrupt records read as `None`.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Option<PersistedSession>;

    /// Replace the whole record in one step.
    fn write(&self, record: &PersistedSession) -> Result<(), StoreError>;

    fn clear(&self) -> Result<(), StoreError>;

    /// Store the active credential and identity, keeping any suspended credential.
    fn save(&self, credential: &Credential, identity: &Identity) -> Result<(), StoreError> {
        let original_credential = self
            .load()
            .and_then(|r| r.original_credential)
            .filter(|original| original != credential);
        self.write(&PersistedSession {
            credential: credential.clone(),
            identity: identity.clone(),
            original_credential,
        })
    }

    /// Suspend `credential` next to the already-saved active one.
    fn save_original(&self, credential: &Credential) -> Result<(), StoreError> {
        let mut record = self.load().ok_or(StoreError::NothingToSuspend)?;
        if record.original_credential.is_some() {
            return Err(StoreError::AlreadySuspended);
        }
        if &record.credential == credential {
            return Err(StoreError::SelfReference);
        }
        record.original_credential = Some(credential.clone());
        self.write(&record)
    }
}
