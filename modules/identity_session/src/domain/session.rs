use crate::contract::model::{Credential, Identity, SessionMode, SessionSnapshot};
use crate::domain::ports::PersistedSession;

/// In-memory session state. A suspended credential exists only in `Delegated`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated {
        identity: Identity,
        credential: Credential,
    },
    Delegated {
        identity: Identity,
        credential: Credential,
        saved: Credential,
    },
}

impl Session {
    pub fn mode(&self) -> SessionMode {
        match self {
            Session::Anonymous => SessionMode::Anonymous,
            Session::Authenticated { .. } => SessionMode::Authenticated,
            Session::Delegated { .. } => SessionMode::Delegated,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Session::Anonymous => None,
            Session::Authenticated { identity, .. } | Session::Delegated { identity, .. } => {
                Some(identity)
            }
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        match self {
            Session::Anonymous => None,
            Session::Authenticated { credential, .. } | Session::Delegated { credential, .. } => {
                Some(credential)
            }
        }
    }

    /// The delegation marker.
    pub fn saved_credential(&self) -> Option<&Credential> {
        match self {
            Session::Delegated { saved, .. } => Some(saved),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.mode(),
            identity: self.identity().cloned(),
        }
    }

    /// Same mode and credentials, refreshed identity.
    pub fn with_identity(self, identity: Identity) -> Self {
        match self {
            Session::Anonymous => Session::Anonymous,
            Session::Authenticated { credential, .. } => Session::Authenticated {
                identity,
                credential,
            },
            Session::Delegated {
                credential, saved, ..
            } => Session::Delegated {
                identity,
                credential,
                saved,
            },
        }
    }

    /// Reconcile from a persisted record; Delegated iff a marker was stored.
    pub fn from_record(record: Option<PersistedSession>) -> Self {
        match record {
            None => Session::Anonymous,
            Some(PersistedSession {
                credential,
                identity,
                original_credential: None,
            }) => Session::Authenticated {
                identity,
                credential,
            },
            Some(PersistedSession {
                credential,
                identity,
                original_credential: Some(saved),
            }) => Session::Delegated {
                identity,
                credential,
                saved,
            },
        }
    }

    pub fn to_record(&self) -> Option<PersistedSession> {
        match self {
            Session::Anonymous => None,
            Session::Authenticated {
                identity,
                credential,
            } => Some(PersistedSession {
                credential: credential.clone(),
                identity: identity.clone(),
                original_credential: None,
            }),
            Session::Delegated {
                identity,
                credential,
                saved,
            } => Some(PersistedSession {
                credential: credential.clone(),
                identity: identity.clone(),
                original_credential: Some(saved.clone()),
            }),
        }
    }
}
