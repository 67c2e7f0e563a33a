#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Notify;
use uuid::Uuid;

use identity_session::contract::model::{
    AccountStatus, AuditAction, AuditRecord, Credential, Grant, Identity, IdentityProbe,
    PlanAttributes, Role,
};
use identity_session::domain::controller::SessionController;
use identity_session::domain::error::IdentityError;
use identity_session::domain::ports::IdentityPort;
use identity_session::infra::store::InMemoryCredentialStore;

pub const PASSWORD: &str = "correct horse";

struct Account {
    identity: Identity,
    password: String,
}

struct Token {
    user_id: Uuid,
    /// Token of the administrator this one was minted for, if delegated.
    original: Option<String>,
}

/// In-process identity backend: accounts, minted tokens with server-side
/// delegation linkage, and an audit trail.
#[derive(Default)]
pub struct FakeIdentityService {
    accounts: Mutex<HashMap<Uuid, Account>>,
    tokens: Mutex<HashMap<String, Token>>,
    audit: Mutex<Vec<AuditRecord>>,
    fail_next: Mutex<Option<IdentityError>>,
    calls: AtomicUsize,
    minted: AtomicUsize,
    paused: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl FakeIdentityService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_user(&self, name: &str, role: Role) -> Identity {
        let identity = identity(name, role);
        self.accounts.lock().insert(
            identity.id,
            Account {
                identity: identity.clone(),
                password: PASSWORD.to_string(),
            },
        );
        identity
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn audit(&self) -> Vec<AuditRecord> {
        self.audit.lock().clone()
    }

    /// The next call fails with `err` instead of running.
    pub fn fail_next(&self, err: IdentityError) {
        *self.fail_next.lock() = Some(err);
    }

    pub fn revoke(&self, credential: &Credential) {
        self.tokens.lock().remove(credential.expose());
    }

    /// Hold every subsequent call until `release` is called.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Wait until a paused call has reached the backend.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.release.notify_one();
    }

    async fn enter(&self) -> Result<(), IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.paused.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        match self.fail_next.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn mint(&self, user_id: Uuid, original: Option<String>) -> Credential {
        let n = self.minted.fetch_add(1, Ordering::SeqCst);
        let token = format!("tok-{n}-{user_id}");
        self.tokens
            .lock()
            .insert(token.clone(), Token { user_id, original });
        Credential::new(token)
    }

    fn resolve(&self, credential: &Credential) -> Result<(Identity, Option<String>), IdentityError> {
        let tokens = self.tokens.lock();
        let token = tokens
            .get(credential.expose())
            .ok_or_else(|| IdentityError::unauthorized("Invalid token"))?;
        let accounts = self.accounts.lock();
        let account = accounts
            .get(&token.user_id)
            .ok_or_else(|| IdentityError::unauthorized("User not found"))?;
        if account.identity.status == AccountStatus::Blocked {
            return Err(IdentityError::forbidden("Account is blocked"));
        }
        Ok((account.identity.clone(), token.original.clone()))
    }
}

#[async_trait]
impl IdentityPort for FakeIdentityService {
    async fn authenticate(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<Grant, IdentityError> {
        self.enter().await?;
        let identity = {
            let accounts = self.accounts.lock();
            let account = accounts
                .values()
                .find(|a| a.identity.email == email && a.password == secret.expose_secret())
                .ok_or_else(|| IdentityError::unauthorized("Invalid email or password"))?;
            account.identity.clone()
        };
        let credential = self.mint(identity.id, None);
        Ok(Grant {
            credential,
            identity,
        })
    }

    async fn register(
        &self,
        name: &str,
        email: &str,
        secret: &SecretString,
    ) -> Result<Grant, IdentityError> {
        self.enter().await?;
        let mut identity = identity(name, Role::User);
        identity.email = email.to_string();
        {
            let mut accounts = self.accounts.lock();
            if accounts.values().any(|a| a.identity.email == email) {
                return Err(IdentityError::rejected(400, "Email already registered"));
            }
            accounts.insert(
                identity.id,
                Account {
                    identity: identity.clone(),
                    password: secret.expose_secret().to_string(),
                },
            );
        }
        let credential = self.mint(identity.id, None);
        Ok(Grant {
            credential,
            identity,
        })
    }

    async fn delegate(&self, actor: &Credential, target: Uuid) -> Result<Grant, IdentityError> {
        self.enter().await?;
        let (admin, _) = self.resolve(actor)?;
        if admin.role != Role::SuperAdmin {
            return Err(IdentityError::forbidden("Super admin access required"));
        }
        let target = self
            .accounts
            .lock()
            .get(&target)
            .map(|a| a.identity.clone())
            .ok_or_else(|| IdentityError::not_found("User not found"))?;
        if target.role == Role::SuperAdmin {
            return Err(IdentityError::rejected(
                400,
                "Cannot impersonate another super admin",
            ));
        }

        self.audit.lock().push(AuditRecord {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            actor_id: admin.id,
            actor_email: admin.email.clone(),
            action: AuditAction::Impersonate,
            target_id: Some(target.id),
            target_email: Some(target.email.clone()),
            details: serde_json::json!({ "target_name": target.display_name }),
        });

        let credential = self.mint(target.id, Some(actor.expose().to_string()));
        Ok(Grant {
            credential,
            identity: target,
        })
    }

    async fn restore(&self, delegated: &Credential) -> Result<Grant, IdentityError> {
        self.enter().await?;
        let (_, original) = self.resolve(delegated)?;
        let original = Credential::new(
            original.ok_or_else(|| IdentityError::rejected(400, "Not currently impersonating"))?,
        );
        let (admin, _) = self.resolve(&original)?;
        Ok(Grant {
            credential: original,
            identity: admin,
        })
    }

    async fn current_identity(
        &self,
        credential: &Credential,
    ) -> Result<IdentityProbe, IdentityError> {
        self.enter().await?;
        let (identity, original) = self.resolve(credential)?;
        Ok(IdentityProbe {
            identity,
            is_impersonating: original.is_some(),
        })
    }
}

pub fn identity(name: &str, role: Role) -> Identity {
    Identity {
        id: Uuid::new_v4(),
        display_name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        role,
        status: AccountStatus::Active,
        plan: PlanAttributes::default(),
        created_at: Some(Utc::now()),
    }
}

pub fn password() -> SecretString {
    SecretString::from(PASSWORD.to_string())
}

pub struct Harness {
    pub backend: Arc<FakeIdentityService>,
    pub store: Arc<InMemoryCredentialStore>,
    pub controller: Arc<SessionController>,
    pub alice: Identity,
    pub bob: Identity,
    pub carol: Identity,
    pub dave: Identity,
}

/// Alice and Dave are SUPER_ADMIN, Carol is ADMIN, Bob is USER.
pub fn harness() -> Harness {
    let backend = FakeIdentityService::new();
    let alice = backend.add_user("Alice", Role::SuperAdmin);
    let bob = backend.add_user("Bob", Role::User);
    let carol = backend.add_user("Carol", Role::Admin);
    let dave = backend.add_user("Dave", Role::SuperAdmin);
    let store = Arc::new(InMemoryCredentialStore::new());
    let controller = Arc::new(SessionController::new(store.clone(), backend.clone()));
    Harness {
        backend,
        store,
        controller,
        alice,
        bob,
        carol,
        dave,
    }
}

impl Harness {
    pub async fn login(&self, who: &Identity) {
        self.controller
            .authenticate(&who.email, &password())
            .await
            .expect("login");
    }

    pub fn credential(&self) -> Option<Credential> {
        self.controller.credential_for_request().map(|(c, _)| c)
    }
}
