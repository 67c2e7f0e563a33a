use std::sync::Arc;

use parking_lot::Mutex;
use secrecy::SecretString;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::contract::error::SessionError;
use crate::contract::model::{Credential, Grant, Identity, Role, SessionMode, SessionSnapshot};
use crate::domain::error::IdentityError;
use crate::domain::ports::{CredentialStore, IdentityPort};
use crate::domain::session::Session;

struct ControllerState {
    session: Session,
    /// Bumped whenever the active credential changes or the session is torn down.
    generation: u64,
    /// Generation of the identity-mutating call currently outstanding.
    in_flight: Option<u64>,
}

/// Owns the session state machine and the credential store.
///
/// Construct once per client and share it behind `Arc`. The state lock is
/// never held across an `.await`: network calls run unlocked and their
/// results are committed only if the session generation they started in is
/// still current.
pub struct SessionController {
    state: Mutex<ControllerState>,
    store: Arc<dyn CredentialStore>,
    identity: Arc<dyn IdentityPort>,
    snapshots: watch::Sender<SessionSnapshot>,
}

/// The single identity-mutating slot, released on drop.
struct InFlight<'a> {
    controller: &'a SessionController,
    generation: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.controller.state.lock();
        if state.in_flight == Some(self.generation) {
            state.in_flight = None;
        }
    }
}

fn log_refusal(op: &'static str, err: &SessionError) {
    if err.is_contract_violation() {
        warn!(op, error = %err, "contract violation: call rejected in current mode");
    } else {
        info!(op, error = %err, "call refused");
    }
}

/// Login failures never touch an existing session.
fn login_error(err: IdentityError) -> SessionError {
    match err {
        IdentityError::Unauthorized { message } | IdentityError::Rejected { message, .. } => {
            SessionError::authentication_failed(message)
        }
        other => other.into(),
    }
}

impl SessionController {
    /// Reconcile from the store. Performs no network call.
    pub fn new(store: Arc<dyn CredentialStore>, identity: Arc<dyn IdentityPort>) -> Self {
        let session = Session::from_record(store.load());
        info!(mode = %session.mode(), "session reconciled from credential store");

        let (snapshots, _) = watch::channel(session.snapshot());
        Self {
            state: Mutex::new(ControllerState {
                session,
                generation: 0,
                in_flight: None,
            }),
            store,
            identity,
            snapshots,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().session.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn mode(&self) -> SessionMode {
        self.state.lock().session.mode()
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().in_flight.is_some()
    }

    /// Active credential plus the generation it belongs to, for one outbound request.
    pub fn credential_for_request(&self) -> Option<(Credential, u64)> {
        let state = self.state.lock();
        state
            .session
            .credential()
            .map(|c| (c.clone(), state.generation))
    }

    /// Forced teardown after the backend rejected the credential of `observed_generation`.
    /// Returns false if that session already ended.
    pub fn revoke(&self, observed_generation: u64, reason: &str) -> bool {
        let mut state = self.state.lock();
        if state.generation != observed_generation || state.session == Session::Anonymous {
            debug!(
                observed_generation,
                current = state.generation,
                "ignoring revocation of a session that already ended"
            );
            return false;
        }
        warn!(mode = %state.session.mode(), reason, "credential revoked; tearing down session");
        self.tear_down_locked(&mut state);
        true
    }

    #[instrument(name = "identity_session.controller.logout", skip_all)]
    pub fn logout(&self) {
        let mut state = self.state.lock();
        let from = state.session.mode();
        if self.tear_down_locked(&mut state) {
            info!(%from, "logged out");
        } else {
            debug!("logout without a session");
        }
    }

    #[instrument(
        name = "identity_session.controller.authenticate",
        skip_all,
        fields(email = %email)
    )]
    pub async fn authenticate(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<Identity, SessionError> {
        let (flight, ()) = self.begin("authenticate", |_| Ok(()))?;
        let grant = self
            .identity
            .authenticate(email, secret)
            .await
            .map_err(login_error)?;
        self.establish(&flight, "authenticate", grant)
    }

    #[instrument(
        name = "identity_session.controller.register",
        skip_all,
        fields(email = %email)
    )]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        secret: &SecretString,
    ) -> Result<Identity, SessionError> {
        let (flight, ()) = self.begin("register", |_| Ok(()))?;
        let grant = self
            .identity
            .register(name, email, secret)
            .await
            .map_err(login_error)?;
        self.establish(&flight, "register", grant)
    }

    #[instrument(
        name = "identity_session.controller.impersonate",
        skip_all,
        fields(target_id = %target_id)
    )]
    pub async fn impersonate(&self, target_id: Uuid) -> Result<Identity, SessionError> {
        let (flight, (actor, actor_credential)) =
            self.begin("impersonate", |session| match session {
                Session::Anonymous => Err(SessionError::invalid_state(
                    SessionMode::Anonymous,
                    "impersonation requires an authenticated session",
                )),
                Session::Delegated { .. } => Err(SessionError::forbidden(
                    "already impersonating; nested impersonation is not allowed",
                )),
                Session::Authenticated {
                    identity,
                    credential,
                } => {
                    if identity.role != Role::SuperAdmin {
                        return Err(SessionError::forbidden(
                            "only a SUPER_ADMIN may impersonate",
                        ));
                    }
                    if identity.id == target_id {
                        return Err(SessionError::forbidden("cannot impersonate yourself"));
                    }
                    Ok((identity.id, credential.clone()))
                }
            })?;

        let grant = self
            .identity
            .delegate(&actor_credential, target_id)
            .await
            .map_err(|err| self.credentialed_failure(&flight, "impersonate", err))?;

        if grant.identity.role == Role::SuperAdmin {
            warn!(target_id = %target_id, "backend granted a SUPER_ADMIN identity; refusing delegation");
            return Err(SessionError::forbidden(
                "cannot impersonate another SUPER_ADMIN",
            ));
        }
        if grant.identity.id != target_id {
            warn!(returned = %grant.identity.id, "backend granted a different identity than requested");
            return Err(SessionError::unavailable(
                "identity service returned an unexpected identity",
            ));
        }

        let identity = grant.identity.clone();
        self.commit(&flight, "impersonate", move |_| Session::Delegated {
            identity: grant.identity,
            credential: grant.credential,
            saved: actor_credential,
        })?;

        info!(actor_id = %actor, target_id = %identity.id, "impersonation started");
        Ok(identity)
    }

    #[instrument(name = "identity_session.controller.exit_impersonate", skip_all)]
    pub async fn exit_impersonate(&self) -> Result<Identity, SessionError> {
        let (flight, delegated) = self.begin("exit_impersonate", |session| match session {
            Session::Delegated { credential, .. } => Ok(credential.clone()),
            other => Err(SessionError::invalid_state(
                other.mode(),
                "not impersonating",
            )),
        })?;

        match self.identity.restore(&delegated).await {
            Ok(grant) => {
                let identity = grant.identity.clone();
                self.commit(&flight, "exit_impersonate", move |_| {
                    Session::Authenticated {
                        identity: grant.identity,
                        credential: grant.credential,
                    }
                })?;
                info!(user_id = %identity.id, "impersonation ended");
                Ok(identity)
            }
            Err(err) if err.is_transient() => {
                warn!(error = %err, "restore failed; session stays delegated");
                Err(err.into())
            }
            Err(err) => {
                // The backend could not resolve the linkage: fail closed.
                self.tear_down_for(&flight, "exit_impersonate", err.message());
                Err(match err {
                    IdentityError::Rejected { message, .. } => {
                        SessionError::invalid_state(SessionMode::Delegated, message)
                    }
                    other => other.into(),
                })
            }
        }
    }

    /// Replace the cached identity with the backend's current view of it.
    #[instrument(name = "identity_session.controller.refresh", skip_all)]
    pub async fn refresh(&self) -> Result<Identity, SessionError> {
        let (flight, (mode, current_id, credential)) =
            self.begin("refresh", |session| match session {
                Session::Anonymous => Err(SessionError::invalid_state(
                    SessionMode::Anonymous,
                    "no session to refresh",
                )),
                Session::Authenticated {
                    identity,
                    credential,
                }
                | Session::Delegated {
                    identity,
                    credential,
                    ..
                } => Ok((session.mode(), identity.id, credential.clone())),
            })?;

        let probe = self
            .identity
            .current_identity(&credential)
            .await
            .map_err(|err| self.credentialed_failure(&flight, "refresh", err))?;

        let delegated = mode == SessionMode::Delegated;
        if probe.is_impersonating != delegated || probe.identity.id != current_id {
            let reason = "backend identity disagrees with the local session";
            self.tear_down_for(&flight, "refresh", reason);
            return Err(SessionError::invalid_state(mode, reason));
        }

        let identity = probe.identity.clone();
        self.commit(&flight, "refresh", move |session| {
            session.with_identity(probe.identity)
        })?;
        debug!(user_id = %identity.id, "identity refreshed");
        Ok(identity)
    }

    // -------- internals --------

    fn begin<T>(
        &self,
        op: &'static str,
        check: impl FnOnce(&Session) -> Result<T, SessionError>,
    ) -> Result<(InFlight<'_>, T), SessionError> {
        let mut state = self.state.lock();
        let checked = if state.in_flight.is_some() {
            Err(SessionError::Busy)
        } else {
            check(&state.session)
        };

        match checked {
            Ok(value) => {
                state.in_flight = Some(state.generation);
                let flight = InFlight {
                    controller: self,
                    generation: state.generation,
                };
                Ok((flight, value))
            }
            Err(err) => {
                log_refusal(op, &err);
                Err(err)
            }
        }
    }

    fn establish(
        &self,
        flight: &InFlight<'_>,
        op: &'static str,
        grant: Grant,
    ) -> Result<Identity, SessionError> {
        let identity = grant.identity.clone();
        self.commit(flight, op, move |_| Session::Authenticated {
            identity: grant.identity,
            credential: grant.credential,
        })?;
        info!(user_id = %identity.id, role = %identity.role, "session established");
        Ok(identity)
    }

    /// Apply a confirmed transition: store first, then memory, then subscribers.
    fn commit(
        &self,
        flight: &InFlight<'_>,
        op: &'static str,
        next: impl FnOnce(Session) -> Session,
    ) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        if state.generation != flight.generation {
            warn!(
                op,
                started = flight.generation,
                current = state.generation,
                "discarding result of a call that outlived its session"
            );
            return Err(SessionError::invalid_state(
                state.session.mode(),
                "the session ended while the call was in flight",
            ));
        }

        let previous = std::mem::take(&mut state.session);
        let replaced = previous.credential().cloned();
        let next = next(previous);
        if next.credential() != replaced.as_ref() {
            // Requests still carrying the replaced credential must not revoke this one.
            state.generation += 1;
        }
        self.persist(&next);
        state.session = next;
        self.publish(&state.session);
        Ok(())
    }

    /// Map a failure of a call that presented the active credential.
    fn credentialed_failure(
        &self,
        flight: &InFlight<'_>,
        op: &'static str,
        err: IdentityError,
    ) -> SessionError {
        if let IdentityError::Unauthorized { message } = &err {
            self.tear_down_for(flight, op, message);
        } else {
            info!(op, error = %err, "identity service refused the call");
        }
        err.into()
    }

    /// Tear down the session `flight` started in, unless it already ended.
    fn tear_down_for(&self, flight: &InFlight<'_>, op: &'static str, reason: &str) {
        let mut state = self.state.lock();
        if state.generation == flight.generation {
            warn!(op, reason, "failing closed to anonymous");
            self.tear_down_locked(&mut state);
        }
    }

    /// Returns whether there was anything to tear down.
    fn tear_down_locked(&self, state: &mut ControllerState) -> bool {
        if let Err(e) = self.store.clear() {
            error!(error = %e, "failed to clear credential store");
        }

        let changed = state.session != Session::Anonymous || state.in_flight.is_some();
        if changed {
            state.generation += 1;
        }
        state.session = Session::Anonymous;
        state.in_flight = None;
        self.publish(&state.session);
        changed
    }

    fn persist(&self, session: &Session) {
        let written = match session.to_record() {
            Some(record) => self.store.write(&record),
            None => self.store.clear(),
        };
        if let Err(e) = written {
            // A stale record on disk would resurrect the wrong session on restart.
            error!(error = %e, "failed to persist session; clearing stored record");
            if let Err(e) = self.store.clear() {
                error!(error = %e, "failed to clear credential store");
            }
        }
    }

    fn publish(&self, session: &Session) {
        let next = session.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
