//! Session tracking on top of an identity provider

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{TimeDelta, Utc};
use log::{debug, info, warn};

use super::{AuthError, IdentityProvider, Session};

/// Change in the set of active sessions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Session),
    SignedOut(Session),
}

/// Handle returned by [`AuthService::observe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// Wraps an identity provider and keeps the active sessions
///
/// Sessions are held in memory and keyed by their bearer token; a restart
/// signs everyone out. Expired sessions are dropped when they are looked up
/// and whenever a new session starts.
pub struct AuthService {
    provider: Box<dyn IdentityProvider>,
    max_session_age: Option<TimeDelta>,
    sessions: RwLock<HashMap<String, Session>>,
    observers: RwLock<Vec<(ObserverId, Observer)>>,
    next_observer: AtomicU64,
}

impl AuthService {
    pub fn new(provider: Box<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            max_session_age: None,
            sessions: RwLock::new(HashMap::new()),
            observers: RwLock::new(Vec::new()),
            next_observer: AtomicU64::new(1),
        }
    }

    /// Expire sessions the provider didn't give a lifetime after `age`
    pub fn with_max_session_age(mut self, age: TimeDelta) -> Self {
        self.max_session_age = Some(age);
        self
    }

    /// Register an account and start a session for it
    pub fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Session, AuthError> {
        let session = self.provider.sign_up(email, password, display_name)?;
        info!("Registered admin account {}", session.email);
        self.start(session)
    }

    /// Sign in and start a session
    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.provider.sign_in(email, password)?;
        self.start(session)
    }

    /// End the session identified by `token`
    pub fn sign_out(&self, token: &str) -> Result<Session, AuthError> {
        let session = self
            .sessions
            .write()
            .unwrap()
            .remove(token)
            .ok_or(AuthError::UnknownSession)?;

        // The local session is gone regardless of what the provider says
        if let Err(e) = self.provider.sign_out(&session) {
            warn!("Identity provider sign-out failed for {}: {}", session.email, e);
        }

        info!("Signed out {}", session.email);
        self.notify(&SessionEvent::SignedOut(session.clone()));
        Ok(session)
    }

    /// The active session for `token`, if any
    pub fn session(&self, token: &str) -> Option<Session> {
        let session = self.sessions.read().unwrap().get(token).cloned()?;
        if !session.is_expired(Utc::now()) {
            return Some(session);
        }

        self.sessions.write().unwrap().remove(token);
        debug!("Session for {} expired", session.email);
        None
    }

    /// Number of active sessions
    pub fn active_sessions(&self) -> usize {
        let now = Utc::now();
        self.sessions
            .read()
            .unwrap()
            .values()
            .filter(|s| !s.is_expired(now))
            .count()
    }

    /// Call `callback` on every sign-in and sign-out until unobserved
    pub fn observe<F>(&self, callback: F) -> ObserverId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        self.observers.write().unwrap().push((id, Arc::new(callback)));
        id
    }

    /// Stop notifying an observer. Returns false if it was not registered.
    pub fn unobserve(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write().unwrap();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    fn start(&self, mut session: Session) -> Result<Session, AuthError> {
        if session.expires_at.is_none()
            && let Some(age) = self.max_session_age
        {
            session.expires_at = session.signed_in_at.checked_add_signed(age);
        }

        let now = Utc::now();
        let mut sessions = self.sessions.write().unwrap();
        sessions.retain(|_, s| !s.is_expired(now));
        sessions.insert(session.token.clone(), session.clone());
        drop(sessions);

        info!("Signed in {}", session.email);
        self.notify(&SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }

    fn notify(&self, event: &SessionEvent) {
        // Clone out so callbacks may call back into the service
        let observers: Vec<Observer> = self
            .observers
            .read()
            .unwrap()
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();

        for observer in observers {
            observer(event);
        }
    }
}
