//! Session lifecycle: begin, restore, refresh, end.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tokio::sync::watch;

use super::{Session, SessionStore};
use crate::domain::UserId;
use crate::error::ClientError;

/// Owns the current [`Session`] and keeps the store and watchers in sync.
///
/// The user id channel returned by [`SessionManager::watch_user`] is the
/// dependency that user-scoped resource watchers wait on: it only holds a
/// value while an unexpired session is active.
#[derive(Debug)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
    session: watch::Sender<Option<Session>>,
    user: watch::Sender<Option<UserId>>,
}

impl SessionManager {
    /// Creates a manager with no active session.
    ///
    /// A `ttl` too large for a calendar duration is capped at ten years.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, ttl: StdDuration) -> Self {
        let ttl = Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(3650));
        Self {
            store,
            ttl,
            session: watch::Sender::new(None),
            user: watch::Sender::new(None),
        }
    }

    /// Loads a persisted session, discarding it if it has expired.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Storage`] if the store cannot be read or
    /// cleared.
    pub fn restore(&self) -> Result<Option<Session>, ClientError> {
        let Some(session) = self.store.load()? else {
            tracing::debug!("no stored session");
            return Ok(None);
        };
        if session.is_expired(Utc::now()) {
            tracing::info!(session_id = %session.id, user_id = %session.user_id, "stored session expired");
            self.store.clear()?;
            self.publish(None);
            return Ok(None);
        }
        tracing::info!(session_id = %session.id, user_id = %session.user_id, "session restored");
        self.publish(Some(session.clone()));
        Ok(Some(session))
    }

    /// Starts a new session for `user_id`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Storage`] if the session cannot be persisted.
    pub fn begin(&self, user_id: UserId) -> Result<Session, ClientError> {
        let session = Session::issue(user_id, Utc::now(), self.ttl);
        self.store.save(&session)?;
        tracing::info!(session_id = %session.id, %user_id, "session started");
        self.publish(Some(session.clone()));
        Ok(session)
    }

    /// Extends the active session by a full lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotAuthenticated`] with no session,
    /// [`ClientError::SessionExpired`] if it already lapsed, or
    /// [`ClientError::Storage`] if persisting fails.
    pub fn refresh(&self) -> Result<Session, ClientError> {
        let session = self.active()?;
        let renewed = session.renewed(Utc::now(), self.ttl);
        self.store.save(&renewed)?;
        tracing::debug!(session_id = %renewed.id, expires_at = %renewed.expires_at, "session refreshed");
        self.publish(Some(renewed.clone()));
        Ok(renewed)
    }

    /// Ends the session and clears the store.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Storage`] if the store cannot be cleared.
    pub fn end(&self) -> Result<(), ClientError> {
        self.store.clear()?;
        if let Some(session) = self.current() {
            tracing::info!(session_id = %session.id, user_id = %session.user_id, "session ended");
        }
        self.publish(None);
        Ok(())
    }

    /// Returns the current session, expired or not.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    /// Returns the user of the active session.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotAuthenticated`] with no session or
    /// [`ClientError::SessionExpired`] if it lapsed. An expired session is
    /// dropped as a side effect.
    pub fn require_user(&self) -> Result<UserId, ClientError> {
        self.active().map(|s| s.user_id)
    }

    /// Channel carrying the active user id, `None` while logged out.
    #[must_use]
    pub fn watch_user(&self) -> watch::Receiver<Option<UserId>> {
        self.user.subscribe()
    }

    /// Channel carrying the full session.
    #[must_use]
    pub fn watch_session(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    fn active(&self) -> Result<Session, ClientError> {
        let session = self.current().ok_or(ClientError::NotAuthenticated)?;
        if session.is_expired(Utc::now()) {
            tracing::info!(session_id = %session.id, "session expired");
            if let Err(e) = self.store.clear() {
                tracing::warn!(error = %e, "failed to clear expired session");
            }
            self.publish(None);
            return Err(ClientError::SessionExpired);
        }
        Ok(session)
    }

    fn publish(&self, session: Option<Session>) {
        let user = session.as_ref().map(|s| s.user_id);
        self.session.send_replace(session);
        self.user.send_if_modified(|current| {
            if *current == user {
                false
            } else {
                *current = user;
                true
            }
        });
    }
}
