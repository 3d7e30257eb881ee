//! Session layer: the client's notion of "who is logged in".
//!
//! A [`Session`] ties a backend [`UserId`] to a local expiry. It is
//! persisted through a [`SessionStore`] so that a restarted client can
//! resume, and published through a `watch` channel so that user-scoped
//! resource watchers start and stop with it.

pub mod manager;
pub mod store;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::UserId;

pub use manager::SessionManager;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};

/// An authenticated user session with an explicit expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Local identifier of this session, used for log correlation.
    pub id: Uuid,
    /// Backend user the session belongs to.
    pub user_id: UserId,
    /// When the session was created or last refreshed.
    pub issued_at: DateTime<Utc>,
    /// When the session stops being usable.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session for `user_id` that lives for `ttl` from `now`.
    #[must_use]
    pub fn issue(user_id: UserId, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            issued_at: now,
            expires_at: now + ttl,
        }
    }

    /// Returns `true` once `now` has reached the expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry; zero once expired.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }

    /// Returns a copy with the same id and user, re-issued at `now`.
    #[must_use]
    pub fn renewed(&self, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            issued_at: now,
            expires_at: now + ttl,
            ..self.clone()
        }
    }
}
