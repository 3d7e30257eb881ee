//! Wire-only request and response shapes.
//!
//! Entity types live in [`crate::domain`]; this module holds the small
//! envelopes that only exist to match the backend's JSON.

use serde::{Deserialize, Serialize};

use crate::domain::{EventId, UserId};

/// `{eventId, userId}` body used by subscribe and confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionBody {
    /// Target event.
    pub event_id: EventId,
    /// Subscribing user.
    pub user_id: UserId,
}

/// `{userId, ...}` envelope for profile updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserScoped<'a, T> {
    /// User the payload applies to.
    pub user_id: UserId,
    /// Payload fields, flattened next to `userId`.
    #[serde(flatten)]
    pub payload: &'a T,
}

/// A user entry in a roster list. The backend sends either bare ids or
/// user objects, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RosterEntry {
    /// Bare user id.
    Id(UserId),
    /// Object carrying at least an `id` or `userId`.
    Object {
        /// The user's id.
        #[serde(alias = "userId")]
        id: UserId,
    },
}

impl RosterEntry {
    /// Returns the user id regardless of shape.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        match self {
            Self::Id(id) | Self::Object { id } => *id,
        }
    }
}
