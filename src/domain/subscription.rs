//! Subscription state machine for a single event.
//!
//! ```text
//!  Unsubscribed ──request──▶ Requested ──accept──▶ Subscribed
//!       ▲                        │                     │
//!       │                      deny              unsubscribe / remove
//!       │                        ▼                     │
//!       └──────request─────── Denied ◀                 │
//!       ◀──────────────────────────────────────────────┘
//! ```
//!
//! The backend is authoritative. [`EventRoster`] mirrors its lists so the
//! client can reason about a user's state, and serves as the reference
//! model for the in-process test backend.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{EventId, UserId};

/// Where a user stands with respect to one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    /// No relation to the event.
    Unsubscribed,
    /// Waiting for the owner to accept or deny.
    Requested,
    /// Confirmed participant.
    Subscribed,
    /// Request refused by the owner.
    Denied,
}

/// Result of a successful [`EventRoster::accept`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// The user moved from pending to subscribed.
    Accepted,
    /// The user was already subscribed; nothing changed.
    AlreadySubscribed,
}

/// Invalid subscription transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    /// The user already has a pending request.
    #[error("user {0} already requested this event")]
    AlreadyRequested(UserId),
    /// The user is already a participant.
    #[error("user {0} is already subscribed")]
    AlreadySubscribed(UserId),
    /// Accept or deny for a user with no pending request.
    #[error("user {0} has no pending request")]
    NotPending(UserId),
    /// Unsubscribe or removal of a user who is not subscribed.
    #[error("user {0} is not subscribed")]
    NotSubscribed(UserId),
    /// Accepting would exceed the event capacity.
    #[error("event {event_id} is full ({max_participants} participants)")]
    EventFull {
        /// Event that is full.
        event_id: EventId,
        /// Its capacity.
        max_participants: u32,
    },
}

/// Pending, subscribed and denied users of one event.
///
/// Invariant: a user id appears in at most one of the three sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRoster {
    event_id: EventId,
    max_participants: u32,
    pending: BTreeSet<UserId>,
    subscribed: BTreeSet<UserId>,
    denied: BTreeSet<UserId>,
}

impl EventRoster {
    /// Creates an empty roster for an event with the given capacity.
    #[must_use]
    pub fn new(event_id: EventId, max_participants: u32) -> Self {
        Self {
            event_id,
            max_participants,
            pending: BTreeSet::new(),
            subscribed: BTreeSet::new(),
            denied: BTreeSet::new(),
        }
    }

    /// Builds a roster from the lists reported by the backend.
    ///
    /// A user reported in both lists is treated as subscribed.
    #[must_use]
    pub fn from_lists(
        event_id: EventId,
        max_participants: u32,
        pending: impl IntoIterator<Item = UserId>,
        subscribed: impl IntoIterator<Item = UserId>,
    ) -> Self {
        let subscribed: BTreeSet<UserId> = subscribed.into_iter().collect();
        let pending = pending
            .into_iter()
            .filter(|user| !subscribed.contains(user))
            .collect();
        Self {
            event_id,
            max_participants,
            pending,
            subscribed,
            denied: BTreeSet::new(),
        }
    }

    /// Event this roster belongs to.
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Capacity of the event.
    #[must_use]
    pub const fn max_participants(&self) -> u32 {
        self.max_participants
    }

    /// Returns the state of `user` for this event.
    #[must_use]
    pub fn state_of(&self, user: UserId) -> SubscriptionState {
        if self.subscribed.contains(&user) {
            SubscriptionState::Subscribed
        } else if self.pending.contains(&user) {
            SubscriptionState::Requested
        } else if self.denied.contains(&user) {
            SubscriptionState::Denied
        } else {
            SubscriptionState::Unsubscribed
        }
    }

    /// Records a subscription request.
    ///
    /// A previously denied user may ask again.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::AlreadyRequested`] or
    /// [`RosterError::AlreadySubscribed`] when the user is not eligible.
    pub fn request(&mut self, user: UserId) -> Result<(), RosterError> {
        match self.state_of(user) {
            SubscriptionState::Requested => Err(RosterError::AlreadyRequested(user)),
            SubscriptionState::Subscribed => Err(RosterError::AlreadySubscribed(user)),
            SubscriptionState::Unsubscribed | SubscriptionState::Denied => {
                self.denied.remove(&user);
                self.pending.insert(user);
                Ok(())
            }
        }
    }

    /// Accepts a pending request. Accepting twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NotPending`] if the user never requested, or
    /// [`RosterError::EventFull`] when no spot is left.
    pub fn accept(&mut self, user: UserId) -> Result<AcceptOutcome, RosterError> {
        match self.state_of(user) {
            SubscriptionState::Subscribed => Ok(AcceptOutcome::AlreadySubscribed),
            SubscriptionState::Requested => {
                if self.current_participants() >= self.max_participants {
                    return Err(RosterError::EventFull {
                        event_id: self.event_id,
                        max_participants: self.max_participants,
                    });
                }
                self.pending.remove(&user);
                self.subscribed.insert(user);
                Ok(AcceptOutcome::Accepted)
            }
            SubscriptionState::Unsubscribed | SubscriptionState::Denied => {
                Err(RosterError::NotPending(user))
            }
        }
    }

    /// Denies a pending request.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NotPending`] if the user has no pending request.
    pub fn deny(&mut self, user: UserId) -> Result<(), RosterError> {
        if !self.pending.remove(&user) {
            return Err(RosterError::NotPending(user));
        }
        self.denied.insert(user);
        Ok(())
    }

    /// The user leaves the event.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NotSubscribed`] if the user is not subscribed.
    pub fn unsubscribe(&mut self, user: UserId) -> Result<(), RosterError> {
        if !self.subscribed.remove(&user) {
            return Err(RosterError::NotSubscribed(user));
        }
        Ok(())
    }

    /// The owner removes a participant. Same transition as
    /// [`EventRoster::unsubscribe`].
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NotSubscribed`] if the user is not subscribed.
    pub fn remove(&mut self, user: UserId) -> Result<(), RosterError> {
        self.unsubscribe(user)
    }

    /// Users waiting for a decision, in id order.
    pub fn pending(&self) -> impl Iterator<Item = UserId> + '_ {
        self.pending.iter().copied()
    }

    /// Confirmed participants, in id order.
    pub fn subscribed(&self) -> impl Iterator<Item = UserId> + '_ {
        self.subscribed.iter().copied()
    }

    /// Number of confirmed participants.
    #[must_use]
    pub fn current_participants(&self) -> u32 {
        u32::try_from(self.subscribed.len()).unwrap_or(u32::MAX)
    }
}
