//! Resource keys and invalidation notices.
//!
//! Every remote resource a view can observe is named by a [`ResourceKey`].
//! Mutations publish an [`Invalidation`] for each key they affect, and
//! only watchers of that exact key refetch.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{EventId, UserId};

/// Name of an observable remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "resource", content = "id", rename_all = "snake_case")]
pub enum ResourceKey {
    /// The global event list.
    Events,
    /// A single event.
    Event(EventId),
    /// Events owned by a user.
    UserEvents(UserId),
    /// Events a user is subscribed to.
    SubscribedEvents(UserId),
    /// Events a user has requested and is waiting on.
    PendingRequests(UserId),
    /// Confirmed participants of an event.
    EventSubscribers(EventId),
    /// Pending requests on an event, as seen by its owner.
    EventRequests(EventId),
    /// A user profile.
    User(UserId),
    /// Ratings received by a user.
    UserRatings(UserId),
    /// A user's profile picture.
    ProfileImage(UserId),
    /// A user's banner picture.
    BannerImage(UserId),
}

impl ResourceKey {
    /// Returns the resource type as a static string slice.
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::Event(_) => "event",
            Self::UserEvents(_) => "user_events",
            Self::SubscribedEvents(_) => "subscribed_events",
            Self::PendingRequests(_) => "pending_requests",
            Self::EventSubscribers(_) => "event_subscribers",
            Self::EventRequests(_) => "event_requests",
            Self::User(_) => "user",
            Self::UserRatings(_) => "user_ratings",
            Self::ProfileImage(_) => "profile_image",
            Self::BannerImage(_) => "banner_image",
        }
    }
}

/// Notice that a resource changed on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invalidation {
    /// Resource that changed.
    pub key: ResourceKey,
    /// When the change was observed locally.
    pub timestamp: DateTime<Utc>,
}

impl Invalidation {
    /// Creates a notice for `key` stamped with the current time.
    #[must_use]
    pub fn now(key: ResourceKey) -> Self {
        Self {
            key,
            timestamp: Utc::now(),
        }
    }
}
