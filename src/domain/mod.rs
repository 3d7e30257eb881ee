//! Domain layer: platform entities, the subscription state machine, and
//! the invalidation system.
//!
//! Everything here is plain data plus local rules. The backend remains
//! the source of truth for every entity; these types describe what the
//! client receives and how it reasons about it.

pub mod event;
pub mod event_bus;
pub mod ids;
pub mod rating;
pub mod resource;
pub mod subscription;
pub mod user;

pub use event::{Event, EventFilter, EventUpdate, NewEvent, TemporalState};
pub use event_bus::InvalidationBus;
pub use ids::{EventId, UserId};
pub use rating::{NewRating, Rating, average_score};
pub use resource::{Invalidation, ResourceKey};
pub use subscription::{AcceptOutcome, EventRoster, RosterError, SubscriptionState};
pub use user::{
    AuthResponse, Credentials, ImageRef, ImageUpload, ProfileUpdate, Registration, User,
};
