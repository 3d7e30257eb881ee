//! Service layer: session-aware orchestration on top of the API client.
//!
//! [`PlatformService`] performs mutations and publishes invalidations
//! through the [`crate::domain::InvalidationBus`]. [`ResourceWatcher`]s
//! listen on that bus and keep their resource fresh.

pub mod platform;
pub mod resource;

pub use platform::PlatformService;
pub use resource::{ResourceSnapshot, ResourceState, ResourceWatcher};
