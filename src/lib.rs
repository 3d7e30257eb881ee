//! # eventhub-client
//!
//! Client core for the EventHub social events platform.
//!
//! Users publish events, ask to join events owned by others, and owners
//! accept or deny those requests. This crate talks to the EventHub REST
//! backend, keeps a local session, and keeps every screen's data fresh:
//! a mutation publishes which resources it changed, and the watchers of
//! exactly those resources refetch.
//!
//! ## Architecture
//!
//! ```text
//! Caller (CLI, UI)
//!     │
//!     ├── PlatformService (service/) ──▶ SessionManager (session/)
//!     │       │                               │ user id channel
//!     │       ├── ApiClient (api/) ──▶ REST backend
//!     │       │                               │
//!     │       └── InvalidationBus (domain/) ──┤
//!     │                                       ▼
//!     └── ResourceWatcher<T> (service/) ── refetch via ApiClient
//! ```
//!
//! The backend is the source of truth. Nothing is cached across runs
//! except the session.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod session;
