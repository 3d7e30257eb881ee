//! Events: the wire model, creation and edit payloads, and derived state.
//!
//! An [`Event`] is owned and mutated by the backend. Its temporal state
//! ([`TemporalState`]) is derived locally from the scheduled start and is
//! never sent back.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::{EventId, UserId};
use crate::error::ClientError;

/// An event as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Backend identifier.
    pub id: EventId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Scheduled day.
    pub date: NaiveDate,
    /// Scheduled start time on [`Event::date`].
    #[serde(with = "clock_time")]
    pub time: NaiveTime,
    /// Latitude of the venue in degrees.
    pub latitude: f64,
    /// Longitude of the venue in degrees.
    pub longitude: f64,
    /// Capacity set by the owner.
    pub max_participants: u32,
    /// Confirmed subscribers, as counted by the backend.
    #[serde(default)]
    pub current_participants: u32,
    /// Category label.
    #[serde(default)]
    pub category: String,
    /// Owner of the event.
    pub user_id: UserId,
}

/// Whether an event still lies ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalState {
    /// The event has not started yet.
    Upcoming,
    /// The event start is in the past.
    Finished,
}

impl Event {
    /// Returns the scheduled start as a local date-time.
    #[must_use]
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    /// Derives the temporal state of the event relative to `now`.
    #[must_use]
    pub fn temporal_state(&self, now: NaiveDateTime) -> TemporalState {
        if self.starts_at() < now {
            TemporalState::Finished
        } else {
            TemporalState::Upcoming
        }
    }

    /// Returns `true` when no confirmed spot is left.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.current_participants >= self.max_participants
    }

    /// Number of spots still available.
    #[must_use]
    pub const fn spots_left(&self) -> u32 {
        self.max_participants.saturating_sub(self.current_participants)
    }

    /// Returns `true` if `user` owns this event.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.user_id == user
    }
}

/// Body of `POST /createEvent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Scheduled day.
    pub date: NaiveDate,
    /// Scheduled start time.
    #[serde(with = "clock_time")]
    pub time: NaiveTime,
    /// Latitude picked on the map.
    pub latitude: f64,
    /// Longitude picked on the map.
    pub longitude: f64,
    /// Capacity of the event.
    pub max_participants: u32,
    /// Always zero on creation; kept for the backend's body shape.
    pub current_participants: u32,
    /// Category label.
    pub category: String,
    /// Owner; filled in from the session before sending.
    pub user_id: UserId,
}

impl NewEvent {
    /// Checks the payload before it is sent.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRequest`] on an empty name, a zero
    /// capacity, or coordinates outside the valid range.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.name.trim().is_empty() {
            return Err(ClientError::InvalidRequest(
                "event name must not be empty".to_string(),
            ));
        }
        if self.max_participants == 0 {
            return Err(ClientError::InvalidRequest(
                "max participants must be at least 1".to_string(),
            ));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ClientError::InvalidRequest(format!(
                "latitude {} out of range",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ClientError::InvalidRequest(format!(
                "longitude {} out of range",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// Fields an owner may edit after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventUpdate {
    /// New display name.
    pub name: String,
    /// New description.
    pub description: String,
    /// New scheduled day.
    pub date: NaiveDate,
}

impl EventUpdate {
    /// Checks the edit before it is sent.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRequest`] when the name is blank.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.name.trim().is_empty() {
            return Err(ClientError::InvalidRequest(
                "event name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Local search over an event list.
///
/// All criteria are optional; an empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Case-insensitive substring over name, description and category.
    pub text: Option<String>,
    /// Exact category, compared case-insensitively.
    pub category: Option<String>,
    /// Restrict to upcoming or finished events.
    pub temporal: Option<TemporalState>,
}

impl EventFilter {
    /// Sets the free-text criterion.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the category criterion.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the temporal criterion.
    #[must_use]
    pub const fn with_temporal(mut self, temporal: TemporalState) -> Self {
        self.temporal = Some(temporal);
        self
    }

    /// Returns `true` if `event` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, event: &Event, now: NaiveDateTime) -> bool {
        if let Some(text) = self.text.as_deref() {
            let needle = text.trim().to_lowercase();
            if !needle.is_empty() {
                let hit = [&event.name, &event.description, &event.category]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle));
                if !hit {
                    return false;
                }
            }
        }
        if let Some(category) = self.category.as_deref()
            && !event.category.eq_ignore_ascii_case(category)
        {
            return false;
        }
        if let Some(temporal) = self.temporal
            && event.temporal_state(now) != temporal
        {
            return false;
        }
        true
    }

    /// Keeps the events that match, preserving order.
    #[must_use]
    pub fn apply(&self, events: Vec<Event>, now: NaiveDateTime) -> Vec<Event> {
        events
            .into_iter()
            .filter(|event| self.matches(event, now))
            .collect()
    }
}

/// Serde adapter for `HH:MM` clock times. Also accepts `HH:MM:SS`.
mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M"))
            .map_err(serde::de::Error::custom)
    }
}
