//! Event endpoints: listing, lookup, creation, edit, deletion.

use super::ApiClient;
use crate::domain::{Event, EventId, EventUpdate, NewEvent, UserId};
use crate::error::ClientError;

impl ApiClient {
    /// `GET /getEvents`: every event on the platform.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, status or decode failure.
    pub async fn list_events(&self) -> Result<Vec<Event>, ClientError> {
        self.get_json(&["getEvents"]).await
    }

    /// `GET /getEventById/:id`: a single event.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, status or decode failure.
    pub async fn get_event(&self, event_id: EventId) -> Result<Event, ClientError> {
        self.get_json(&["getEventById", &event_id.to_string()]).await
    }

    /// `GET /getEventsByUserId/:id`: events owned by a user.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, status or decode failure.
    pub async fn events_by_user(&self, user_id: UserId) -> Result<Vec<Event>, ClientError> {
        self.get_json(&["getEventsByUserId", &user_id.to_string()])
            .await
    }

    /// `POST /createEvent`: creates an event and returns it with its id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRequest`] if the payload fails local
    /// validation (nothing is sent), or any request failure.
    pub async fn create_event(&self, event: &NewEvent) -> Result<Event, ClientError> {
        event.validate()?;
        self.post_json(&["createEvent"], event).await
    }

    /// `GET /updateEvent/:id/:name/:desc/:date`: owner edit.
    ///
    /// The backend takes the new values as path segments; each is
    /// percent-encoded.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRequest`] on a blank name, or any
    /// request failure.
    pub async fn update_event(
        &self,
        event_id: EventId,
        update: &EventUpdate,
    ) -> Result<Event, ClientError> {
        update.validate()?;
        let id = event_id.to_string();
        let date = update.date.format("%Y-%m-%d").to_string();
        self.get_json(&[
            "updateEvent",
            &id,
            &update.name,
            &update.description,
            &date,
        ])
        .await
    }

    /// `DELETE /deleteEventById/:id`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport or status failure.
    pub async fn delete_event(&self, event_id: EventId) -> Result<(), ClientError> {
        self.delete_ack(&["deleteEventById", &event_id.to_string()])
            .await
    }
}
