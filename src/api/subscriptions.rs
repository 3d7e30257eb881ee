//! Subscription endpoints: request, confirm, deny, unsubscribe, and the
//! lists that back the subscription screens.

use super::ApiClient;
use super::dto::{RosterEntry, SubscriptionBody};
use crate::domain::{Event, EventId, UserId};
use crate::error::ClientError;

impl ApiClient {
    /// `POST /subscribeToEvent`: `user_id` asks to join `event_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport or status failure.
    pub async fn subscribe(&self, event_id: EventId, user_id: UserId) -> Result<(), ClientError> {
        self.post_ack(&["subscribeToEvent"], &SubscriptionBody { event_id, user_id })
            .await
    }

    /// `POST /confirmSubscriptionToAnEvent`: the owner accepts a request.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport or status failure.
    pub async fn confirm_subscription(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<(), ClientError> {
        self.post_ack(
            &["confirmSubscriptionToAnEvent"],
            &SubscriptionBody { event_id, user_id },
        )
        .await
    }

    /// `DELETE /denySubscriptionToAnEvent/:eventId/:userId`: the owner
    /// refuses a request.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport or status failure.
    pub async fn deny_subscription(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<(), ClientError> {
        self.delete_ack(&[
            "denySubscriptionToAnEvent",
            &event_id.to_string(),
            &user_id.to_string(),
        ])
        .await
    }

    /// `DELETE /unsubscribeUserFromEvent/:userId/:eventId`: used both for
    /// leaving an event and for an owner removing a participant.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport or status failure.
    pub async fn unsubscribe(&self, user_id: UserId, event_id: EventId) -> Result<(), ClientError> {
        self.delete_ack(&[
            "unsubscribeUserFromEvent",
            &user_id.to_string(),
            &event_id.to_string(),
        ])
        .await
    }

    /// `GET /getSubscribedEvents/:userId`: events the user takes part in.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, status or decode failure.
    pub async fn subscribed_events(&self, user_id: UserId) -> Result<Vec<Event>, ClientError> {
        self.get_json(&["getSubscribedEvents", &user_id.to_string()])
            .await
    }

    /// `GET /getPendingRequestedEvents/:userId`: events the user asked to
    /// join and is still waiting on.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, status or decode failure.
    pub async fn pending_requested_events(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Event>, ClientError> {
        self.get_json(&["getPendingRequestedEvents", &user_id.to_string()])
            .await
    }

    /// `GET /getEventSubscribers/:eventId`: confirmed participants.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, status or decode failure.
    pub async fn event_subscribers(&self, event_id: EventId) -> Result<Vec<UserId>, ClientError> {
        let entries: Vec<RosterEntry> = self
            .get_json(&["getEventSubscribers", &event_id.to_string()])
            .await?;
        Ok(entries.iter().map(RosterEntry::user_id).collect())
    }

    /// `GET /getEventPendingRequests/:eventId`: users awaiting a decision.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, status or decode failure.
    pub async fn event_requests(&self, event_id: EventId) -> Result<Vec<UserId>, ClientError> {
        let entries: Vec<RosterEntry> = self
            .get_json(&["getEventPendingRequests", &event_id.to_string()])
            .await?;
        Ok(entries.iter().map(RosterEntry::user_id).collect())
    }
}
