//! Platform service: session-aware mutations, queries and watchers.

use std::future::Future;
use std::sync::Arc;

use chrono::Local;

use super::resource::ResourceWatcher;
use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::domain::{
    Credentials, Event, EventFilter, EventId, EventRoster, EventUpdate, ImageRef, ImageUpload,
    InvalidationBus, NewEvent, NewRating, ProfileUpdate, Rating, Registration, ResourceKey,
    SubscriptionState, User, UserId,
};
use crate::error::ClientError;
use crate::session::{FileSessionStore, Session, SessionManager};

/// Orchestration layer between callers and the backend.
///
/// Every mutation follows the same pattern: resolve the session user,
/// check ownership where the event is known, issue exactly one request,
/// then publish invalidations for the resources it changed. Nothing is
/// updated optimistically; watchers refetch from the backend.
#[derive(Debug, Clone)]
pub struct PlatformService {
    api: ApiClient,
    bus: InvalidationBus,
    session: Arc<SessionManager>,
}

impl PlatformService {
    /// Creates a new `PlatformService`.
    #[must_use]
    pub const fn new(api: ApiClient, bus: InvalidationBus, session: Arc<SessionManager>) -> Self {
        Self { api, bus, session }
    }

    /// Builds the service from configuration with a file-backed session
    /// store.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let api = ApiClient::new(config)?;
        let store = Arc::new(FileSessionStore::new(config.session_path.clone()));
        let session = Arc::new(SessionManager::new(store, config.session_ttl));
        Ok(Self::new(
            api,
            InvalidationBus::new(config.invalidation_capacity),
            session,
        ))
    }

    /// Returns a reference to the inner [`ApiClient`].
    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Returns a reference to the inner [`InvalidationBus`].
    #[must_use]
    pub const fn bus(&self) -> &InvalidationBus {
        &self.bus
    }

    /// Returns a reference to the inner [`SessionManager`].
    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    // ── Session ───────────────────────────────────────────────────────

    /// Creates an account and starts a session for it.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] if the backend rejects the registration
    /// or the session cannot be stored.
    pub async fn register(&self, registration: &Registration) -> Result<Session, ClientError> {
        let response = self.api.register(registration).await?;
        tracing::info!(user_id = %response.id, "account registered");
        self.session.begin(response.id)
    }

    /// Logs in and starts a session.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] on wrong credentials, transport failure,
    /// or if the session cannot be stored.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ClientError> {
        let response = self.api.login(credentials).await?;
        self.session.begin(response.id)
    }

    /// Ends the session. User-scoped watchers go back to idle.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Storage`] if the store cannot be cleared.
    pub fn logout(&self) -> Result<(), ClientError> {
        self.session.end()
    }

    /// Resumes a persisted session if one exists and has not expired.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Storage`] if the store cannot be read.
    pub fn restore_session(&self) -> Result<Option<Session>, ClientError> {
        self.session.restore()
    }

    /// Fetches the profile of the session user.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotAuthenticated`] while logged out, or any
    /// request failure.
    pub async fn current_user(&self) -> Result<User, ClientError> {
        let me = self.session.require_user()?;
        self.api.get_user(me).await
    }

    // ── Events ────────────────────────────────────────────────────────

    /// Creates an event owned by the session user.
    ///
    /// The owner field of `event` is overwritten with the session user.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotAuthenticated`] while logged out,
    /// [`ClientError::InvalidRequest`] on invalid input, or any request
    /// failure.
    pub async fn create_event(&self, event: NewEvent) -> Result<Event, ClientError> {
        let me = self.session.require_user()?;
        let event = NewEvent {
            user_id: me,
            ..event
        };
        let created = self.api.create_event(&event).await?;
        tracing::info!(event_id = %created.id, owner = %me, "event created");
        self.bus
            .publish_all([ResourceKey::Events, ResourceKey::UserEvents(me)]);
        Ok(created)
    }

    /// Edits the name, description and date of an event the session user
    /// owns.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Forbidden`] if the session user is not the
    /// owner, or any request failure.
    pub async fn update_event(
        &self,
        event: &Event,
        update: &EventUpdate,
    ) -> Result<Event, ClientError> {
        let me = self.require_owner(event)?;
        let updated = self.api.update_event(event.id, update).await?;
        tracing::info!(event_id = %event.id, "event updated");
        self.bus.publish_all([
            ResourceKey::Events,
            ResourceKey::Event(event.id),
            ResourceKey::UserEvents(me),
        ]);
        Ok(updated)
    }

    /// Deletes an event the session user owns.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Forbidden`] if the session user is not the
    /// owner, or any request failure.
    pub async fn delete_event(&self, event: &Event) -> Result<(), ClientError> {
        let me = self.require_owner(event)?;
        self.api.delete_event(event.id).await?;
        tracing::info!(event_id = %event.id, "event deleted");
        self.bus.publish_all([
            ResourceKey::Events,
            ResourceKey::Event(event.id),
            ResourceKey::UserEvents(me),
            ResourceKey::EventSubscribers(event.id),
            ResourceKey::EventRequests(event.id),
        ]);
        Ok(())
    }

    /// Fetches every event and keeps those matching `filter`.
    ///
    /// Temporal state is judged against local time.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] if the list cannot be fetched.
    pub async fn search_events(&self, filter: &EventFilter) -> Result<Vec<Event>, ClientError> {
        let events = self.api.list_events().await?;
        Ok(filter.apply(events, Local::now().naive_local()))
    }

    // ── Subscriptions ─────────────────────────────────────────────────

    /// Asks to join an event as the session user.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotAuthenticated`] while logged out, or any
    /// request failure.
    pub async fn request_subscription(&self, event_id: EventId) -> Result<(), ClientError> {
        let me = self.session.require_user()?;
        self.api.subscribe(event_id, me).await?;
        tracing::info!(%event_id, user_id = %me, "subscription requested");
        self.bus.publish_all([
            ResourceKey::PendingRequests(me),
            ResourceKey::EventRequests(event_id),
        ]);
        Ok(())
    }

    /// Accepts a pending request on an event the session user owns.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Forbidden`] if the session user is not the
    /// owner, or any request failure (a full event is reported by the
    /// backend).
    pub async fn accept_request(&self, event: &Event, user: UserId) -> Result<(), ClientError> {
        let me = self.require_owner(event)?;
        self.api.confirm_subscription(event.id, user).await?;
        tracing::info!(event_id = %event.id, user_id = %user, "subscription accepted");
        self.bus.publish_all([
            ResourceKey::EventRequests(event.id),
            ResourceKey::EventSubscribers(event.id),
            ResourceKey::Event(event.id),
            ResourceKey::Events,
            ResourceKey::UserEvents(me),
            ResourceKey::PendingRequests(user),
            ResourceKey::SubscribedEvents(user),
        ]);
        Ok(())
    }

    /// Denies a pending request on an event the session user owns.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Forbidden`] if the session user is not the
    /// owner, or any request failure.
    pub async fn deny_request(&self, event: &Event, user: UserId) -> Result<(), ClientError> {
        self.require_owner(event)?;
        self.api.deny_subscription(event.id, user).await?;
        tracing::info!(event_id = %event.id, user_id = %user, "subscription denied");
        self.bus.publish_all([
            ResourceKey::EventRequests(event.id),
            ResourceKey::PendingRequests(user),
        ]);
        Ok(())
    }

    /// Leaves an event the session user is subscribed to.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotAuthenticated`] while logged out, or any
    /// request failure (including "not subscribed" from the backend).
    pub async fn unsubscribe(&self, event_id: EventId) -> Result<(), ClientError> {
        let me = self.session.require_user()?;
        self.api.unsubscribe(me, event_id).await?;
        tracing::info!(%event_id, user_id = %me, "unsubscribed");
        self.bus.publish_all([
            ResourceKey::SubscribedEvents(me),
            ResourceKey::EventSubscribers(event_id),
            ResourceKey::Event(event_id),
            ResourceKey::Events,
        ]);
        Ok(())
    }

    /// Removes a participant from an event the session user owns.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Forbidden`] if the session user is not the
    /// owner, or any request failure.
    pub async fn remove_subscriber(&self, event: &Event, user: UserId) -> Result<(), ClientError> {
        let me = self.require_owner(event)?;
        self.api.unsubscribe(user, event.id).await?;
        tracing::info!(event_id = %event.id, user_id = %user, "participant removed");
        self.bus.publish_all([
            ResourceKey::EventSubscribers(event.id),
            ResourceKey::Event(event.id),
            ResourceKey::Events,
            ResourceKey::UserEvents(me),
            ResourceKey::SubscribedEvents(user),
        ]);
        Ok(())
    }

    /// Fetches the pending and subscribed lists of an event and combines
    /// them into an [`EventRoster`].
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] if either list cannot be fetched.
    pub async fn event_roster(&self, event: &Event) -> Result<EventRoster, ClientError> {
        let (pending, subscribed) = tokio::try_join!(
            self.api.event_requests(event.id),
            self.api.event_subscribers(event.id),
        )?;
        Ok(EventRoster::from_lists(
            event.id,
            event.max_participants,
            pending,
            subscribed,
        ))
    }

    /// Where the session user stands with respect to `event`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotAuthenticated`] while logged out, or any
    /// request failure.
    pub async fn subscription_state(&self, event: &Event) -> Result<SubscriptionState, ClientError> {
        let me = self.session.require_user()?;
        Ok(self.event_roster(event).await?.state_of(me))
    }

    // ── Ratings and profile ───────────────────────────────────────────

    /// Rates another user as the session user.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRequest`] for an out-of-range score or
    /// a self-rating (nothing is sent), or any request failure.
    pub async fn rate_user(
        &self,
        rated: UserId,
        score: u8,
        comment: &str,
    ) -> Result<(), ClientError> {
        let me = self.session.require_user()?;
        let rating = NewRating::new(me, rated, score, comment)?;
        self.api.create_rating(&rating).await?;
        tracing::info!(rater = %me, rated = %rated, score, "user rated");
        self.bus
            .publish_all([ResourceKey::UserRatings(rated), ResourceKey::User(rated)]);
        Ok(())
    }

    /// Changes the session user's name and email.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRequest`] on invalid fields, or any
    /// request failure.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ClientError> {
        let me = self.session.require_user()?;
        let user = self.api.update_profile(me, update).await?;
        tracing::info!(user_id = %me, "profile updated");
        self.bus.publish(ResourceKey::User(me));
        Ok(user)
    }

    /// Replaces the session user's profile image.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRequest`] for an empty image, or any
    /// request failure.
    pub async fn upload_profile_image(&self, image: ImageUpload) -> Result<ImageRef, ClientError> {
        let me = self.session.require_user()?;
        let image = self.api.upload_profile_image(me, image).await?;
        tracing::info!(user_id = %me, "profile image uploaded");
        self.bus
            .publish_all([ResourceKey::ProfileImage(me), ResourceKey::User(me)]);
        Ok(image)
    }

    /// Replaces the session user's banner image.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRequest`] for an empty image, or any
    /// request failure.
    pub async fn upload_banner_image(&self, image: ImageUpload) -> Result<ImageRef, ClientError> {
        let me = self.session.require_user()?;
        let image = self.api.upload_banner_image(me, image).await?;
        tracing::info!(user_id = %me, "banner image uploaded");
        self.bus
            .publish_all([ResourceKey::BannerImage(me), ResourceKey::User(me)]);
        Ok(image)
    }

    // ── Watchers ──────────────────────────────────────────────────────

    /// Every event on the platform.
    #[must_use]
    pub fn watch_events(&self) -> ResourceWatcher<Vec<Event>> {
        let api = self.api.clone();
        ResourceWatcher::fixed(&self.bus, ResourceKey::Events, move || {
            let api = api.clone();
            async move { api.list_events().await }
        })
    }

    /// A single event.
    #[must_use]
    pub fn watch_event(&self, event_id: EventId) -> ResourceWatcher<Event> {
        let api = self.api.clone();
        ResourceWatcher::fixed(&self.bus, ResourceKey::Event(event_id), move || {
            let api = api.clone();
            async move { api.get_event(event_id).await }
        })
    }

    /// Confirmed participants of an event.
    #[must_use]
    pub fn watch_event_subscribers(&self, event_id: EventId) -> ResourceWatcher<Vec<UserId>> {
        let api = self.api.clone();
        ResourceWatcher::fixed(&self.bus, ResourceKey::EventSubscribers(event_id), move || {
            let api = api.clone();
            async move { api.event_subscribers(event_id).await }
        })
    }

    /// Users waiting on a decision for an event.
    #[must_use]
    pub fn watch_event_requests(&self, event_id: EventId) -> ResourceWatcher<Vec<UserId>> {
        let api = self.api.clone();
        ResourceWatcher::fixed(&self.bus, ResourceKey::EventRequests(event_id), move || {
            let api = api.clone();
            async move { api.event_requests(event_id).await }
        })
    }

    /// Ratings received by any user.
    #[must_use]
    pub fn watch_user_ratings(&self, user_id: UserId) -> ResourceWatcher<Vec<Rating>> {
        let api = self.api.clone();
        ResourceWatcher::fixed(&self.bus, ResourceKey::UserRatings(user_id), move || {
            let api = api.clone();
            async move { api.user_ratings(user_id).await }
        })
    }

    /// Events owned by the session user. Idle while logged out.
    #[must_use]
    pub fn watch_my_events(&self) -> ResourceWatcher<Vec<Event>> {
        self.watch_mine(ResourceKey::UserEvents, |api, me| async move {
            api.events_by_user(me).await
        })
    }

    /// Events the session user takes part in. Idle while logged out.
    #[must_use]
    pub fn watch_subscribed_events(&self) -> ResourceWatcher<Vec<Event>> {
        self.watch_mine(ResourceKey::SubscribedEvents, |api, me| async move {
            api.subscribed_events(me).await
        })
    }

    /// Events the session user asked to join. Idle while logged out.
    #[must_use]
    pub fn watch_pending_requests(&self) -> ResourceWatcher<Vec<Event>> {
        self.watch_mine(ResourceKey::PendingRequests, |api, me| async move {
            api.pending_requested_events(me).await
        })
    }

    /// The session user's profile. Idle while logged out.
    #[must_use]
    pub fn watch_profile(&self) -> ResourceWatcher<User> {
        self.watch_mine(ResourceKey::User, |api, me| async move {
            api.get_user(me).await
        })
    }

    /// The session user's profile image. Idle while logged out.
    #[must_use]
    pub fn watch_profile_image(&self) -> ResourceWatcher<ImageRef> {
        self.watch_mine(ResourceKey::ProfileImage, |api, me| async move {
            api.profile_image(me).await
        })
    }

    /// The session user's banner image. Idle while logged out.
    #[must_use]
    pub fn watch_banner_image(&self) -> ResourceWatcher<ImageRef> {
        self.watch_mine(ResourceKey::BannerImage, |api, me| async move {
            api.banner_image(me).await
        })
    }

    /// Spawns a watcher that depends on the session user id.
    fn watch_mine<T, F, Fut>(
        &self,
        key_of: fn(UserId) -> ResourceKey,
        fetch: F,
    ) -> ResourceWatcher<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(ApiClient, UserId) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let api = self.api.clone();
        ResourceWatcher::spawn(
            &self.bus,
            self.session.watch_user(),
            move |me: &UserId| key_of(*me),
            move |me| fetch(api.clone(), me),
        )
    }

    /// Returns the session user if it owns `event`.
    fn require_owner(&self, event: &Event) -> Result<UserId, ClientError> {
        let me = self.session.require_user()?;
        if event.is_owned_by(me) {
            Ok(me)
        } else {
            tracing::warn!(event_id = %event.id, user_id = %me, "not the event owner");
            Err(ClientError::Forbidden(format!(
                "user {me} does not own event {}",
                event.id
            )))
        }
    }
}
