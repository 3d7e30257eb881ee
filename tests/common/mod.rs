//! In-process EventHub backend for integration tests.
//!
//! Serves the same routes as the real backend from memory. Subscription
//! transitions go through [`EventRoster`], and every route counts its
//! hits so tests can assert how many fetches a watcher issued.

#![allow(dead_code, clippy::panic)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use eventhub_client::api::ApiClient;
use eventhub_client::domain::{
    Event, EventId, EventRoster, InvalidationBus, NewEvent, Rating, User, UserId, average_score,
};
use eventhub_client::service::{PlatformService, ResourceState, ResourceWatcher};
use eventhub_client::session::{MemorySessionStore, SessionManager};

type Reply<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type Shared = Arc<Mutex<Backend>>;

fn fail<T>(status: StatusCode, message: impl Into<String>) -> Reply<T> {
    Err((status, Json(json!({ "error": message.into() }))))
}

#[derive(Debug, Clone)]
struct Account {
    user: User,
    password: String,
}

/// Backend state.
#[derive(Debug, Default)]
pub struct Backend {
    next_id: i64,
    accounts: BTreeMap<UserId, Account>,
    events: BTreeMap<EventId, Event>,
    rosters: BTreeMap<EventId, EventRoster>,
    ratings: Vec<Rating>,
    hits: BTreeMap<&'static str, usize>,
}

impl Backend {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn hit(&mut self, route: &'static str) {
        *self.hits.entry(route).or_default() += 1;
    }

    fn add_user(&mut self, name: &str, email: &str, password: &str) -> UserId {
        let id = UserId::from_raw(self.next_id());
        self.accounts.insert(
            id,
            Account {
                user: User {
                    id,
                    name: name.to_string(),
                    email: email.to_string(),
                    rating: None,
                    profile_image: None,
                    banner_image: None,
                },
                password: password.to_string(),
            },
        );
        id
    }

    fn add_event(&mut self, new: NewEvent) -> Event {
        let id = EventId::from_raw(self.next_id());
        let event = Event {
            id,
            name: new.name,
            description: new.description,
            date: new.date,
            time: new.time,
            latitude: new.latitude,
            longitude: new.longitude,
            max_participants: new.max_participants,
            current_participants: 0,
            category: new.category,
            user_id: new.user_id,
        };
        self.rosters
            .insert(id, EventRoster::new(id, new.max_participants));
        self.events.insert(id, event.clone());
        event
    }

    /// Copies the roster's participant count onto the event.
    fn sync_participants(&mut self, event_id: EventId) {
        let count = self
            .rosters
            .get(&event_id)
            .map(EventRoster::current_participants);
        if let (Some(event), Some(count)) = (self.events.get_mut(&event_id), count) {
            event.current_participants = count;
        }
    }

    fn events_where(&self, pred: impl Fn(&Event) -> bool) -> Vec<Event> {
        self.events.values().filter(|e| pred(e)).cloned().collect()
    }
}

/// A running fake backend bound to a local port.
///
/// Services created from one backend share an invalidation bus, the way
/// the screens of a single app would.
#[derive(Debug)]
pub struct FakeBackend {
    addr: SocketAddr,
    state: Shared,
    bus: InvalidationBus,
    task: JoinHandle<()>,
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl FakeBackend {
    /// Binds an ephemeral port and starts serving.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(Backend::default()));
        let app = router(Arc::clone(&state));
        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            addr,
            state,
            bus: InvalidationBus::new(256),
            task,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Backend> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Base URL of the backend.
    pub fn url(&self) -> reqwest::Url {
        let Ok(url) = reqwest::Url::parse(&format!("http://{}", self.addr)) else {
            panic!("bad url");
        };
        url
    }

    /// A service with an in-memory session store, not logged in.
    pub fn service(&self) -> PlatformService {
        let api = ApiClient::with_http(reqwest::Client::new(), self.url());
        let session = Arc::new(SessionManager::new(
            Arc::new(MemorySessionStore::new()),
            Duration::from_secs(3600),
        ));
        PlatformService::new(api, self.bus.clone(), session)
    }

    /// Creates an account directly in the backend.
    pub fn seed_user(&self, name: &str, email: &str, password: &str) -> UserId {
        self.lock().add_user(name, email, password)
    }

    /// Number of requests served for a route name such as
    /// `"getSubscribedEvents"`.
    pub fn hits(&self, route: &str) -> usize {
        self.lock().hits.get(route).copied().unwrap_or(0)
    }

    /// Snapshot of an event's roster.
    pub fn roster(&self, event_id: EventId) -> Option<EventRoster> {
        self.lock().rosters.get(&event_id).cloned()
    }
}

/// Logs `service` in, panicking on failure.
pub async fn login(service: &PlatformService, email: &str, password: &str) -> UserId {
    let Ok(credentials) = eventhub_client::domain::Credentials::new(email, password) else {
        panic!("invalid credentials");
    };
    let Ok(session) = service.login(&credentials).await else {
        panic!("login failed for {email}");
    };
    session.user_id
}

/// A valid event payload with the given capacity.
pub fn new_event(name: &str, max_participants: u32) -> NewEvent {
    NewEvent {
        name: name.to_string(),
        description: format!("{name} description"),
        date: NaiveDate::from_ymd_opt(2031, 5, 17).unwrap_or_default(),
        time: NaiveTime::from_hms_opt(18, 30, 0).unwrap_or_default(),
        latitude: 45.07,
        longitude: 7.68,
        max_participants,
        current_participants: 0,
        category: "Music".to_string(),
        user_id: UserId::from_raw(0),
    }
}

/// Waits (bounded) until the watcher state satisfies `predicate`.
pub async fn eventually<T>(
    watcher: &mut ResourceWatcher<T>,
    predicate: impl FnMut(&ResourceState<T>) -> bool,
) -> ResourceState<T>
where
    T: Clone + Send + Sync + 'static,
{
    let Ok(Some(state)) =
        tokio::time::timeout(Duration::from_secs(5), watcher.wait_for(predicate)).await
    else {
        panic!("watcher never reached the expected state");
    };
    state
}

/// Waits (bounded) until fetch number `generation` has settled.
pub async fn settled<T>(watcher: &mut ResourceWatcher<T>, generation: u64) -> ResourceState<T>
where
    T: Clone + Send + Sync + 'static,
{
    let Ok(Some(state)) =
        tokio::time::timeout(Duration::from_secs(5), watcher.wait_settled(generation)).await
    else {
        panic!("watcher did not settle generation {generation}");
    };
    state
}

/// Ids of the events in a ready state, empty otherwise.
pub fn event_ids(state: &ResourceState<Vec<Event>>) -> Vec<EventId> {
    state
        .data()
        .map(|events| events.iter().map(|e| e.id).collect())
        .unwrap_or_default()
}

// ── Routes ────────────────────────────────────────────────────────────

fn router(state: Shared) -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/userLogin", post(login_route))
        .route("/getEvents", get(list_events))
        .route("/getEventById/{id}", get(get_event))
        .route("/getEventsByUserId/{id}", get(events_by_user))
        .route("/createEvent", post(create_event))
        .route(
            "/updateEvent/{id}/{name}/{description}/{date}",
            get(update_event),
        )
        .route("/deleteEventById/{id}", delete(delete_event))
        .route("/subscribeToEvent", post(subscribe))
        .route("/confirmSubscriptionToAnEvent", post(confirm))
        .route("/denySubscriptionToAnEvent/{event}/{user}", delete(deny))
        .route("/unsubscribeUserFromEvent/{user}/{event}", delete(unsubscribe))
        .route("/getSubscribedEvents/{user}", get(subscribed_events))
        .route("/getPendingRequestedEvents/{user}", get(pending_events))
        .route("/getEventSubscribers/{event}", get(event_subscribers))
        .route("/getEventPendingRequests/{event}", get(event_requests))
        .route("/createNewUserRating", post(create_rating))
        .route("/getUserRating/{id}", get(user_ratings))
        .route("/getUserById/{id}", get(get_user))
        .route("/updateUser", post(update_user))
        .route("/getUserProfileImage/{id}", get(profile_image))
        .route("/uploadUserProfileImage", post(upload_profile_image))
        .route("/getUserBannerImage/{id}", get(banner_image))
        .route("/uploadUserBannerImage", post(upload_banner_image))
        .with_state(state)
}

fn backend(state: &Shared) -> MutexGuard<'_, Backend> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Deserialize)]
struct AuthBody {
    email: String,
    password: String,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionBody {
    event_id: EventId,
    user_id: UserId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileBody {
    user_id: UserId,
    name: String,
    email: String,
}

async fn register(State(state): State<Shared>, Json(body): Json<AuthBody>) -> Reply<Value> {
    let mut b = backend(&state);
    b.hit("register");
    if b.accounts.values().any(|a| a.user.email == body.email) {
        return fail(StatusCode::CONFLICT, "email already registered");
    }
    let id = b.add_user(&body.name, &body.email, &body.password);
    Ok(Json(json!({ "id": id, "name": body.name, "email": body.email })))
}

async fn login_route(State(state): State<Shared>, Json(body): Json<AuthBody>) -> Reply<Value> {
    let mut b = backend(&state);
    b.hit("userLogin");
    let found = b
        .accounts
        .values()
        .find(|a| a.user.email == body.email && a.password == body.password)
        .map(|a| a.user.clone());
    // Wrong credentials come back as 200 with an error body.
    Ok(Json(match found {
        Some(user) => json!({ "id": user.id, "name": user.name, "email": user.email }),
        None => json!({ "error": "Invalid credentials" }),
    }))
}

async fn list_events(State(state): State<Shared>) -> Reply<Vec<Event>> {
    let mut b = backend(&state);
    b.hit("getEvents");
    Ok(Json(b.events.values().cloned().collect()))
}

async fn get_event(State(state): State<Shared>, Path(id): Path<EventId>) -> Reply<Event> {
    let mut b = backend(&state);
    b.hit("getEventById");
    match b.events.get(&id) {
        Some(event) => Ok(Json(event.clone())),
        None => fail(StatusCode::NOT_FOUND, "Event not found"),
    }
}

async fn events_by_user(State(state): State<Shared>, Path(user): Path<UserId>) -> Reply<Vec<Event>> {
    let mut b = backend(&state);
    b.hit("getEventsByUserId");
    Ok(Json(b.events_where(|e| e.user_id == user)))
}

async fn create_event(State(state): State<Shared>, Json(body): Json<NewEvent>) -> Reply<Event> {
    let mut b = backend(&state);
    b.hit("createEvent");
    if !b.accounts.contains_key(&body.user_id) {
        return fail(StatusCode::BAD_REQUEST, "unknown owner");
    }
    Ok(Json(b.add_event(body)))
}

async fn update_event(
    State(state): State<Shared>,
    Path((id, name, description, date)): Path<(EventId, String, String, String)>,
) -> Reply<Event> {
    let mut b = backend(&state);
    b.hit("updateEvent");
    let Ok(date) = NaiveDate::parse_from_str(&date, "%Y-%m-%d") else {
        return fail(StatusCode::BAD_REQUEST, "bad date");
    };
    let Some(event) = b.events.get_mut(&id) else {
        return fail(StatusCode::NOT_FOUND, "Event not found");
    };
    event.name = name;
    event.description = description;
    event.date = date;
    Ok(Json(event.clone()))
}

async fn delete_event(State(state): State<Shared>, Path(id): Path<EventId>) -> Reply<Value> {
    let mut b = backend(&state);
    b.hit("deleteEventById");
    if b.events.remove(&id).is_none() {
        return fail(StatusCode::NOT_FOUND, "Event not found");
    }
    b.rosters.remove(&id);
    Ok(Json(json!({})))
}

async fn subscribe(State(state): State<Shared>, Json(body): Json<SubscriptionBody>) -> Reply<Value> {
    let mut b = backend(&state);
    b.hit("subscribeToEvent");
    let Some(roster) = b.rosters.get_mut(&body.event_id) else {
        return fail(StatusCode::NOT_FOUND, "Event not found");
    };
    match roster.request(body.user_id) {
        Ok(()) => Ok(Json(json!({}))),
        Err(e) => fail(StatusCode::CONFLICT, e.to_string()),
    }
}

async fn confirm(State(state): State<Shared>, Json(body): Json<SubscriptionBody>) -> Reply<Value> {
    let mut b = backend(&state);
    b.hit("confirmSubscriptionToAnEvent");
    let Some(roster) = b.rosters.get_mut(&body.event_id) else {
        return fail(StatusCode::NOT_FOUND, "Event not found");
    };
    match roster.accept(body.user_id) {
        Ok(_) => {
            b.sync_participants(body.event_id);
            Ok(Json(json!({})))
        }
        Err(e) => fail(StatusCode::CONFLICT, e.to_string()),
    }
}

async fn deny(
    State(state): State<Shared>,
    Path((event, user)): Path<(EventId, UserId)>,
) -> Reply<Value> {
    let mut b = backend(&state);
    b.hit("denySubscriptionToAnEvent");
    let Some(roster) = b.rosters.get_mut(&event) else {
        return fail(StatusCode::NOT_FOUND, "Event not found");
    };
    match roster.deny(user) {
        Ok(()) => Ok(Json(json!({}))),
        Err(e) => fail(StatusCode::CONFLICT, e.to_string()),
    }
}

async fn unsubscribe(
    State(state): State<Shared>,
    Path((user, event)): Path<(UserId, EventId)>,
) -> Reply<Value> {
    let mut b = backend(&state);
    b.hit("unsubscribeUserFromEvent");
    let Some(roster) = b.rosters.get_mut(&event) else {
        return fail(StatusCode::NOT_FOUND, "Event not found");
    };
    match roster.unsubscribe(user) {
        Ok(()) => {
            b.sync_participants(event);
            Ok(Json(json!({})))
        }
        Err(e) => fail(StatusCode::CONFLICT, e.to_string()),
    }
}

fn events_in_state(
    b: &Backend,
    user: UserId,
    state: eventhub_client::domain::SubscriptionState,
) -> Vec<Event> {
    b.events_where(|e| {
        b.rosters
            .get(&e.id)
            .is_some_and(|r| r.state_of(user) == state)
    })
}

async fn subscribed_events(State(state): State<Shared>, Path(user): Path<UserId>) -> Reply<Vec<Event>> {
    let mut b = backend(&state);
    b.hit("getSubscribedEvents");
    Ok(Json(events_in_state(
        &b,
        user,
        eventhub_client::domain::SubscriptionState::Subscribed,
    )))
}

async fn pending_events(State(state): State<Shared>, Path(user): Path<UserId>) -> Reply<Vec<Event>> {
    let mut b = backend(&state);
    b.hit("getPendingRequestedEvents");
    Ok(Json(events_in_state(
        &b,
        user,
        eventhub_client::domain::SubscriptionState::Requested,
    )))
}

async fn event_subscribers(State(state): State<Shared>, Path(event): Path<EventId>) -> Reply<Vec<Value>> {
    let mut b = backend(&state);
    b.hit("getEventSubscribers");
    let Some(roster) = b.rosters.get(&event) else {
        return fail(StatusCode::NOT_FOUND, "Event not found");
    };
    let users = roster
        .subscribed()
        .map(|id| {
            let name = b.accounts.get(&id).map(|a| a.user.name.clone());
            json!({ "id": id, "name": name })
        })
        .collect();
    Ok(Json(users))
}

async fn event_requests(State(state): State<Shared>, Path(event): Path<EventId>) -> Reply<Vec<UserId>> {
    let mut b = backend(&state);
    b.hit("getEventPendingRequests");
    let Some(roster) = b.rosters.get(&event) else {
        return fail(StatusCode::NOT_FOUND, "Event not found");
    };
    Ok(Json(roster.pending().collect()))
}

async fn create_rating(State(state): State<Shared>, Json(body): Json<Rating>) -> Reply<Value> {
    let mut b = backend(&state);
    b.hit("createNewUserRating");
    let id = b.next_id();
    let rated = body.rated_id;
    b.ratings.push(Rating {
        id: Some(id),
        ..body
    });
    let received: Vec<Rating> = b
        .ratings
        .iter()
        .filter(|r| r.rated_id == rated)
        .cloned()
        .collect();
    let average = average_score(&received);
    if let Some(account) = b.accounts.get_mut(&rated) {
        account.user.rating = average;
    }
    Ok(Json(json!({ "id": id })))
}

async fn user_ratings(State(state): State<Shared>, Path(user): Path<UserId>) -> Reply<Vec<Rating>> {
    let mut b = backend(&state);
    b.hit("getUserRating");
    Ok(Json(
        b.ratings
            .iter()
            .filter(|r| r.rated_id == user)
            .cloned()
            .collect(),
    ))
}

async fn get_user(State(state): State<Shared>, Path(user): Path<UserId>) -> Reply<User> {
    let mut b = backend(&state);
    b.hit("getUserById");
    match b.accounts.get(&user) {
        Some(account) => Ok(Json(account.user.clone())),
        None => fail(StatusCode::NOT_FOUND, "User not found"),
    }
}

async fn update_user(State(state): State<Shared>, Json(body): Json<ProfileBody>) -> Reply<User> {
    let mut b = backend(&state);
    b.hit("updateUser");
    let Some(account) = b.accounts.get_mut(&body.user_id) else {
        return fail(StatusCode::NOT_FOUND, "User not found");
    };
    account.user.name = body.name;
    account.user.email = body.email;
    Ok(Json(account.user.clone()))
}

async fn image_of(
    state: &Shared,
    route: &'static str,
    user: UserId,
    pick: fn(&User) -> Option<String>,
) -> Reply<Value> {
    let mut b = backend(state);
    b.hit(route);
    match b.accounts.get(&user).and_then(|a| pick(&a.user)) {
        Some(url) => Ok(Json(json!({ "imageUrl": url }))),
        None => fail(StatusCode::NOT_FOUND, "no image"),
    }
}

async fn profile_image(State(state): State<Shared>, Path(user): Path<UserId>) -> Reply<Value> {
    image_of(&state, "getUserProfileImage", user, |u| u.profile_image.clone()).await
}

async fn banner_image(State(state): State<Shared>, Path(user): Path<UserId>) -> Reply<Value> {
    image_of(&state, "getUserBannerImage", user, |u| u.banner_image.clone()).await
}

/// Reads the `userId` and `image` parts of an upload.
async fn read_upload(mut multipart: Multipart) -> Option<(UserId, String)> {
    let mut user = None;
    let mut file = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("userId") => {
                user = field.text().await.ok().and_then(|t| t.parse::<i64>().ok());
            }
            Some("image") => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.ok()?;
                if !bytes.is_empty() {
                    file = file_name;
                }
            }
            _ => {}
        }
    }
    Some((UserId::from_raw(user?), file?))
}

async fn upload_profile_image(State(state): State<Shared>, multipart: Multipart) -> Reply<Value> {
    let upload = read_upload(multipart).await;
    let mut b = backend(&state);
    b.hit("uploadUserProfileImage");
    let Some((user, file)) = upload else {
        return fail(StatusCode::BAD_REQUEST, "bad upload");
    };
    let Some(account) = b.accounts.get_mut(&user) else {
        return fail(StatusCode::NOT_FOUND, "User not found");
    };
    let url = format!("/images/profile/{file}");
    account.user.profile_image = Some(url.clone());
    Ok(Json(json!({ "imageUrl": url })))
}

async fn upload_banner_image(State(state): State<Shared>, multipart: Multipart) -> Reply<Value> {
    let upload = read_upload(multipart).await;
    let mut b = backend(&state);
    b.hit("uploadUserBannerImage");
    let Some((user, file)) = upload else {
        return fail(StatusCode::BAD_REQUEST, "bad upload");
    };
    let Some(account) = b.accounts.get_mut(&user) else {
        return fail(StatusCode::NOT_FOUND, "User not found");
    };
    let url = format!("/images/banner/{file}");
    account.user.banner_image = Some(url.clone());
    Ok(Json(json!({ "imageUrl": url })))
}
