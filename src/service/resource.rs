//! Self-refreshing remote resources.
//!
//! A [`ResourceWatcher`] keeps one remote resource in sync with the
//! backend. It owns a background task that fetches:
//!
//! - once when its dependency (usually the session user id) resolves,
//! - once per call to [`ResourceWatcher::refetch`],
//! - once per [`Invalidation`] on the bus whose key matches its own.
//!
//! It never fetches while the dependency is `None`. A new signal that
//! arrives while a fetch is in flight drops that fetch and starts a new
//! one, so a slow stale response can never overwrite a newer one.
//! Dropping the watcher aborts the task and any request it is running.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::domain::{Invalidation, InvalidationBus, ResourceKey};
use crate::error::ClientError;

/// Observable state of a watched resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceState<T> {
    /// The dependency is unresolved; nothing has been fetched.
    Idle,
    /// A fetch is in flight.
    Loading,
    /// The last fetch succeeded.
    Ready(T),
    /// The last fetch failed with this message.
    Failed(String),
}

impl<T> ResourceState<T> {
    /// Returns `true` once a fetch has completed, successfully or not.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Ready(_) | Self::Failed(_))
    }

    /// Returns `true` while a fetch is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The fetched data, if the last fetch succeeded.
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        match self {
            Self::Ready(data) => Some(data),
            _ => None,
        }
    }

    /// The failure message, if the last fetch failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// A [`ResourceState`] tagged with the fetch that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSnapshot<T> {
    /// Number of fetches issued so far. The state belongs to the latest.
    pub generation: u64,
    /// Current state.
    pub state: ResourceState<T>,
}

type FetchFuture<T> = Pin<Box<dyn Future<Output = Result<T, ClientError>> + Send>>;

/// Handle to a background task that keeps one resource fresh.
pub struct ResourceWatcher<T> {
    snapshot: watch::Receiver<ResourceSnapshot<T>>,
    refetch: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
    /// Keeps the constant dependency of a [`ResourceWatcher::fixed`]
    /// watcher open.
    _anchor: Option<watch::Sender<Option<()>>>,
}

impl<T> ResourceWatcher<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Starts watching a resource that depends on a value published on
    /// `dependency`.
    ///
    /// `key_of` names the resource for a given dependency value, so that
    /// only invalidations of that exact resource trigger a refetch.
    #[must_use]
    pub fn spawn<D, K, F, Fut>(
        bus: &InvalidationBus,
        dependency: watch::Receiver<Option<D>>,
        key_of: K,
        fetch: F,
    ) -> Self
    where
        D: Clone + PartialEq + Send + Sync + 'static,
        K: Fn(&D) -> ResourceKey + Send + 'static,
        F: Fn(D) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let (snapshot_tx, snapshot_rx) = watch::channel(ResourceSnapshot {
            generation: 0,
            state: ResourceState::Idle,
        });
        let (refetch_tx, refetch_rx) = mpsc::unbounded_channel();

        // Subscribe before spawning so no notice published after this call
        // is missed.
        let signals = Signals {
            refetch: refetch_rx,
            invalidations: bus.subscribe(),
            dependency,
            bus_open: true,
            dependency_open: true,
        };

        let fetch = move |dep: D| -> FetchFuture<T> { Box::pin(fetch(dep)) };
        let task = tokio::spawn(run(signals, snapshot_tx, key_of, fetch));

        Self {
            snapshot: snapshot_rx,
            refetch: refetch_tx,
            task,
            _anchor: None,
        }
    }

    /// Starts watching a resource with no dependency. It is fetched
    /// immediately.
    #[must_use]
    pub fn fixed<F, Fut>(bus: &InvalidationBus, key: ResourceKey, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let (anchor, dependency) = watch::channel(Some(()));
        let mut watcher = Self::spawn(bus, dependency, move |()| key, move |()| fetch());
        watcher._anchor = Some(anchor);
        watcher
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ResourceState<T> {
        self.snapshot.borrow().state.clone()
    }

    /// Number of fetches issued since the watcher started.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.snapshot.borrow().generation
    }

    /// Asks for a fresh fetch. Any fetch still in flight is dropped.
    pub fn refetch(&self) {
        let _ = self.refetch.send(());
    }

    /// A receiver that observes every snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ResourceSnapshot<T>> {
        self.snapshot.clone()
    }

    /// Waits for the next snapshot change and returns its state.
    ///
    /// Returns `None` if the background task has stopped.
    pub async fn changed(&mut self) -> Option<ResourceState<T>> {
        self.snapshot.changed().await.ok()?;
        Some(self.snapshot.borrow_and_update().state.clone())
    }

    /// Waits until the state satisfies `predicate`, which may already be
    /// the case.
    ///
    /// Returns `None` if the background task has stopped.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&ResourceState<T>) -> bool,
    ) -> Option<ResourceState<T>> {
        let snapshot = self
            .snapshot
            .wait_for(|snapshot| predicate(&snapshot.state))
            .await
            .ok()?;
        Some(snapshot.state.clone())
    }

    /// Waits until fetch number `generation` (or a later one) has settled.
    ///
    /// Returns `None` if the background task has stopped.
    pub async fn wait_settled(&mut self, generation: u64) -> Option<ResourceState<T>> {
        let snapshot = self
            .snapshot
            .wait_for(|snapshot| snapshot.generation >= generation && snapshot.state.is_settled())
            .await
            .ok()?;
        Some(snapshot.state.clone())
    }
}

impl<T> Drop for ResourceWatcher<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl<T> fmt::Debug for ResourceWatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot.borrow();
        let state = match snapshot.state {
            ResourceState::Idle => "idle",
            ResourceState::Loading => "loading",
            ResourceState::Ready(_) => "ready",
            ResourceState::Failed(_) => "failed",
        };
        f.debug_struct("ResourceWatcher")
            .field("generation", &snapshot.generation)
            .field("state", &state)
            .field("running", &!self.task.is_finished())
            .finish()
    }
}

/// Something the background task must react to.
enum Signal<D> {
    Refetch,
    Invalidated(ResourceKey),
    Lagged(u64),
    Dependency(Option<D>),
    Nothing,
    Shutdown,
}

/// The inputs a watcher task listens on.
struct Signals<D> {
    refetch: mpsc::UnboundedReceiver<()>,
    invalidations: broadcast::Receiver<Invalidation>,
    dependency: watch::Receiver<Option<D>>,
    bus_open: bool,
    dependency_open: bool,
}

impl<D: Clone> Signals<D> {
    async fn next(&mut self) -> Signal<D> {
        tokio::select! {
            msg = self.refetch.recv() => match msg {
                Some(()) => Signal::Refetch,
                None => Signal::Shutdown,
            },
            notice = self.invalidations.recv(), if self.bus_open => match notice {
                Ok(notice) => Signal::Invalidated(notice.key),
                Err(broadcast::error::RecvError::Lagged(skipped)) => Signal::Lagged(skipped),
                Err(broadcast::error::RecvError::Closed) => {
                    self.bus_open = false;
                    Signal::Nothing
                }
            },
            changed = self.dependency.changed(), if self.dependency_open => match changed {
                Ok(()) => Signal::Dependency(self.dependency.borrow_and_update().clone()),
                Err(_) => {
                    self.dependency_open = false;
                    Signal::Nothing
                }
            },
        }
    }
}

/// Outcome of one wait in the background loop.
enum Step<T, D> {
    Fetched(Result<T, ClientError>),
    Signal(Signal<D>),
}

/// Background loop of a [`ResourceWatcher`].
async fn run<T, D, K>(
    mut signals: Signals<D>,
    snapshot: watch::Sender<ResourceSnapshot<T>>,
    key_of: K,
    fetch: impl Fn(D) -> FetchFuture<T>,
) where
    T: Clone,
    D: Clone + PartialEq,
    K: Fn(&D) -> ResourceKey,
{
    let mut current = signals.dependency.borrow_and_update().clone();
    let mut pending = current.is_some();
    let mut generation = 0_u64;
    let mut in_flight: Option<(ResourceKey, FetchFuture<T>)> = None;

    loop {
        if pending {
            pending = false;
            if let Some(dep) = &current {
                if let Some((key, _)) = in_flight.take() {
                    tracing::trace!(resource = key.kind_str(), generation, "in-flight fetch superseded");
                }
                generation += 1;
                let key = key_of(dep);
                tracing::debug!(resource = key.kind_str(), ?key, generation, "fetch");
                snapshot.send_replace(ResourceSnapshot {
                    generation,
                    state: ResourceState::Loading,
                });
                in_flight = Some((key, fetch(dep.clone())));
            }
        }

        // Signals that neither demand a new fetch nor clear the dependency
        // leave the in-flight request running.
        let step = match in_flight.as_mut() {
            Some((_, request)) => tokio::select! {
                result = request => Step::Fetched(result),
                signal = signals.next() => Step::Signal(signal),
            },
            None => Step::Signal(signals.next().await),
        };

        let signal = match step {
            Step::Fetched(result) => {
                let state = match result {
                    Ok(data) => ResourceState::Ready(data),
                    Err(err) => {
                        if let Some((key, _)) = &in_flight {
                            tracing::warn!(resource = key.kind_str(), ?key, error = %err, "fetch failed");
                        }
                        ResourceState::Failed(err.to_string())
                    }
                };
                in_flight = None;
                snapshot.send_replace(ResourceSnapshot { generation, state });
                continue;
            }
            Step::Signal(signal) => signal,
        };

        match signal {
            Signal::Refetch => pending = true,
            Signal::Invalidated(key) => {
                pending = current.as_ref().is_some_and(|dep| key_of(dep) == key);
            }
            Signal::Lagged(skipped) => {
                tracing::warn!(skipped, "resource watcher lagged behind invalidation bus");
                pending = true;
            }
            Signal::Dependency(next) => {
                if next != current {
                    current = next;
                    pending = current.is_some();
                    if current.is_none() {
                        in_flight = None;
                        snapshot.send_replace(ResourceSnapshot {
                            generation,
                            state: ResourceState::Idle,
                        });
                    }
                }
            }
            Signal::Nothing => {}
            Signal::Shutdown => break,
        }
    }
}
