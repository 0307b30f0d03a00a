//! Holder of the latest weather fetch outcome.
//!
//! [`WeatherResultStore`] owns a single [`FetchState`] cell. Every call to
//! [`WeatherResultStore::request_update`] gets a fresh [`RequestId`], flips the
//! cell to `Loading` before returning and runs the fetch on the tokio runtime.
//! Only the most recently issued request may commit its result; a newer call
//! cancels the older fetch and late completions are dropped.
//!
//! Consumers either read the cell synchronously, register an observer with
//! [`WeatherResultStore::subscribe`] (every transition, in order), or take a
//! [`tokio::sync::watch::Receiver`] from [`WeatherResultStore::watch`] (latest
//! value only).

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{client::WeatherClient, state::FetchState};

/// Identity of one `request_update` call. Later calls get larger ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Inner {
    client: Arc<dyn WeatherClient>,
    api_key: String,
    state: watch::Sender<FetchState>,
    /// Id of the latest issued request, 0 before the first one.
    /// Only written while holding the `state` write lock.
    issued: AtomicU64,
    in_flight: Mutex<Option<CancellationToken>>,
    observers: Mutex<HashMap<u64, mpsc::UnboundedSender<FetchState>>>,
    next_observer: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    /// Queue `state` for every observer, dropping the ones whose task is gone.
    fn broadcast(&self, state: &FetchState) {
        lock(&self.observers).retain(|_, tx| tx.send(state.clone()).is_ok());
    }

    /// Write `next` if `id` is still the latest request.
    fn commit(&self, id: RequestId, next: FetchState) -> bool {
        self.state.send_if_modified(|state| {
            if self.issued.load(Ordering::SeqCst) != id.0 {
                return false;
            }
            *state = next;
            self.broadcast(state);
            true
        })
    }
}

/// Observable store of the latest [`FetchState`]. Clones share the same cell.
#[derive(Clone)]
pub struct WeatherResultStore {
    inner: Arc<Inner>,
}

impl WeatherResultStore {
    pub fn new(client: Arc<dyn WeatherClient>, api_key: impl Into<String>) -> Self {
        let (state, _) = watch::channel(FetchState::Idle);
        Self {
            inner: Arc::new(Inner {
                client,
                api_key: api_key.into(),
                state,
                issued: AtomicU64::new(0),
                in_flight: Mutex::new(None),
                observers: Mutex::new(HashMap::new()),
                next_observer: AtomicU64::new(0),
            }),
        }
    }

    /// Start fetching weather for `city`.
    ///
    /// The state is `Loading` by the time this returns. Any fetch still in
    /// flight from an earlier call is cancelled and can no longer commit.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn request_update(&self, city: impl Into<String>) -> PendingRequest {
        let city = city.into();
        let token = CancellationToken::new();
        let mut id = RequestId(0);

        self.inner.state.send_if_modified(|state| {
            id = RequestId(self.inner.issued.fetch_add(1, Ordering::SeqCst) + 1);
            if let Some(previous) = lock(&self.inner.in_flight).replace(token.clone()) {
                previous.cancel();
            }
            *state = FetchState::Loading;
            self.inner.broadcast(state);
            true
        });
        debug!(request = %id, city = %city, "weather update requested");

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => {
                    debug!(request = %id, "superseded before completion");
                    return;
                }
                outcome = inner.client.fetch(&inner.api_key, &city) => outcome,
            };

            let next = match outcome {
                Ok(record) => FetchState::Success(record),
                Err(err) => {
                    warn!(request = %id, city = %city, error = %err, "weather fetch failed");
                    FetchState::Error(err.to_string())
                }
            };

            if !inner.commit(id, next) {
                debug!(request = %id, "discarding stale completion");
            }
        });

        PendingRequest { id, task }
    }

    pub fn current_state(&self) -> FetchState {
        self.inner.state.borrow().clone()
    }

    /// Id of the most recent `request_update` call, if any.
    pub fn latest_request(&self) -> Option<RequestId> {
        match self.inner.issued.load(Ordering::SeqCst) {
            0 => None,
            id => Some(RequestId(id)),
        }
    }

    /// Single-value view of the state; intermediate transitions may be skipped.
    pub fn watch(&self) -> watch::Receiver<FetchState> {
        self.inner.state.subscribe()
    }

    /// Register `observer`. It is called with the current state right away and
    /// then once per transition, in order, from a tokio task.
    ///
    /// Delivery stops when the returned [`Subscription`] is dropped.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&FetchState) + Send + Sync + 'static,
    {
        let id = self.inner.next_observer.fetch_add(1, Ordering::SeqCst);
        let (tx, mut rx) = mpsc::unbounded_channel();

        // Registering under the state lock keeps the initial snapshot ordered
        // before any transition queued afterwards.
        self.inner.state.send_if_modified(|state| {
            let _ = tx.send(state.clone());
            lock(&self.inner.observers).insert(id, tx);
            false
        });

        let task = tokio::spawn(async move {
            while let Some(state) = rx.recv().await {
                observer(&state);
            }
        });

        Subscription { id, store: Arc::downgrade(&self.inner), task }
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.inner.observers).len()
    }
}

impl fmt::Debug for WeatherResultStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherResultStore")
            .field("client", &self.inner.client)
            .field("state", &*self.inner.state.borrow())
            .field("latest_request", &self.latest_request())
            .finish_non_exhaustive()
    }
}

/// Handle to a spawned fetch.
#[derive(Debug)]
pub struct PendingRequest {
    id: RequestId,
    task: JoinHandle<()>,
}

impl PendingRequest {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Wait until the fetch has committed, been discarded or been cancelled.
    pub async fn wait(self) {
        if self.task.await.is_err_and(|err| err.is_panic()) {
            warn!(request = %self.id, "weather fetch task panicked");
        }
    }
}

/// Keeps an observer registered; dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    store: Weak<Inner>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.store.upgrade() {
            lock(&inner.observers).remove(&self.id);
        }
        self.task.abort();
    }
}
