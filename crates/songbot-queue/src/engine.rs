use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use common::backoff::Retry;
use common::words;
use parking_lot::Mutex;
use thiserror::Error;

use crate::device::DeviceActivator;
use crate::entry::{Queue, QueueEntry};
use crate::gate::ContentGate;
use crate::resolver::{Resolution, Track, TrackResolver};
use crate::services::{Announcer, Catalog, Classifier};
use crate::store::QueueStore;

/// How committing a resolved track to the player is retried.
const COMMIT: Retry = Retry::exponential(5, Duration::from_secs(2));

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Channel announcements are sent to.
    pub channel: String,
    /// Maximum number of queued requests, zero for no limit.
    pub max_queue_length: usize,
    /// Maximum number of queued requests per user, zero for no limit.
    pub max_requests_per_user: usize,
    /// Drop an entry once it has been requeued more than this many times.
    pub max_requeues: Option<u32>,
    /// Name of the device to prefer when activating one.
    pub device: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Added {
    /// One-based position in the queue.
    pub position: usize,
    /// The sanitized request as stored.
    pub request: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddError {
    #[error("Request is empty")]
    Empty,
    #[error("Request is already queued at position #{position}")]
    Duplicate { position: usize },
    #[error("Queue is full")]
    QueueFull,
    #[error("User already has {0} queued request(s)")]
    TooManyUserRequests(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoveError {
    #[error("No request at position #{position}, the queue has {len}")]
    InvalidPosition { position: usize, len: usize },
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// There was nothing to do.
    Idle,
    /// The head was committed to the player.
    Queued(Track),
    /// The head was blocked and removed.
    Rejected,
    /// Nothing matched the head, it was removed.
    NotFound,
    /// The head failed transiently and was moved to the back.
    Requeued,
    /// The head failed too many times and was dropped.
    Parked,
    /// The head was removed by someone else while it was being processed.
    Gone,
}

struct Inner {
    queue: Mutex<Queue>,
    store: QueueStore,
    resolver: TrackResolver,
    activator: DeviceActivator,
    catalog: Arc<dyn Catalog>,
    announcer: Arc<dyn Announcer>,
    config: EngineConfig,
    /// Held for the duration of a tick.
    ticking: tokio::sync::Mutex<()>,
}

/// The request queue and the logic draining it.
///
/// Cheap to clone. Queue modifications are serialized and persisted before
/// they're visible to callers.
#[derive(Clone)]
pub struct QueueEngine {
    inner: Arc<Inner>,
}

impl QueueEngine {
    /// Construct a new engine, loading the queue from `store`.
    pub fn new(
        store: QueueStore,
        catalog: Arc<dyn Catalog>,
        classifier: Arc<dyn Classifier>,
        announcer: Arc<dyn Announcer>,
        config: EngineConfig,
    ) -> Self {
        let queue = store.load();
        let gate = ContentGate::new(classifier);

        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(queue),
                store,
                resolver: TrackResolver::new(catalog.clone(), gate),
                activator: DeviceActivator::new(catalog.clone(), config.device.clone()),
                catalog,
                announcer,
                config,
                ticking: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Add a request to the back of the queue.
    pub fn add(&self, user: &str, text: &str) -> Result<Added, AddError> {
        let request = words::sanitize(text);
        let key = words::normalize(&request);

        if key.is_empty() {
            return Err(AddError::Empty);
        }

        let config = &self.inner.config;
        let mut queue = self.inner.queue.lock();

        if let Some(index) = queue.position(&key) {
            return Err(AddError::Duplicate { position: index + 1 });
        }

        if config.max_queue_length > 0 && queue.len() >= config.max_queue_length {
            return Err(AddError::QueueFull);
        }

        if config.max_requests_per_user > 0 {
            let count = queue.count_by(user);

            if count >= config.max_requests_per_user {
                return Err(AddError::TooManyUserRequests(count));
            }
        }

        let entry = QueueEntry::new(user, request.as_str(), Utc::now());

        let index = queue
            .push_back(entry)
            .map_err(|index| AddError::Duplicate { position: index + 1 })?;

        self.persist(&queue);
        tracing::info!("{} requested {:?} (#{})", user, request, index + 1);

        Ok(Added {
            position: index + 1,
            request,
        })
    }

    /// Snapshot of the queue, front to back.
    pub fn list(&self) -> Vec<QueueEntry> {
        self.inner.queue.lock().iter().cloned().collect()
    }

    /// Remove every request, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut queue = self.inner.queue.lock();
        let removed = queue.clear();
        self.persist(&queue);
        removed
    }

    /// Remove the request at the given one-based position.
    pub fn remove_at(&self, position: usize) -> Result<QueueEntry, RemoveError> {
        let mut queue = self.inner.queue.lock();
        let len = queue.len();

        let entry = position
            .checked_sub(1)
            .and_then(|index| queue.remove_at(index))
            .ok_or(RemoveError::InvalidPosition { position, len })?;

        self.persist(&queue);
        Ok(entry)
    }

    /// The track currently playing on the player.
    pub async fn current(&self) -> Result<Option<Track>> {
        self.inner.catalog.currently_playing().await
    }

    /// Save the queue once any tick in progress has finished.
    pub async fn save(&self) {
        let _guard = self.inner.ticking.lock().await;
        let queue = self.inner.queue.lock();
        self.persist(&queue);
    }

    /// Process the head of the queue.
    ///
    /// At most one tick runs at a time. A concurrent call waits for the
    /// running one to finish.
    #[tracing::instrument(skip_all)]
    pub async fn tick(&self) -> Outcome {
        let _guard = self.inner.ticking.lock().await;

        let head = self.inner.queue.lock().front().cloned();

        let Some(entry) = head else {
            return Outcome::Idle;
        };

        tracing::trace!("Processing {:?} from {}", entry.request, entry.user);

        let resolution = match self.inner.resolver.resolve(&entry.request).await {
            Ok(resolution) => resolution,
            Err(e) => {
                common::log_warn!(e, "Failed to resolve {:?}", entry.request);

                return self
                    .requeue_and_announce(&entry, &format!("\"{}\"", entry.request))
                    .await;
            }
        };

        match resolution {
            Resolution::Track(track) => self.commit(&entry, track).await,
            Resolution::Rejected(rejection) => {
                self.remove(&entry);
                self.announce(&entry.user, rejection.message()).await;
                Outcome::Rejected
            }
            Resolution::NotFound => {
                self.remove(&entry);

                let m = format!(
                    "Could not find a track matching \"{}\", sorry :(",
                    entry.request
                );

                self.announce(&entry.user, &m).await;
                Outcome::NotFound
            }
        }
    }

    /// Move the head of the queue to the back.
    ///
    /// Used to recover when a tick is lost without producing an outcome.
    pub fn requeue_head(&self) -> Outcome {
        let head = self.inner.queue.lock().front().cloned();

        match head {
            Some(entry) => self.requeue(&entry),
            None => Outcome::Idle,
        }
    }

    async fn commit(&self, entry: &QueueEntry, track: Track) -> Outcome {
        let uri = track.uri.as_str();

        let queued = COMMIT
            .run("Queueing track", |_| self.enqueue(uri), |_: &()| true)
            .await;

        if queued.is_none() {
            return self.requeue_and_announce(entry, &track.to_string()).await;
        }

        self.remove(entry);
        tracing::info!("Queued {} for {}", track, entry.user);
        self.announce(&entry.user, &format!("Queued {}!", track)).await;
        Outcome::Queued(track)
    }

    async fn enqueue(&self, uri: &str) -> Result<()> {
        let device = self.inner.activator.ensure_active_device().await?;
        self.inner.catalog.add_to_queue(uri, Some(&device.id)).await
    }

    async fn requeue_and_announce(&self, entry: &QueueEntry, what: &str) -> Outcome {
        let outcome = self.requeue(entry);

        let m = match outcome {
            Outcome::Requeued => format!(
                "Couldn't queue {} right now, it has been moved to the back of the queue.",
                what
            ),
            Outcome::Parked => format!(
                "Couldn't queue {} after {} tries, giving up on it. Sorry :(",
                what,
                entry.failures + 1
            ),
            _ => return outcome,
        };

        self.announce(&entry.user, &m).await;
        outcome
    }

    /// Move the entry to the back of the queue, or drop it once it has been
    /// requeued too many times.
    fn requeue(&self, entry: &QueueEntry) -> Outcome {
        let key = entry.key();
        let mut queue = self.inner.queue.lock();

        let count_failure = self.inner.config.max_requeues.is_some();

        let Some(failures) = queue.requeue(&key, count_failure) else {
            return Outcome::Gone;
        };

        let outcome = match self.inner.config.max_requeues {
            Some(max) if failures > max => {
                queue.remove_key(&key);
                tracing::warn!("Dropping {:?} after {} failures", entry.request, failures);
                Outcome::Parked
            }
            _ => Outcome::Requeued,
        };

        self.persist(&queue);
        outcome
    }

    fn remove(&self, entry: &QueueEntry) {
        let mut queue = self.inner.queue.lock();

        if queue.remove_key(&entry.key()).is_some() {
            self.persist(&queue);
        }
    }

    fn persist(&self, queue: &Queue) {
        if let Err(e) = self.inner.store.save(queue) {
            common::log_error!(e, "Failed to save queue");
        }
    }

    async fn announce(&self, user: &str, m: &str) {
        let text = format!("{} -> {}", user, m);
        self.inner.announcer.send(&self.inner.config.channel, &text).await;
    }
}
