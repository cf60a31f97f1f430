use std::time::Duration;

use anyhow::Result;
use tokio::time::{self, MissedTickBehavior};

use crate::engine::{Outcome, QueueEngine};

/// Drives [QueueEngine::tick] on a fixed interval.
pub struct Scheduler {
    engine: QueueEngine,
    interval: Duration,
}

impl Scheduler {
    pub fn new(engine: QueueEngine, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Run forever, ticking once right away and then once per interval.
    ///
    /// A tick that overruns the interval delays the next one rather than
    /// causing a burst. A tick which panics has its head entry moved to the
    /// back of the queue.
    #[tracing::instrument(skip_all, fields(interval = ?self.interval))]
    pub async fn run(self) -> Result<()> {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            self.tick().await;
        }
    }

    async fn tick(&self) -> Outcome {
        let engine = self.engine.clone();

        match tokio::spawn(async move { engine.tick().await }).await {
            Ok(outcome) => {
                tracing::trace!(?outcome, "Tick done");
                outcome
            }
            Err(e) => {
                common::log_error!(e, "Tick failed");
                self.engine.requeue_head()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::Scheduler;
    use crate::engine::{EngineConfig, QueueEngine};
    use crate::store::QueueStore;
    use crate::testing::{device, track, FakeCatalog, FakeClassifier, RecordingAnnouncer};

    #[tokio::test(start_paused = true)]
    async fn test_ticks_on_interval() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(FakeCatalog::new());
        catalog.set_results([track("Song A", "Band"), track("Song B", "Band")]);
        catalog.set_devices([device("d1", "Phone", true)]);

        let engine = QueueEngine::new(
            QueueStore::new(dir.path().join("queue.json")),
            catalog.clone(),
            Arc::new(FakeClassifier::allowing()),
            Arc::new(RecordingAnnouncer::default()),
            EngineConfig::default(),
        );

        engine.add("alice", "Song A").unwrap();
        engine.add("bob", "Song B").unwrap();

        let task = tokio::spawn(Scheduler::new(engine.clone(), Duration::from_secs(30)).run());

        // The first tick runs right away.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(catalog.queued().len(), 1);
        assert_eq!(engine.list().len(), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(catalog.queued().len(), 2);
        assert!(engine.list().is_empty());

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_tick_requeues_head() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(FakeCatalog::new());
        catalog.panic_searches(true);
        catalog.set_results([track("One", "Band")]);
        catalog.set_devices([device("d1", "Phone", true)]);

        let engine = QueueEngine::new(
            QueueStore::new(dir.path().join("queue.json")),
            catalog.clone(),
            Arc::new(FakeClassifier::allowing()),
            Arc::new(RecordingAnnouncer::default()),
            EngineConfig::default(),
        );

        engine.add("alice", "One").unwrap();
        engine.add("bob", "Two").unwrap();

        let task = tokio::spawn(Scheduler::new(engine.clone(), Duration::from_secs(30)).run());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(requests(&engine), ["Two", "One"]);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(requests(&engine), ["One", "Two"]);
        assert!(!task.is_finished());

        // The next tick only runs if the panicking ones let go of the tick guard.
        catalog.panic_searches(false);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(catalog.queued().len(), 1);
        assert_eq!(requests(&engine), ["Two"]);

        task.abort();
    }

    fn requests(engine: &QueueEngine) -> Vec<String> {
        engine.list().into_iter().map(|e| e.request).collect()
    }
}
