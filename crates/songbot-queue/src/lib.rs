//! The song request queue and everything needed to drain it into a player.
//!
//! Requests are accepted into a [QueueEngine], persisted through a
//! [QueueStore], and committed to the player one at a time by the
//! [Scheduler]. The external services involved sit behind the [Catalog],
//! [Classifier] and [Announcer] traits.

mod device;
pub use self::device::{Device, DeviceActivator, DeviceError};

mod engine;
pub use self::engine::{AddError, Added, EngineConfig, Outcome, QueueEngine, RemoveError};

mod entry;
pub use self::entry::{Queue, QueueEntry};

mod gate;
pub use self::gate::{ContentGate, Rejection, Verdict};

mod resolver;
pub use self::resolver::{Resolution, Track, TrackResolver};

mod scheduler;
pub use self::scheduler::Scheduler;

mod services;
pub use self::services::{Announcer, Catalog, Classifier};

mod store;
pub use self::store::{QueueStore, StoreError};

#[cfg(test)]
mod testing;
