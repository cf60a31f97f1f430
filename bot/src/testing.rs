//! Collaborators for exercising command handlers.

use anyhow::Result;
use async_trait::async_trait;
use common::models::spotify::track::FullTrack;
use parking_lot::Mutex;
use queue::{Announcer, Catalog, Classifier, Device, Track};

/// Records the text of every announcement.
#[derive(Default)]
pub(crate) struct RecordingAnnouncer {
    messages: Mutex<Vec<String>>,
}

impl RecordingAnnouncer {
    pub(crate) fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl Announcer for RecordingAnnouncer {
    async fn send(&self, _: &str, text: &str) {
        self.messages.lock().push(text.to_owned());
    }
}

/// A catalog with nothing in it and nothing playing.
#[derive(Default)]
pub(crate) struct StaticCatalog;

#[async_trait]
impl Catalog for StaticCatalog {
    async fn search_tracks(&self, _: &str, _: u32) -> Result<Vec<FullTrack>> {
        Ok(Vec::new())
    }

    async fn devices(&self) -> Result<Vec<Device>> {
        Ok(Vec::new())
    }

    async fn transfer_playback(&self, _: &str, _: bool) -> Result<()> {
        Ok(())
    }

    async fn add_to_queue(&self, _: &str, _: Option<&str>) -> Result<()> {
        Ok(())
    }

    async fn currently_playing(&self) -> Result<Option<Track>> {
        Ok(None)
    }
}

pub(crate) struct AllowAll;

#[async_trait]
impl Classifier for AllowAll {
    async fn generate_response(&self, _: &str) -> Result<String> {
        Ok(String::from("false"))
    }
}
