//! In-memory stand-ins for the external services.

use anyhow::{bail, Result};
use async_trait::async_trait;
use common::models::spotify::artist::SimplifiedArtist;
use common::models::spotify::track::FullTrack;
use common::words;
use parking_lot::Mutex;

use crate::device::Device;
use crate::resolver::Track;
use crate::services::{Announcer, Catalog, Classifier};

/// Construct a catalog track with a single artist.
pub(crate) fn track(name: &str, artist: &str) -> FullTrack {
    let id = words::normalize(&format!("{name} {artist}")).replace(' ', "-");

    FullTrack {
        artists: vec![SimplifiedArtist {
            id: None,
            name: artist.to_owned(),
            uri: None,
        }],
        duration_ms: 180_000,
        explicit: false,
        uri: format!("spotify:track:{id}"),
        id: Some(id),
        is_playable: None,
        name: name.to_owned(),
    }
}

pub(crate) fn device(id: &str, name: &str, is_active: bool) -> Device {
    Device {
        id: id.to_owned(),
        name: name.to_owned(),
        is_active,
    }
}

#[derive(Default)]
struct CatalogState {
    results: Vec<FullTrack>,
    fail_searches: bool,
    panic_searches: bool,
    searches: Vec<String>,
    devices: Vec<Device>,
    device_listings: usize,
    transfers: Vec<(String, bool)>,
    fail_transfers: bool,
    ignore_transfers: bool,
    queued: Vec<(String, Option<String>)>,
    fail_next_queues: usize,
    playing: Option<FullTrack>,
}

/// A catalog which answers every search with the same results and keeps
/// track of what was asked of it.
#[derive(Default)]
pub(crate) struct FakeCatalog {
    state: Mutex<CatalogState>,
}

impl FakeCatalog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_results(&self, results: impl IntoIterator<Item = FullTrack>) {
        self.state.lock().results = results.into_iter().collect();
    }

    pub(crate) fn fail_searches(&self, fail: bool) {
        self.state.lock().fail_searches = fail;
    }

    /// Make every search panic, like an unexpected bug would.
    pub(crate) fn panic_searches(&self, panic: bool) {
        self.state.lock().panic_searches = panic;
    }

    pub(crate) fn searches(&self) -> Vec<String> {
        self.state.lock().searches.clone()
    }

    pub(crate) fn set_devices(&self, devices: impl IntoIterator<Item = Device>) {
        self.state.lock().devices = devices.into_iter().collect();
    }

    pub(crate) fn device_listings(&self) -> usize {
        self.state.lock().device_listings
    }

    pub(crate) fn transfers(&self) -> Vec<(String, bool)> {
        self.state.lock().transfers.clone()
    }

    pub(crate) fn fail_transfers(&self, fail: bool) {
        self.state.lock().fail_transfers = fail;
    }

    /// Accept transfers without ever activating the device.
    pub(crate) fn ignore_transfers(&self, ignore: bool) {
        self.state.lock().ignore_transfers = ignore;
    }

    pub(crate) fn queued(&self) -> Vec<(String, Option<String>)> {
        self.state.lock().queued.clone()
    }

    pub(crate) fn fail_next_queues(&self, count: usize) {
        self.state.lock().fail_next_queues = count;
    }

    pub(crate) fn set_playing(&self, track: Option<FullTrack>) {
        self.state.lock().playing = track;
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<FullTrack>> {
        let mut state = self.state.lock();
        state.searches.push(query.to_owned());

        if state.panic_searches {
            drop(state);
            panic!("search exploded");
        }

        if state.fail_searches {
            bail!("search unavailable");
        }

        Ok(state.results.iter().take(limit as usize).cloned().collect())
    }

    async fn devices(&self) -> Result<Vec<Device>> {
        let mut state = self.state.lock();
        state.device_listings += 1;
        Ok(state.devices.clone())
    }

    async fn transfer_playback(&self, device_id: &str, play: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.transfers.push((device_id.to_owned(), play));

        if state.fail_transfers {
            bail!("transfer failed");
        }

        if !state.ignore_transfers {
            for device in &mut state.devices {
                device.is_active = device.id == device_id;
            }
        }

        Ok(())
    }

    async fn add_to_queue(&self, track_uri: &str, device_id: Option<&str>) -> Result<()> {
        let mut state = self.state.lock();

        if state.fail_next_queues > 0 {
            state.fail_next_queues -= 1;
            bail!("player unavailable");
        }

        state
            .queued
            .push((track_uri.to_owned(), device_id.map(str::to_owned)));
        Ok(())
    }

    async fn currently_playing(&self) -> Result<Option<Track>> {
        Ok(self.state.lock().playing.as_ref().map(Track::from_full))
    }
}

enum Mode {
    /// Flag requests containing any of the given strings.
    Flagging(Vec<String>),
    Failing,
    Replying(String),
}

/// A classifier with canned behavior.
pub(crate) struct FakeClassifier {
    mode: Mode,
    prompts: Mutex<Vec<String>>,
}

impl FakeClassifier {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn allowing() -> Self {
        Self::new(Mode::Flagging(Vec::new()))
    }

    pub(crate) fn flagging<const N: usize>(needles: [&str; N]) -> Self {
        Self::new(Mode::Flagging(needles.iter().map(|n| (*n).to_owned()).collect()))
    }

    pub(crate) fn failing() -> Self {
        Self::new(Mode::Failing)
    }

    pub(crate) fn replying(reply: &str) -> Self {
        Self::new(Mode::Replying(reply.to_owned()))
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl Classifier for FakeClassifier {
    async fn generate_response(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_owned());

        // Only look at the screened text, not the instructions.
        let text = prompt.rsplit("Request: ").next().unwrap_or(prompt);

        match &self.mode {
            Mode::Flagging(needles) => {
                let flagged = needles.iter().any(|n| text.contains(n.as_str()));
                Ok(flagged.to_string())
            }
            Mode::Failing => bail!("classifier unavailable"),
            Mode::Replying(reply) => Ok(reply.clone()),
        }
    }
}

/// Records every announcement.
#[derive(Default)]
pub(crate) struct RecordingAnnouncer {
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingAnnouncer {
    pub(crate) fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl Announcer for RecordingAnnouncer {
    async fn send(&self, channel: &str, text: &str) {
        self.messages
            .lock()
            .push((channel.to_owned(), text.to_owned()));
    }
}
