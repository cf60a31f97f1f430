use anyhow::{bail, Result};
use async_trait::async_trait;
use common::models::spotify::track::FullTrack;

use crate::device::Device;
use crate::resolver::Track;

/// The music catalog and the player attached to it.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Search for tracks matching the given query.
    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<FullTrack>>;

    /// List the playback devices available to the account.
    async fn devices(&self) -> Result<Vec<Device>>;

    /// Transfer playback to the given device.
    async fn transfer_playback(&self, device_id: &str, play: bool) -> Result<()>;

    /// Append a track to the player's own queue.
    async fn add_to_queue(&self, track_uri: &str, device_id: Option<&str>) -> Result<()>;

    /// The track that is currently playing, if any.
    async fn currently_playing(&self) -> Result<Option<Track>>;
}

/// A text completion service.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Generate a response for the given prompt.
    async fn generate_response(&self, prompt: &str) -> Result<String>;
}

/// Somewhere to post chat messages.
///
/// Delivery is best effort, implementations log their own failures.
#[async_trait]
pub trait Announcer: Send + Sync {
    /// Send a message to the given channel.
    async fn send(&self, channel: &str, text: &str);
}

#[async_trait]
impl Catalog for api::Spotify {
    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<FullTrack>> {
        Ok(self.search_track(query, limit).await?.tracks.items)
    }

    async fn devices(&self) -> Result<Vec<Device>> {
        let devices = self.my_player_devices().await?;

        Ok(devices
            .into_iter()
            .filter_map(|d| {
                Some(Device {
                    id: d.id?,
                    name: d.name,
                    is_active: d.is_active,
                })
            })
            .collect())
    }

    async fn transfer_playback(&self, device_id: &str, play: bool) -> Result<()> {
        if !self.me_player_transfer(device_id, play).await? {
            bail!("No device with id `{}`", device_id);
        }

        Ok(())
    }

    async fn add_to_queue(&self, track_uri: &str, device_id: Option<&str>) -> Result<()> {
        if !self.me_player_queue(device_id, track_uri).await? {
            bail!("No active device to queue `{}` on", track_uri);
        }

        Ok(())
    }

    async fn currently_playing(&self) -> Result<Option<Track>> {
        let playing = self.me_player_currently_playing().await?;
        Ok(playing.and_then(|p| p.item).map(|t| Track::from_full(&t)))
    }
}

#[async_trait]
impl Classifier for api::OpenAi {
    async fn generate_response(&self, prompt: &str) -> Result<String> {
        api::OpenAi::generate_response(self, prompt).await
    }
}
