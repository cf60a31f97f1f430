use serde::{Deserialize, Serialize};

use super::artist::SimplifiedArtist;

/// [track object](https://developer.spotify.com/documentation/web-api/reference/get-track)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullTrack {
    pub artists: Vec<SimplifiedArtist>,
    #[serde(default)]
    pub duration_ms: u32,
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_playable: Option<bool>,
    pub name: String,
    pub uri: String,
}

impl FullTrack {
    /// The first credited artist, which Spotify treats as the primary one.
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(|a| a.name.as_str())
    }
}
