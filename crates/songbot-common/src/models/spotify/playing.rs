use serde::{Deserialize, Serialize};

use super::track::FullTrack;

/// [get currently playing track](https://developer.spotify.com/documentation/web-api/reference/get-the-users-currently-playing-track)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Playing {
    #[serde(default)]
    pub progress_ms: Option<u32>,
    #[serde(default)]
    pub is_playing: bool,
    /// Absent for ads and while nothing is loaded.
    #[serde(default)]
    pub item: Option<FullTrack>,
}
