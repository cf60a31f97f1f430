use serde::{Deserialize, Serialize};

use super::page::Page;
use super::track::FullTrack;

/// [search for item](https://developer.spotify.com/documentation/web-api/reference/search)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchTracks {
    pub tracks: Page<FullTrack>,
}
