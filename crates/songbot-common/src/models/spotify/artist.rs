use serde::{Deserialize, Serialize};

/// [artist object simplified](https://developer.spotify.com/documentation/web-api/reference/get-track)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplifiedArtist {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub uri: Option<String>,
}
