use serde::{Deserialize, Serialize};

/// [paging object](https://developer.spotify.com/documentation/web-api/concepts/api-calls#pagination)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub total: u32,
}
