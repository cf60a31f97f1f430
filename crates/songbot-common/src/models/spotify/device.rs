use serde::{Deserialize, Serialize};

/// [get a users available devices](https://developer.spotify.com/documentation/web-api/reference/get-a-users-available-devices)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Spotify may report devices without an id, those can't be controlled.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_restricted: bool,
    pub name: String,
    #[serde(rename = "type", default)]
    pub device_type: String,
    #[serde(default)]
    pub volume_percent: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DevicePayload {
    pub devices: Vec<Device>,
}
