//! Spotify API helpers.

use anyhow::Result;
use common::models::spotify::device::{Device, DevicePayload};
use common::models::spotify::playing::Playing;
use common::models::spotify::search::SearchTracks;
use reqwest::{header, Client, Method, StatusCode};
use serde::Serialize;
use url::Url;

use crate::base::RequestBuilder;
use crate::token::Token;

const API_URL: &str = "https://api.spotify.com/v1";

/// API integration.
#[derive(Clone, Debug)]
pub struct Spotify {
    user_agent: &'static str,
    token: Token,
    client: Client,
    api_url: Url,
}

impl Spotify {
    /// Create a new API integration.
    pub fn new(user_agent: &'static str, token: Token) -> Result<Spotify> {
        Ok(Spotify {
            user_agent,
            token,
            client: Client::new(),
            api_url: str::parse::<Url>(API_URL)?,
        })
    }

    /// Get request against API.
    fn request<I>(&self, method: Method, path: I) -> RequestBuilder<'_>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.api_url.clone();

        if let Ok(mut p) = url.path_segments_mut() {
            p.extend(path);
        }

        let mut req = RequestBuilder::new(&self.client, self.user_agent, method, url);
        req.token(&self.token);
        req
    }

    /// Get my devices.
    pub async fn my_player_devices(&self) -> Result<Vec<Device>> {
        let req = self.request(Method::GET, &["me", "player", "devices"]);
        let payload = req.execute().await?.json::<DevicePayload>()?;
        Ok(payload.devices)
    }

    /// Transfer playback to the given device.
    ///
    /// With `play` unset, the device takes over in whatever state playback
    /// was in, which keeps a paused stream paused.
    pub async fn me_player_transfer(&self, device_id: &str, play: bool) -> Result<bool> {
        let body = serde_json::to_vec(&Request {
            device_ids: [device_id],
            play,
        })?;

        let mut req = self.request(Method::PUT, &["me", "player"]);
        req.header(header::ACCEPT, "application/json")
            .json_body(body);

        return req.json_map(device_control).await;

        #[derive(Serialize)]
        struct Request<'a> {
            device_ids: [&'a str; 1],
            play: bool,
        }
    }

    /// Enqueue the specified track.
    pub async fn me_player_queue(&self, device_id: Option<&str>, track_uri: &str) -> Result<bool> {
        let mut req = self.request(Method::POST, &["me", "player", "queue"]);

        if let Some(device_id) = device_id {
            req.query_param("device_id", device_id);
        }

        req.query_param("uri", track_uri)
            .header(header::ACCEPT, "application/json")
            .empty_body();

        req.json_map(device_control).await
    }

    /// The track currently playing, if any.
    pub async fn me_player_currently_playing(&self) -> Result<Option<Playing>> {
        let req = self.request(Method::GET, &["me", "player", "currently-playing"]);

        req.execute()
            .await?
            .empty_on_status(StatusCode::NO_CONTENT)
            .json()
    }

    /// Search for tracks.
    pub async fn search_track(&self, q: &str, limit: u32) -> Result<SearchTracks> {
        let mut req = self.request(Method::GET, &["search"]);

        req.query_param("type", "track")
            .query_param("q", q)
            .query_param("limit", limit.to_string().as_str());

        req.execute().await?.json::<SearchTracks>()
    }
}

/// Handle device control requests.
fn device_control<C>(status: StatusCode, _: &C) -> Result<Option<bool>> {
    match status {
        StatusCode::OK | StatusCode::ACCEPTED | StatusCode::NO_CONTENT => Ok(Some(true)),
        StatusCode::NOT_FOUND => Ok(Some(false)),
        _ => Ok(None),
    }
}
