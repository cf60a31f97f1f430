//! Keeps a [Token] current using an OAuth 2.0 refresh token.

use std::time::Duration;

use anyhow::Result;
use common::backoff;
use reqwest::{header, Client, Method};
use serde::Deserialize;
use url::Url;

use crate::base::RequestBuilder;
use crate::token::Token;

pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Credentials used to refresh a token.
#[derive(Clone)]
pub struct RefreshCredentials {
    pub token_url: Url,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    /// Some providers rotate the refresh token.
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Run the refresh loop for the given token.
///
/// Refreshes right away, then again shortly before every expiry or as soon
/// as a client forces a refresh. Failures are retried with backoff and never
/// end the loop.
#[tracing::instrument(skip_all)]
pub async fn refresh_loop(
    user_agent: &'static str,
    mut credentials: RefreshCredentials,
    token: Token,
) -> Result<()> {
    let client = Client::new();
    let mut backoff = backoff::Exponential::new(Duration::from_secs(5));

    loop {
        let wait = match refresh(&client, user_agent, &credentials).await {
            Ok(response) => {
                backoff.reset();
                token.set(&response.access_token);

                if let Some(refresh_token) = response.refresh_token {
                    credentials.refresh_token = refresh_token;
                }

                let expires_in = Duration::from_secs(response.expires_in.unwrap_or(3600));
                tracing::info!("Refreshed token, expires in {:?}", expires_in);
                expires_in.saturating_sub(EXPIRY_MARGIN)
            }
            Err(e) => {
                let wait = backoff.failed();
                common::log_error!(e, "Failed to refresh token, trying again in {:?}", wait);
                wait
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = token.wait_for_refresh() => {
                tracing::trace!("Refresh forced");
            }
        }
    }
}

async fn refresh(
    client: &Client,
    user_agent: &'static str,
    credentials: &RefreshCredentials,
) -> Result<TokenResponse> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", "refresh_token")
        .append_pair("refresh_token", &credentials.refresh_token)
        .append_pair("client_id", &credentials.client_id)
        .append_pair("client_secret", &credentials.client_secret)
        .finish();

    let mut req = RequestBuilder::new(
        client,
        user_agent,
        Method::POST,
        credentials.token_url.clone(),
    );

    req.header(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    )
    .header(header::ACCEPT, "application/json")
    .body(body);

    req.execute().await?.json()
}
