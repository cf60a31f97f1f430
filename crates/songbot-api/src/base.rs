use anyhow::{bail, Result};
use bytes::Bytes;
use reqwest::{header, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::token::Token;

#[derive(Debug, Error)]
#[error("Error when sending request")]
struct SendRequestError(#[source] reqwest::Error);

#[derive(Debug, Error)]
#[error("Error when receiving response")]
struct ReceiveResponseError(#[source] reqwest::Error);

#[derive(Debug, Error)]
#[error("Token not ready")]
struct TokenNotReady;

/// Helper to build and send a single request.
pub(crate) struct RequestBuilder<'a> {
    client: &'a Client,
    user_agent: &'static str,
    url: Url,
    method: Method,
    token: Option<&'a Token>,
    headers: Vec<(header::HeaderName, String)>,
    body: Option<Bytes>,
}

impl<'a> RequestBuilder<'a> {
    /// Construct a new request builder.
    pub(crate) fn new(
        client: &'a Client,
        user_agent: &'static str,
        method: Method,
        url: Url,
    ) -> Self {
        Self {
            client,
            user_agent,
            url,
            method,
            token: None,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Set the bearer token to use.
    pub(crate) fn token(&mut self, token: &'a Token) -> &mut Self {
        self.token = Some(token);
        self
    }

    /// Push a header.
    pub(crate) fn header(&mut self, key: header::HeaderName, value: &str) -> &mut Self {
        self.headers.push((key, value.to_owned()));
        self
    }

    /// Add a query parameter.
    pub(crate) fn query_param(&mut self, key: &str, value: &str) -> &mut Self {
        self.url.query_pairs_mut().append_pair(key, value);
        self
    }

    /// Set the raw body of the request.
    pub(crate) fn body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    /// Set a JSON body.
    pub(crate) fn json_body(&mut self, body: Vec<u8>) -> &mut Self {
        self.headers
            .push((header::CONTENT_TYPE, String::from("application/json")));
        self.body = Some(Bytes::from(body));
        self
    }

    /// Send with an explicitly empty body, some endpoints insist on a
    /// `Content-Length: 0` header.
    pub(crate) fn empty_body(&mut self) -> &mut Self {
        self.body = Some(Bytes::new());
        self
    }

    /// Send the request and map the status code through `m`.
    ///
    /// If `m` returns `None`, the response is treated as an error.
    pub(crate) async fn json_map<T>(
        &self,
        m: impl FnOnce(StatusCode, &Bytes) -> Result<Option<T>>,
    ) -> Result<T> {
        let Response {
            method,
            url,
            status,
            body,
        } = self.execute().await?;

        if let Some(output) = m(status, &body)? {
            return Ok(output);
        }

        let body = String::from_utf8_lossy(body.as_ref());
        bail!("Bad response: {}: {}: {}: {}", method, url, status, body);
    }

    /// Execute the request.
    pub(crate) async fn execute(&self) -> Result<Response<Bytes>> {
        tracing::trace!("Request: {}: {}", self.method, self.url);

        let mut req = self.client.request(self.method.clone(), self.url.clone());

        for (key, value) in &self.headers {
            req = req.header(key.clone(), value);
        }

        if let Some(body) = &self.body {
            req = req
                .header(header::CONTENT_LENGTH, body.len())
                .body(body.clone());
        }

        if let Some(token) = self.token {
            let Some(payload) = token.read() else {
                return Err(TokenNotReady.into());
            };

            req = req.header(
                header::AUTHORIZATION,
                format!("Bearer {}", payload.as_str()),
            );
        }

        req = req.header(header::USER_AGENT, self.user_agent);

        let res = req.send().await.map_err(SendRequestError)?;
        let status = res.status();
        let body = res.bytes().await.map_err(ReceiveResponseError)?;

        if tracing::enabled!(tracing::Level::TRACE) {
            let response = String::from_utf8_lossy(&body);
            tracing::trace!(
                "Response: {}: {}: {}: {}",
                self.method,
                self.url,
                status,
                response
            );
        }

        if status == StatusCode::UNAUTHORIZED {
            if let Some(token) = self.token {
                token.force_refresh();
            }
        }

        Ok(Response {
            method: self.method.clone(),
            url: self.url.clone(),
            status,
            body,
        })
    }
}

pub(crate) struct Response<B> {
    method: Method,
    url: Url,
    status: StatusCode,
    body: B,
}

impl Response<Bytes> {
    /// Treat the given status as an absent body.
    pub(crate) fn empty_on_status(self, status: StatusCode) -> Response<Option<Bytes>> {
        let body = if self.status == status {
            None
        } else {
            Some(self.body)
        };

        Response {
            method: self.method,
            url: self.url,
            status: self.status,
            body,
        }
    }

    /// Expect a JSON response of the given type.
    pub(crate) fn json<T>(self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        if !self.status.is_success() {
            let body = String::from_utf8_lossy(self.body.as_ref());
            bail!(
                "Bad response: {}: {}: {}: {}",
                self.method,
                self.url,
                self.status,
                body
            );
        }

        match serde_json::from_slice(self.body.as_ref()) {
            Ok(body) => Ok(body),
            Err(e) => {
                let body = String::from_utf8_lossy(self.body.as_ref());
                bail!(
                    "Bad response: {}: {}: {}: {}: {}",
                    self.method,
                    self.url,
                    self.status,
                    e,
                    body
                );
            }
        }
    }
}

impl Response<Option<Bytes>> {
    /// Expect an optional JSON response of the given type.
    pub(crate) fn json<T>(self) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let Some(body) = self.body else {
            return Ok(None);
        };

        // Spotify answers some "nothing here" queries with 200 and no body.
        if self.status.is_success() && body.is_empty() {
            return Ok(None);
        }

        Response {
            method: self.method,
            url: self.url,
            status: self.status,
            body,
        }
        .json()
        .map(Some)
    }
}
