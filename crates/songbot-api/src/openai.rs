//! Client for an OpenAI-compatible chat completions endpoint.

use anyhow::{anyhow, Result};
use reqwest::{header, Client, Method};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::base::RequestBuilder;
use crate::token::Token;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

/// API integration.
#[derive(Clone, Debug)]
pub struct OpenAi {
    user_agent: &'static str,
    token: Token,
    client: Client,
    api_url: Url,
    model: String,
}

impl OpenAi {
    /// Create a new API integration.
    pub fn new(
        user_agent: &'static str,
        api_url: Option<&str>,
        api_key: &str,
        model: &str,
    ) -> Result<OpenAi> {
        Ok(OpenAi {
            user_agent,
            token: Token::from_static(api_key),
            client: Client::new(),
            api_url: str::parse::<Url>(api_url.unwrap_or(DEFAULT_API_URL))?,
            model: model.to_owned(),
        })
    }

    /// Send a single user prompt and return the text of the first choice.
    pub async fn generate_response(&self, prompt: &str) -> Result<String> {
        let mut url = self.api_url.clone();

        if let Ok(mut p) = url.path_segments_mut() {
            p.pop_if_empty().extend(["chat", "completions"]);
        }

        let body = serde_json::to_vec(&Request {
            model: &self.model,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
        })?;

        let mut req = RequestBuilder::new(&self.client, self.user_agent, Method::POST, url);
        req.token(&self.token)
            .header(header::ACCEPT, "application/json")
            .json_body(body);

        let response = req.execute().await?.json::<Response>()?;

        return response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("Completion without choices"));

        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            messages: [Message<'a>; 1],
            temperature: f32,
        }

        #[derive(Serialize)]
        struct Message<'a> {
            role: &'static str,
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct Response {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }

        #[derive(Deserialize)]
        struct ChoiceMessage {
            #[serde(default)]
            content: String,
        }
    }
}
