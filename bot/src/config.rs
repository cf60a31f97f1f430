use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub twitch: Twitch,
    pub spotify: Spotify,
    pub classifier: Classifier,
    #[serde(default)]
    pub queue: Queue,
}

impl Config {
    /// Load configuration from the given YAML file.
    pub fn load(path: &Path) -> Result<Config> {
        let f = File::open(path)
            .with_context(|| anyhow!("failed to open configuration: {}", path.display()))?;

        serde_yaml::from_reader(f)
            .with_context(|| anyhow!("failed to parse configuration: {}", path.display()))
    }
}

#[derive(Debug, Deserialize)]
pub struct Twitch {
    /// Login of the account the bot chats as.
    pub nickname: String,
    /// Channel to join, with or without the leading `#`.
    pub channel: String,
    /// Chat token, with or without the `oauth:` prefix.
    pub token: Secret,
}

impl Twitch {
    /// The channel as an IRC channel name.
    pub fn irc_channel(&self) -> String {
        let channel = self.channel.trim().trim_start_matches('#');
        format!("#{}", channel.to_lowercase())
    }
}

#[derive(Debug, Deserialize)]
pub struct Spotify {
    pub client_id: String,
    pub client_secret: Secret,
    pub refresh_token: Secret,
    /// Name of the device to prefer when none is active.
    #[serde(default)]
    pub device: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Classifier {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default)]
    pub api_url: Option<String>,
    pub api_key: Secret,
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct Queue {
    /// Where the queue is stored, relative to the root directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub max_queue_length: usize,
    #[serde(default)]
    pub max_requests_per_user: usize,
    #[serde(default)]
    pub max_requeues: Option<u32>,
}

impl Queue {
    /// Path to the queue file.
    pub fn path(&self, root: &Path) -> PathBuf {
        match &self.path {
            Some(path) => root.join(path),
            None => root.join("queue.json"),
        }
    }

    /// Interval between ticks.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self {
            path: None,
            interval_secs: default_interval_secs(),
            max_queue_length: 0,
            max_requests_per_user: 0,
            max_requeues: None,
        }
    }
}

fn default_interval_secs() -> u64 {
    30
}

/// A secret which is either written inline or read from an environment
/// variable, like `{ env: SPOTIFY_CLIENT_SECRET }`.
#[derive(Clone, Deserialize)]
#[serde(untagged)]
pub enum Secret {
    Env { env: String },
    Inline(String),
}

impl Secret {
    /// Get the value of the secret.
    pub fn get(&self) -> Result<String> {
        match self {
            Secret::Inline(value) => Ok(value.clone()),
            Secret::Env { env } => std::env::var(env)
                .with_context(|| anyhow!("failed to read secret from environment `{}`", env)),
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Secret::Inline(..) => f.write_str("Secret(*)"),
            Secret::Env { env } => write!(f, "Secret(env: {env})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use super::{Config, Secret};

    const CONFIG: &str = r##"
twitch:
  nickname: songbot
  channel: "#SetBac"
  token: { env: SONGBOT_TEST_TWITCH_TOKEN }
spotify:
  client_id: client
  client_secret: secret
  refresh_token: refresh
  device: Stream PC
classifier:
  api_key: sk-test
  model: gpt-4o-mini
queue:
  max_requests_per_user: 3
"##;

    #[test]
    fn test_parse() {
        let config: Config = serde_yaml::from_str(CONFIG).unwrap();

        assert_eq!(config.twitch.irc_channel(), "#setbac");
        assert!(matches!(&config.twitch.token, Secret::Env { env } if env == "SONGBOT_TEST_TWITCH_TOKEN"));
        assert_eq!(config.spotify.client_secret.get().unwrap(), "secret");
        assert_eq!(config.spotify.device.as_deref(), Some("Stream PC"));
        assert_eq!(config.classifier.api_url, None);
        assert_eq!(config.queue.interval(), Duration::from_secs(30));
        assert_eq!(config.queue.max_requests_per_user, 3);
        assert_eq!(config.queue.max_queue_length, 0);
        assert_eq!(config.queue.max_requeues, None);
        assert_eq!(
            config.queue.path(Path::new("/srv/songbot")),
            Path::new("/srv/songbot/queue.json")
        );
    }

    #[test]
    fn test_missing_section() {
        assert!(serde_yaml::from_str::<Config>("twitch: { nickname: a, channel: b, token: c }").is_err());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::Inline(String::from("hunter2"));
        assert_eq!(format!("{:?}", secret), "Secret(*)");
    }
}
