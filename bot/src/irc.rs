//! Twitch chat over IRC.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use common::backoff;
use common::irc::Tags;
use common::stream::StreamExt;
use irc::client::{self, Client};
use irc::proto::command::Command;
use irc::proto::message::{Message, Tag};
use irc::proto::Prefix;
use tokio::time::Instant;

use crate::command::{self, Handlers};

mod sender;
pub(crate) use self::sender::Sender;

const SERVER: &str = "irc.chat.twitch.tv";
const TWITCH_TAGS_CAP: &str = "twitch.tv/tags";
const PING_INTERVAL: Duration = Duration::from_secs(60);
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// A chat connection dispatching commands to handlers.
pub(crate) struct Chat {
    nickname: String,
    /// Channel name including the leading `#`.
    channel: String,
    token: String,
    handlers: Arc<Handlers>,
    sender: Sender,
}

impl Chat {
    pub(crate) fn new(
        nickname: String,
        channel: String,
        token: String,
        handlers: Handlers,
        sender: Sender,
    ) -> Self {
        Self {
            nickname,
            channel,
            token,
            handlers: Arc::new(handlers),
            sender,
        }
    }

    /// Stay connected to chat, reconnecting with backoff on errors.
    pub(crate) async fn run(self) -> Result<()> {
        let mut backoff = backoff::Exponential::new(Duration::from_secs(5));

        loop {
            let started = Instant::now();
            let result = self.serve().await;
            self.sender.detach();

            // A connection which stayed up for a while was healthy.
            if started.elapsed() > Duration::from_secs(300) {
                backoff.reset();
            }

            let wait = backoff.failed();

            if let Err(e) = result {
                common::log_error!(e, "Chat disconnected, reconnecting in {:?}", wait);
            }

            tokio::time::sleep(wait).await;
        }
    }

    #[tracing::instrument(skip_all, fields(channel = %self.channel))]
    async fn serve(&self) -> Result<()> {
        let token = self.token.trim_start_matches("oauth:");

        let irc_client_config = client::data::config::Config {
            nickname: Some(self.nickname.clone()),
            channels: vec![self.channel.clone()],
            password: Some(format!("oauth:{}", token)),
            server: Some(String::from(SERVER)),
            port: Some(6697),
            use_tls: Some(true),
            ..client::data::config::Config::default()
        };

        let mut client = Client::from_config(irc_client_config).await?;
        client.identify()?;

        self.sender.attach(client.sender());
        self.sender.cap_req(TWITCH_TAGS_CAP);

        let mut outgoing = client
            .outgoing()
            .ok_or_else(|| anyhow!("missing outgoing future for irc client"))?;

        let mut client_stream = client.stream()?;
        let mut ping_interval = tokio::time::interval(PING_INTERVAL);
        let mut pong_deadline = None::<Instant>;

        tracing::info!("Connected to chat");

        loop {
            tokio::select! {
                _ = ping_interval.tick() => {
                    self.sender.send_immediate(Command::PING(String::from(SERVER), None));

                    if pong_deadline.is_none() {
                        pong_deadline = Some(Instant::now() + PONG_TIMEOUT);
                    }
                }
                _ = tokio::time::sleep_until(pong_deadline.unwrap_or_else(Instant::now)), if pong_deadline.is_some() => {
                    bail!("Server not responding");
                }
                message = client_stream.next() => {
                    let Some(m) = message.transpose()? else {
                        bail!("Chat stream ended");
                    };

                    self.handle(m, &mut pong_deadline)?;
                }
                _ = &mut outgoing => {
                    bail!("Outgoing future ended unexpectedly");
                }
            }
        }
    }

    /// Handle the given message.
    fn handle(&self, m: Message, pong_deadline: &mut Option<Instant>) -> Result<()> {
        match m.command {
            Command::PRIVMSG(_, message) => {
                let tags = Tags::from_tags(m.tags.iter().flat_map(|tag| {
                    tag.iter().flat_map(|tag| match tag {
                        Tag(key, Some(value)) => Some((key, value)),
                        _ => None,
                    })
                }));

                let Some(Prefix::Nickname(login, _, _)) = m.prefix else {
                    tracing::trace!("Ignoring message without a nickname");
                    return Ok(());
                };

                self.dispatch(&login, &tags, &message);
            }
            Command::PING(server, other) => {
                tracing::trace!("Received PING, responding with PONG");
                self.sender.send_immediate(Command::PONG(server, other));
            }
            Command::PONG(..) => {
                tracing::trace!("Received PONG, clearing PING timeout");
                *pong_deadline = None;
            }
            Command::NOTICE(_, message) => {
                if message == "Login authentication failed" {
                    bail!("Chat authentication failed");
                }

                tracing::trace!("Unhandled notice: {}", message);
            }
            command => {
                tracing::trace!(?command, "Unhandled command");
            }
        }

        Ok(())
    }

    /// Run the command in the given message, if any.
    fn dispatch(&self, login: &str, tags: &Tags, message: &str) {
        let Some((name, rest)) = command::parse(message) else {
            return;
        };

        if self.handlers.get(&name).is_none() {
            return;
        }

        let privileged = is_privileged(&self.channel, login, tags);
        tracing::trace!(%login, privileged, %name, "Running command");

        let handlers = self.handlers.clone();
        let sender = self.sender.clone();
        let channel = self.channel.clone();
        let login = login.to_owned();
        let rest = rest.to_owned();

        tokio::spawn(async move {
            let Some(handler) = handlers.get(&name) else {
                return;
            };

            let mut ctx = command::Context::new(&login, privileged, &channel, &sender, &rest);

            if let Err(e) = handler.handle(&mut ctx).await {
                common::log_error!(e, "Error when processing command !{}", name);
                ctx.respond("Sorry, something went wrong :(").await;
            }
        });
    }
}

/// The broadcaster and moderators may edit the queue.
fn is_privileged(channel: &str, login: &str, tags: &Tags) -> bool {
    tags.has_badge("broadcaster")
        || tags.has_badge("moderator")
        || channel.trim_start_matches('#').eq_ignore_ascii_case(login)
}
