use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use irc::client;
use irc::proto::command::{CapSubCommand, Command};
use irc::proto::message::Message;
use leaky_bucket::RateLimiter;
use parking_lot::RwLock;
use queue::Announcer;

struct Inner {
    /// Sender of the current connection, if any.
    client: RwLock<Option<client::Sender>>,
    limiter: RateLimiter,
}

/// Rate limited sender for chat messages.
///
/// Outlives individual connections, messages sent while disconnected are
/// dropped.
#[derive(Clone)]
pub(crate) struct Sender {
    inner: Arc<Inner>,
}

impl Sender {
    /// Create a new sender.
    pub(crate) fn new() -> Sender {
        // Twitch allows 20 messages per 30 seconds for regular users.
        let limiter = RateLimiter::builder()
            .initial(20)
            .max(20)
            .interval(Duration::from_millis(1500))
            .build();

        Sender {
            inner: Arc::new(Inner {
                client: RwLock::new(None),
                limiter,
            }),
        }
    }

    /// Use the sender of a new connection.
    pub(crate) fn attach(&self, sender: client::Sender) {
        *self.inner.client.write() = Some(sender);
    }

    /// Forget the current connection.
    pub(crate) fn detach(&self) {
        *self.inner.client.write() = None;
    }

    /// Only send to chat, with rate limiting.
    pub(crate) async fn send(&self, m: impl Into<Message>) {
        let m = m.into();
        self.inner.limiter.acquire(1).await;
        self.send_immediate(m);
    }

    /// Send an immediate message, without taking rate limiting into account.
    pub(crate) fn send_immediate(&self, m: impl Into<Message>) {
        let client = self.inner.client.read();

        let Some(client) = client.as_ref() else {
            tracing::warn!("Not connected to chat, dropping message");
            return;
        };

        if let Err(e) = client.send(m) {
            common::log_error!(e, "Failed to send message");
        }
    }

    /// Send a PRIVMSG.
    pub(crate) async fn privmsg(&self, target: &str, f: impl fmt::Display) {
        self.send(Command::PRIVMSG(target.to_owned(), f.to_string()))
            .await;
    }

    /// Send a capability request.
    pub(crate) fn cap_req(&self, cap: &str) {
        self.send_immediate(Command::CAP(
            None,
            CapSubCommand::REQ,
            Some(String::from(cap)),
            None,
        ));
    }
}

#[async_trait]
impl Announcer for Sender {
    async fn send(&self, channel: &str, text: &str) {
        self.privmsg(channel, text).await;
    }
}
