use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use queue::Announcer;

/// The context of a single command invocation.
pub(crate) struct Context<'a> {
    /// Login of the user who invoked the command.
    pub(crate) user: &'a str,
    /// If the user is the broadcaster or a moderator.
    pub(crate) privileged: bool,
    channel: &'a str,
    announcer: &'a dyn Announcer,
    rest: &'a str,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        user: &'a str,
        privileged: bool,
        channel: &'a str,
        announcer: &'a dyn Announcer,
        rest: &'a str,
    ) -> Self {
        Self {
            user,
            privileged,
            channel,
            announcer,
            rest,
        }
    }

    /// Take the next whitespace separated argument.
    pub(crate) fn next(&mut self) -> Option<&'a str> {
        let rest = self.rest.trim_start();

        if rest.is_empty() {
            self.rest = rest;
            return None;
        }

        let (arg, rest) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        self.rest = rest;
        Some(arg)
    }

    /// Everything after the arguments taken so far.
    pub(crate) fn rest(&self) -> &'a str {
        self.rest.trim()
    }

    /// Respond to the user who invoked the command.
    pub(crate) async fn respond(&self, m: impl fmt::Display) {
        let text = format!("{} -> {}", self.user, m);
        self.announcer.send(self.channel, &text).await;
    }
}

/// A handler for a single chat command.
#[async_trait]
pub(crate) trait Handler: 'static + Send + Sync {
    async fn handle(&self, ctx: &mut Context<'_>) -> Result<()>;
}

#[derive(Default)]
pub(crate) struct Handlers {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl Handlers {
    /// Insert the given handler.
    pub(crate) fn insert(&mut self, command: impl AsRef<str>, handler: impl Handler) {
        self.handlers
            .insert(command.as_ref().to_string(), Arc::new(handler));
    }

    /// Lookup the given command.
    pub(crate) fn get(&self, command: &str) -> Option<&dyn Handler> {
        self.handlers.get(command).map(|h| h.as_ref())
    }
}

/// Split a chat message into a command name and its arguments.
///
/// Commands are prefixed with `!`, and the name is matched case
/// insensitively.
pub(crate) fn parse(message: &str) -> Option<(String, &str)> {
    let message = message.trim_start().strip_prefix('!')?;
    let (name, rest) = message.split_once(char::is_whitespace).unwrap_or((message, ""));

    if name.is_empty() {
        return None;
    }

    Some((name.to_lowercase(), rest))
}
