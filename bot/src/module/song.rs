use anyhow::Result;
use async_trait::async_trait;
use queue::{AddError, QueueEngine, RemoveError};

use crate::command;

const EXAMPLE_SEARCH: &str = "queen we will rock you";

/// Number of entries shown by `!song list`.
const LIST_LIMIT: usize = 5;

/// Handler for the `!song` command.
pub(crate) struct Handler {
    engine: QueueEngine,
}

impl Handler {
    pub(crate) fn new(engine: QueueEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl command::Handler for Handler {
    async fn handle(&self, ctx: &mut command::Context<'_>) -> Result<()> {
        match ctx.next().map(str::to_lowercase).as_deref() {
            Some("request") => request(&self.engine, ctx).await,
            Some("list") => list(&self.engine, ctx).await,
            Some("current") => current(&self.engine, ctx).await,
            Some("clear") => {
                if !ctx.privileged {
                    ctx.respond("Only moderators can clear the queue.").await;
                    return Ok(());
                }

                let removed = self.engine.clear();
                ctx.respond(format!("Cleared {} request(s) from the queue.", removed))
                    .await;
            }
            Some("remove") => remove(&self.engine, ctx).await,
            _ => {
                ctx.respond("Expected: request, list, current, remove, or clear.")
                    .await;
            }
        }

        Ok(())
    }
}

/// Handler for the `!sr` shorthand.
pub(crate) struct Request {
    engine: QueueEngine,
}

impl Request {
    pub(crate) fn new(engine: QueueEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl command::Handler for Request {
    async fn handle(&self, ctx: &mut command::Context<'_>) -> Result<()> {
        request(&self.engine, ctx).await;
        Ok(())
    }
}

async fn request(engine: &QueueEngine, ctx: &mut command::Context<'_>) {
    let text = ctx.rest();

    match engine.add(ctx.user, text) {
        Ok(added) => {
            ctx.respond(format!(
                "Added \"{}\" to the queue at position #{}.",
                added.request, added.position
            ))
            .await;
        }
        Err(AddError::Empty) => {
            ctx.respond(format!(
                "Tell me what to play, like: !sr {}",
                EXAMPLE_SEARCH
            ))
            .await;
        }
        Err(AddError::Duplicate { position }) => {
            ctx.respond(format!(
                "That song is already in the queue (position #{}).",
                position
            ))
            .await;
        }
        Err(AddError::QueueFull) => {
            ctx.respond("The queue is full, try again later :(").await;
        }
        Err(AddError::TooManyUserRequests(count)) => {
            ctx.respond(format!(
                "You already have {} song(s) in the queue, wait for one to play first.",
                count
            ))
            .await;
        }
    }
}

async fn list(engine: &QueueEngine, ctx: &mut command::Context<'_>) {
    let entries = engine.list();

    if entries.is_empty() {
        ctx.respond("The queue is empty.").await;
        return;
    }

    let mut parts = entries
        .iter()
        .take(LIST_LIMIT)
        .enumerate()
        .map(|(i, e)| format!("#{} {} ({})", i + 1, e.request, e.user))
        .collect::<Vec<_>>();

    if entries.len() > LIST_LIMIT {
        parts.push(format!("... and {} more", entries.len() - LIST_LIMIT));
    }

    ctx.respond(parts.join(", ")).await;
}

async fn current(engine: &QueueEngine, ctx: &mut command::Context<'_>) {
    match engine.current().await {
        Ok(Some(track)) => {
            ctx.respond(format!("Now playing {}.", track)).await;
        }
        Ok(None) => {
            ctx.respond("Nothing is playing right now.").await;
        }
        Err(e) => {
            common::log_warn!(e, "Failed to get the current track");
            ctx.respond("Couldn't check what's playing, sorry :(").await;
        }
    }
}

async fn remove(engine: &QueueEngine, ctx: &mut command::Context<'_>) {
    if !ctx.privileged {
        ctx.respond("Only moderators can remove songs from the queue.")
            .await;
        return;
    }

    let Some(position) = ctx.next().and_then(|n| n.parse::<usize>().ok()) else {
        ctx.respond("Expected: !song remove <position>").await;
        return;
    };

    match engine.remove_at(position) {
        Ok(entry) => {
            ctx.respond(format!(
                "Removed \"{}\" requested by {}.",
                entry.request, entry.user
            ))
            .await;
        }
        Err(RemoveError::InvalidPosition { len, .. }) => {
            ctx.respond(format!(
                "No song at position #{}, the queue has {} song(s).",
                position, len
            ))
            .await;
        }
    }
}
