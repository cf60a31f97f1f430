use queue::QueueEngine;

use crate::command::Handlers;

pub(crate) mod song;

/// Register every chat command.
pub(crate) fn hook(handlers: &mut Handlers, engine: &QueueEngine) {
    handlers.insert("song", song::Handler::new(engine.clone()));
    handlers.insert("sr", song::Request::new(engine.clone()));
}
