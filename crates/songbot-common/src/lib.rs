#[macro_use]
mod macros;

pub mod backoff;
pub mod irc;
pub mod models;
pub mod words;

pub use tokio_stream as stream;

