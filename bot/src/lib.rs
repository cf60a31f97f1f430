pub const VERSION: &str = env!("CARGO_PKG_VERSION");
const USER_AGENT: &str = concat!("SongBot/", env!("CARGO_PKG_VERSION"));

pub mod cli;
mod command;
pub mod config;
mod irc;
mod module;

#[cfg(test)]
mod testing;
