//! The subset of Spotify Web API response objects the bot consumes.
//!
//! Fields the bot never reads are left out, and everything that Spotify
//! documents as optional is defaulted so that partial payloads still parse.

pub mod artist;
pub mod device;
pub mod page;
pub mod playing;
pub mod search;
pub mod track;
