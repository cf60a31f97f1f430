//! HTTP clients for the services the bot talks to.

mod base;

pub mod oauth2;

pub mod openai;
pub use self::openai::OpenAi;

pub mod spotify;
pub use self::spotify::Spotify;

mod token;
pub use self::token::{Token, TokenPayload};
