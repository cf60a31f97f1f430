use std::fmt;
use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::services::Classifier;

const PROMPT: &str = "You moderate song requests for a live stream. \
Decide whether the request below is racist, hateful, or an obvious troll \
request that should not be played. Answer with exactly one word: true if it \
should be blocked, false otherwise.";

/// Replies used when a request is blocked.
pub(crate) static REJECTIONS: &[&str] = &[
    "Nice try, but that one isn't getting anywhere near the queue.",
    "That request is a hard pass from me.",
    "Not happening. Try requesting an actual song.",
    "The queue has standards and that request didn't meet them.",
    "I'm going to pretend I didn't see that request.",
    "Request denied. Keep it friendly, chat.",
];

/// The result of screening a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Rejected(Rejection),
}

/// A request was blocked, carries the reply to send to the requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    message: String,
}

impl Rejection {
    fn random() -> Self {
        let mut rng = rand::thread_rng();
        let message = REJECTIONS.choose(&mut rng).copied().unwrap_or("Nope.");

        Self {
            message: message.to_owned(),
        }
    }

    /// The reply to send.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Screens free text through a [Classifier].
///
/// Screening fails open: if the classifier errors or gives a reply which is
/// neither `true` nor `false`, the text is allowed.
#[derive(Clone)]
pub struct ContentGate {
    classifier: Arc<dyn Classifier>,
}

impl ContentGate {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    /// Screen the given text.
    pub async fn screen(&self, text: &str) -> Verdict {
        let prompt = format!("{PROMPT}\n\nRequest: {text}");

        let reply = match self.classifier.generate_response(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                common::log_warn!(e, "Failed to screen {:?}, allowing it", text);
                return Verdict::Allowed;
            }
        };

        match parse_reply(&reply) {
            Some(true) => {
                tracing::info!("Blocked request {:?}", text);
                Verdict::Rejected(Rejection::random())
            }
            Some(false) => Verdict::Allowed,
            None => {
                tracing::warn!("Unexpected screening reply {:?}, allowing {:?}", reply, text);
                Verdict::Allowed
            }
        }
    }
}

fn parse_reply(reply: &str) -> Option<bool> {
    let reply = reply.trim();

    if reply.eq_ignore_ascii_case("true") {
        Some(true)
    } else if reply.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
