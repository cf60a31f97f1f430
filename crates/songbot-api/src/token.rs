use std::fmt;
use std::pin::pin;
use std::sync::Arc;

use tokio::sync::Notify;

/// Security wrapper for a token. Has a redacted debug implementation to
/// reduce the risk that it ends up in a log.
pub struct TokenPayload(Arc<str>);

impl TokenPayload {
    /// Get the string of the token.
    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }
}

impl fmt::Debug for TokenPayload {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TokenPayload").field(&"*secret*").finish()
    }
}

/// A shared bearer token.
///
/// Clients read it for every request, a refresh task keeps it current and is
/// woken up through [Token::wait_for_refresh] when a client saw it rejected.
#[derive(Default, Clone)]
pub struct Token {
    inner: Arc<Inner>,
}

impl Token {
    /// Construct a new empty token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a token which never changes, like an API key.
    pub fn from_static(token: &str) -> Self {
        let this = Self::new();
        this.set(token);
        this
    }

    /// Read the current token.
    pub fn read(&self) -> Option<TokenPayload> {
        let payload = self.inner.payload.read();
        payload.as_ref().map(|token| TokenPayload(token.clone()))
    }

    /// Clear the current token, and indicate that it needs to be refreshed.
    pub fn force_refresh(&self) {
        *self.inner.payload.write() = None;
        self.inner.refresh.notify_one();
    }

    /// Wait for the token to need to be refreshed.
    ///
    /// Only a single waiter is notified *once* per refresh request.
    pub async fn wait_for_refresh(&self) {
        self.inner.refresh.notified().await;
    }

    /// Sets the value of the token, notifying anyone waiting for it.
    pub fn set(&self, token: &str) {
        *self.inner.payload.write() = Some(token.into());
        self.inner.waiters.notify_waiters();
    }

    /// Wait until token is ready.
    pub async fn wait_until_ready(&self) {
        let mut future = pin!(self.inner.waiters.notified());

        loop {
            future.as_mut().enable();

            if self.inner.payload.read().is_some() {
                break;
            }

            future.as_mut().await;
            future.set(self.inner.waiters.notified());
        }
    }
}

#[derive(Default)]
struct Inner {
    payload: parking_lot::RwLock<Option<Arc<str>>>,
    refresh: Notify,
    waiters: Notify,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ready = self.inner.payload.read().is_some();

        f.debug_struct("Token")
            .field("token", if ready { &"*secret*" } else { &"none" })
            .finish()
    }
}
