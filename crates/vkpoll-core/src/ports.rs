use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

/// Query/form parameters for a remote call, in insertion order.
pub type Params = Vec<(&'static str, String)>;

/// Hexagonal port for invoking VK API methods (`messages.getById`, ...).
///
/// Implementations own authentication and the API version; the returned value
/// is the unwrapped `response` body. API-level failures map to
/// [`crate::Error::Api`].
#[async_trait]
pub trait ApiCaller: Send + Sync {
    async fn call(&self, method: &str, params: Params) -> Result<serde_json::Value>;
}

/// Raw text response of a long-poll GET.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpText {
    pub status: u16,
    pub body: String,
}

/// Hexagonal port for the long-poll GET itself.
///
/// The server answers with JSON but not always with a JSON mime type, so the
/// body comes back as text and the session parses it.
#[async_trait]
pub trait LongPollTransport: Send + Sync {
    async fn get_text(&self, url: &str, query: Params, timeout: Duration) -> Result<HttpText>;
}
