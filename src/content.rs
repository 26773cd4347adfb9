use std::marker::PhantomData;
use std::sync::Arc;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::transport::{Request, Transport, TransportError};

/// A piece of generated content served by one of the providers.
pub trait ContentItem: DeserializeOwned + Send {
    /// Provider name used in logs and errors.
    const KIND: &'static str;

    /// The text relayed to the chat. An empty text makes the item invalid.
    fn text(&self) -> &str;
}

/// Response of the random facts API.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
#[allow(dead_code)]
pub struct Fact {
    pub id: String,
    pub text: String,
    pub source: String,
    pub source_url: String,
    pub language: String,
    pub permalink: String,
}

impl ContentItem for Fact {
    const KIND: &'static str = "fact";

    fn text(&self) -> &str {
        &self.text
    }
}

/// Response of the jokes API; the joke itself sits under `value`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
#[allow(dead_code)]
pub struct Joke {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: JokeValue,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
#[allow(dead_code)]
pub struct JokeValue {
    pub id: i64,
    pub joke: String,
    pub categories: Vec<String>,
}

impl ContentItem for Joke {
    const KIND: &'static str = "joke";

    fn text(&self) -> &str {
        &self.value.joke
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {kind} provider failed: {source}")]
    Transport {
        kind: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("{kind} provider returned {status}")]
    Status {
        kind: &'static str,
        status: StatusCode,
    },

    #[error("failed to read {kind} response: {source}")]
    Body {
        kind: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("failed to parse {kind} response: {source}")]
    Decode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{kind} response has no text")]
    EmptyText { kind: &'static str },
}

/// Fetches one `T` per call from a fixed provider URL.
pub struct ContentClient<T> {
    transport: Arc<dyn Transport>,
    url: Url,
    _item: PhantomData<fn() -> T>,
}

impl<T: ContentItem> ContentClient<T> {
    pub fn new(transport: Arc<dyn Transport>, url: Url) -> Self {
        Self {
            transport,
            url,
            _item: PhantomData,
        }
    }

    pub async fn fetch(&self) -> Result<T, FetchError> {
        let kind = T::KIND;

        debug!("Fetching {} from {}", kind, self.url);

        let response = self
            .transport
            .execute(Request::get(self.url.clone()))
            .await
            .map_err(|source| FetchError::Transport { kind, source })?;

        let status = response.status();
        if !status.is_success() {
            // Drain so the connection can go back to the pool.
            let _ = response.bytes().await;
            return Err(FetchError::Status { kind, status });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Body { kind, source })?;

        let item: T =
            serde_json::from_slice(&body).map_err(|source| FetchError::Decode { kind, source })?;

        if item.text().is_empty() {
            return Err(FetchError::EmptyText { kind });
        }

        Ok(item)
    }
}
