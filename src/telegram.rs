use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::transport::{Request, Transport, TransportError};

/// Body returned to the caller when posting to the chat failed.
pub const RELAY_FAILURE_TEXT: &str = "";

/// Object the webhook receives every time a user interacts with the bot.
///
/// Missing fields decode to their defaults, so only malformed JSON fails to parse.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Update {
    pub update_id: i64,
    pub message: Message,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Message {
    pub text: String,
    pub chat: Chat,
}

/// The conversation a message belongs to.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Chat {
    pub id: i64,
}

impl Update {
    pub fn parse(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }

    pub fn chat_id(&self) -> i64 {
        self.message.chat.id
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to post message to Telegram: {0}")]
    Transport(#[source] TransportError),

    #[error("failed to read Telegram response: {0}")]
    Body(#[source] TransportError),
}

/// Client for the Bot API `sendMessage` method.
pub struct TelegramClient {
    transport: Arc<dyn Transport>,
    url: Url,
}

impl TelegramClient {
    pub fn new(transport: Arc<dyn Transport>, send_message_url: Url) -> Self {
        Self {
            transport,
            url: send_message_url,
        }
    }

    /// Post `text` to `chat_id` and return the raw response body.
    ///
    /// Only network and body-read errors fail. A non-2xx reply from Telegram
    /// still returns its body (it carries `"ok": false` and a description);
    /// callers that need a delivered message must inspect it.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<String, RelayError> {
        info!("Sending {} to chat_id: {}", text, chat_id);

        let chat_id = chat_id.to_string();
        let request = Request::post_form(
            self.url.clone(),
            &[("chat_id", chat_id.as_str()), ("text", text)],
        );

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(RelayError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(RelayError::Body)?;

        if status.is_success() {
            debug!("Body of Telegram response: {}", body);
        } else {
            warn!("Telegram responded with {}: {}", status, body);
        }

        Ok(body)
    }
}
