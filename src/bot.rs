use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Endpoints;
use crate::content::{ContentClient, Fact, FetchError, Joke};
use crate::telegram::{RelayError, TelegramClient, Update, RELAY_FAILURE_TEXT};
use crate::transport::Transport;

pub const FACT_COMMAND: &str = "/fact";
pub const JOKE_COMMAND: &str = "/joke";

/// Sent for anything that is not a Telegram update, so health checks keep passing.
pub const INFO_REPLY: &str = "Thank you for reaching out, stuff is up and running, but this is a telegram bot and this endpoint will eventually cease to exist";
pub const NO_VALID_INPUT_REPLY: &str = "no valid input";
pub const GENERATION_ERROR_REPLY: &str = "error calling generation api";

/// What the gateway sends back to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.into(),
        }
    }

    pub fn error(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: body.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to escape content text: {0}")]
    Escape(#[from] serde_json::Error),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl DispatchError {
    /// The reply to send alongside this failure.
    pub fn reply(&self) -> Reply {
        match self {
            DispatchError::Fetch(_) => Reply::error(GENERATION_ERROR_REPLY),
            DispatchError::Escape(_) => Reply::error(String::new()),
            DispatchError::Relay(_) => Reply::error(RELAY_FAILURE_TEXT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Fact,
    Joke,
}

impl Command {
    /// Substring match; `/fact` wins when both tokens are present.
    pub fn detect(text: &str) -> Option<Self> {
        if text.contains(FACT_COMMAND) {
            Some(Command::Fact)
        } else if text.contains(JOKE_COMMAND) {
            Some(Command::Joke)
        } else {
            None
        }
    }
}

/// Encode `text` as a JSON string literal and decode it again, yielding the
/// text exactly as it will be posted to the chat.
pub fn escape_for_transport(text: &str) -> serde_json::Result<String> {
    let literal = serde_json::to_string(text)?;
    serde_json::from_str(&literal)
}

/// Turns one webhook payload into at most one content fetch and one chat message.
pub struct Bot {
    facts: ContentClient<Fact>,
    jokes: ContentClient<Joke>,
    telegram: TelegramClient,
}

impl Bot {
    pub fn new(
        facts: ContentClient<Fact>,
        jokes: ContentClient<Joke>,
        telegram: TelegramClient,
    ) -> Self {
        Self {
            facts,
            jokes,
            telegram,
        }
    }

    pub fn from_endpoints(transport: Arc<dyn Transport>, endpoints: &Endpoints) -> Self {
        Self::new(
            ContentClient::new(transport.clone(), endpoints.fact.clone()),
            ContentClient::new(transport.clone(), endpoints.joke.clone()),
            TelegramClient::new(transport, endpoints.send_message.clone()),
        )
    }

    pub async fn handle(&self, payload: &str) -> Result<Reply, DispatchError> {
        debug!("The request has the following body: {}", payload);

        let update = match Update::parse(payload) {
            Ok(update) => update,
            Err(e) => {
                warn!("Could not decode incoming update: {}", e);
                return Ok(Reply::ok(INFO_REPLY));
            }
        };

        let chat_id = update.chat_id();

        let text = match Command::detect(&update.message.text) {
            Some(Command::Fact) => {
                info!("Fact requested by chat {}", chat_id);
                self.facts.fetch().await?.text
            }
            Some(Command::Joke) => {
                info!("Joke requested by chat {}", chat_id);
                self.jokes.fetch().await?.value.joke
            }
            None => {
                info!("No command in update {}", update.update_id);
                return Ok(Reply::ok(NO_VALID_INPUT_REPLY));
            }
        };

        let text = escape_for_transport(&text)?;
        let body = self.telegram.send_message(chat_id, &text).await?;

        Ok(Reply::ok(body))
    }
}
