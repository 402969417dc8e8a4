use std::num::NonZeroU32;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::{
    config::Config,
    job::util::{Client, JsonDecodeError},
};

static TELEGRAM_API_URL: &str = "https://api.telegram.org/bot";

/// Sends messages to one fixed chat through the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    url: String,
    chat_id: String,
}

/// Telegram's response envelope. On failure `ok` is `false` and
/// `description` says why.
#[derive(Deserialize, Debug)]
struct SendMessageResponse {
    ok: bool,
    description: Option<String>,
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("Telegram request failed: {0}")]
    Http(#[from] JsonDecodeError),
    #[error("Telegram rejected the message: {0}")]
    Rejected(String),
}

impl TelegramClient {
    pub fn new(config: &Config) -> Self {
        // Telegram allows roughly one message per second per chat
        let client = Client::new()
            .with_limit(NonZeroU32::MIN)
            .with_max_retries(2);
        TelegramClient {
            client,
            url: format!("{}{}/sendMessage", TELEGRAM_API_URL, config.telegram_token),
            chat_id: config.chat_id.clone(),
        }
    }

    pub async fn send_message(&self, text: &str) -> Result<(), SendError> {
        info!(chat_id = %self.chat_id, "sending message: {text:?}");
        let response: SendMessageResponse = self
            .client
            .post_json(&self.url, payload(&self.chat_id, text))
            .await?;
        if !response.ok {
            return Err(SendError::Rejected(
                response.description.unwrap_or_else(|| "no description".into()),
            ));
        }
        Ok(())
    }
}

fn payload(chat_id: &str, text: &str) -> serde_json::Value {
    json!({
        "chat_id": chat_id,
        "text": text,
    })
}
