use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::{Runnable, util::Client};
use crate::{config::Config, telegram::TelegramClient};

static PRAKTIKUM_API_URL: &str = "https://praktikum.yandex.ru/api/user_api/homework_statuses/";

/// The API reports failures in-band with HTTP 200; a body carrying one of
/// these keys is an error, not a status list.
static ERROR_KEYS: [&str; 2] = ["error", "code"];

#[derive(Deserialize, Debug)]
struct Homework {
    homework_name: String,
    status: String,
}

#[derive(Deserialize, Debug)]
struct StatusResponse {
    #[serde(default)]
    homeworks: Vec<Homework>,
    current_date: Option<i64>,
}

#[derive(Error, Debug)]
pub enum HomeworkError {
    #[error("Json вернул код ошибки: {0}")]
    Api(String),
    #[error("Неизвестное значение ключа \"status\": {0}!")]
    UnknownStatus(String),
    #[error("could not decode homework status response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Formats the localized verdict for a reviewed homework.
fn verdict(homework: &Homework) -> Result<String, HomeworkError> {
    let name = &homework.homework_name;
    match homework.status.as_str() {
        "reviewing" => Ok(format!("Работу \"{name}\" ещё не проверили.")),
        "rejected" => Ok(format!(
            "У вас проверили работу \"{name}\".\nК сожалению в работе нашлись ошибки."
        )),
        "approved" => Ok(format!(
            "У вас проверили работу \"{name}\".\nРевьюеру всё понравилось, можно приступать к следующему уроку."
        )),
        other => Err(HomeworkError::UnknownStatus(other.to_string())),
    }
}

fn parse_response(raw: &[u8]) -> Result<StatusResponse, HomeworkError> {
    let value: serde_json::Value = serde_json::from_slice(raw)?;
    for key in ERROR_KEYS {
        if let Some(detail) = value.get(key) {
            return Err(HomeworkError::Api(detail.to_string()));
        }
    }
    Ok(serde_json::from_value(value)?)
}

pub struct HomeworkFetcher {
    client: Client,
    telegram: TelegramClient,
    current_timestamp: i64,
}

impl HomeworkFetcher {
    /// Carries the poll window forward; without a `current_date` the window
    /// stays where it was.
    fn advance(&mut self, response: &StatusResponse) {
        if let Some(current_date) = response.current_date {
            self.current_timestamp = current_date;
        }
    }
}

impl Runnable for HomeworkFetcher {
    fn new(config: &Config, telegram: TelegramClient) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("OAuth {}", config.praktikum_token))
            .context("PRAKTIKUM_TOKEN is not a valid header value")?;
        headers.insert(AUTHORIZATION, auth);

        let client = Client::from_reqwest(
            reqwest::Client::builder()
                .default_headers(headers)
                .build()
                .context("could not build homework API client")?,
        )
        .with_max_retries(2);

        Ok(HomeworkFetcher {
            client,
            telegram,
            current_timestamp: Utc::now().timestamp(),
        })
    }

    async fn run(&mut self) -> Result<()> {
        let query = [("from_date", self.current_timestamp.to_string())];
        let raw = self
            .client
            .get(PRAKTIKUM_API_URL, &query)
            .await
            .with_context(|| format!("homework status request failed, URL: {PRAKTIKUM_API_URL}"))?;
        let response = parse_response(&raw)?;

        if let Some(homework) = response.homeworks.first() {
            self.telegram.send_message(&verdict(homework)?).await?;
        } else {
            debug!(from_date = self.current_timestamp, "no homework updates");
        }

        self.advance(&response);
        Ok(())
    }
}
