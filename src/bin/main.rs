use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use homewatch::{
    config::Config,
    job::{JobKind, Jobs},
    telegram::TelegramClient,
};
use tracing::{debug, error};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    let _guard = init_logging(&config)?;
    debug!("bot started");

    let telegram = TelegramClient::new(&config);
    let poll_rate = Duration::from_secs(1);
    let mut jobs =
        Jobs::init(config.clone(), telegram.clone()).add(JobKind::Homework, config.poll_interval)?;

    loop {
        if let Err(error) = jobs.poll().await {
            // Report every failure to the chat and keep polling
            let report = format!("Бот столкнулся с ошибкой!\n{error:#}");
            error!("{report}");
            if let Err(send_error) = telegram.send_message(&report).await {
                error!("could not deliver error notification: {send_error}");
            }
        }
        tokio::time::sleep(poll_rate).await;
    }
}

/// Logs to a daily-rotated file under the configured log directory,
/// filterable through `RUST_LOG`.
fn init_logging(config: &Config) -> Result<WorkerGuard> {
    ensure_log_dir(&config.log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "bot.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    Ok(guard)
}

fn ensure_log_dir(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("could not create log directory {}", log_dir.display()))
}
