//! Telegram adapter (teloxide).
//!
//! Implements the core's `MessageSender` and `UpdateSource` ports over the
//! Telegram Bot API.

use std::time::Duration;

use async_trait::async_trait;
use teloxide::{
    prelude::*,
    types::{AllowedUpdate, ParseMode, UpdateKind},
};
use tokio::time::sleep;
use tracing::debug;

use chargebot_core::{
    domain::{ChatId, Command, UserId},
    errors::Error,
    ports::{MessageSender, UpdateSource},
    Result,
};

fn map_err(e: teloxide::RequestError) -> Error {
    Error::Platform(format!("telegram error: {e}"))
}

fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
    teloxide::types::ChatId(chat_id.0)
}

/// Honor one flood-control `RetryAfter` before giving up on a request.
async fn with_retry<T, Fut>(mut op: impl FnMut() -> Fut) -> Result<T>
where
    Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
    Fut::IntoFuture: Send,
{
    const MAX_RETRIES: usize = 1;
    let mut attempts = 0usize;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => match e {
                teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    sleep(d).await;
                    continue;
                }
                other => return Err(map_err(other)),
            },
        }
    }
}

/// Outbound half of the adapter.
#[derive(Clone)]
pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send_markdown(&self, chat_id: ChatId, text: &str) -> Result<()> {
        with_retry(|| {
            self.bot
                .send_message(tg_chat(chat_id), text.to_string())
                .parse_mode(ParseMode::MarkdownV2)
        })
        .await?;
        Ok(())
    }

    async fn send_plain(&self, chat_id: ChatId, text: &str) -> Result<()> {
        with_retry(|| self.bot.send_message(tg_chat(chat_id), text.to_string())).await?;
        Ok(())
    }
}

/// Inbound half of the adapter: manual long-polling with offset tracking.
///
/// Each `poll` call is one long-poll cycle; the server holds the request
/// open for up to `timeout` before returning an empty batch.
pub struct TelegramUpdates {
    bot: Bot,
    offset: Option<i32>,
    timeout: Duration,
}

impl TelegramUpdates {
    pub fn new(bot: Bot, timeout: Duration) -> Self {
        Self {
            bot,
            offset: None,
            timeout,
        }
    }
}

#[async_trait]
impl UpdateSource for TelegramUpdates {
    async fn poll(&mut self) -> Result<Vec<Command>> {
        let mut req = self
            .bot
            .get_updates()
            .timeout(self.timeout.as_secs() as u32)
            .allowed_updates(vec![AllowedUpdate::Message]);
        if let Some(offset) = self.offset {
            req = req.offset(offset);
        }
        let updates = req.await.map_err(map_err)?;

        let mut commands = Vec::new();
        for update in updates {
            self.offset = Some(update.id + 1);

            let UpdateKind::Message(message) = update.kind else {
                continue;
            };
            let Some(text) = message.text() else {
                continue;
            };
            let Some(name) = parse_command(text) else {
                debug!(chat_id = message.chat.id.0, "ignoring non-command update");
                continue;
            };
            let Some(from) = message.from() else {
                continue;
            };
            let username = from
                .username
                .clone()
                .unwrap_or_else(|| from.full_name());

            commands.push(Command {
                chat_id: ChatId(message.chat.id.0),
                user_id: UserId(from.id.0 as i64),
                username,
                name,
            });
        }
        Ok(commands)
    }
}

/// Extract the command keyword from a message text.
///
/// Telegram may send `/cmd@botname arg1 ...`; anything that does not start
/// with `/` is not a command.
fn parse_command(text: &str) -> Option<String> {
    let first = text.trim().split_whitespace().next()?;
    let cmd = first.strip_prefix('/')?;
    let cmd = cmd.split('@').next().unwrap_or("").to_lowercase();
    if cmd.is_empty() {
        None
    } else {
        Some(cmd)
    }
}
