//! Ports implemented by adapter crates (Telegram today) and by the
//! persistence backend.

use async_trait::async_trait;

use crate::{
    domain::{ChatId, Command, Subscription, User, UserId},
    Result,
};

/// Outbound send seam to the chat platform.
///
/// The dispatcher drives the fallback ladder through these two calls; the
/// adapter owns retry-after handling and error mapping.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send text interpreted in the platform's markup dialect.
    async fn send_markdown(&self, chat_id: ChatId, text: &str) -> Result<()>;

    /// Send text with no markup interpretation at all.
    async fn send_plain(&self, chat_id: ChatId, text: &str) -> Result<()>;
}

/// Inbound update seam. One long-poll cycle per call (60 s server-side
/// timeout); the adapter filters out anything that is not a command.
#[async_trait]
pub trait UpdateSource: Send {
    async fn poll(&mut self) -> Result<Vec<Command>>;
}

/// Persistence collaborator for subscriptions and token lookup.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Subscription>>;
    async fn add(&self, subscription: &Subscription) -> Result<()>;
    async fn delete(&self, user_id: UserId) -> Result<()>;
    async fn get_user(&self, token: &str) -> Result<Option<User>>;
}
