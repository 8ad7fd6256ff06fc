//! Capability-composed service surface.
//!
//! One handler interface for everything the outer layers (HTTP API, event
//! source) call into the bot with. Earlier revisions of this service had
//! several divergent handler definitions; this is the single surviving
//! shape.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::error;

use crate::{
    domain::{ChatId, OutboundMessage, StatusEvent, User},
    fanout::Notifier,
    listener::TEST_REPLY,
    ports::SubscriptionRepository,
    Error, Result,
};

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn send_mail(&self, to: &str, message: &str) -> Result<()>;
    async fn send_event(&self, event: StatusEvent) -> Result<()>;
    async fn send_test(&self, chat_id: ChatId) -> Result<()>;
    async fn authenticate_by_token(&self, token: &str) -> Result<User>;
}

pub struct Core {
    repo: Arc<dyn SubscriptionRepository>,
    notifier: Notifier,
    send_tx: mpsc::Sender<OutboundMessage>,
}

impl Core {
    pub fn new(
        repo: Arc<dyn SubscriptionRepository>,
        notifier: Notifier,
        send_tx: mpsc::Sender<OutboundMessage>,
    ) -> Self {
        Self {
            repo,
            notifier,
            send_tx,
        }
    }
}

#[async_trait]
impl EventHandler for Core {
    async fn send_mail(&self, _to: &str, _message: &str) -> Result<()> {
        Err(Error::Unsupported("mail delivery".to_string()))
    }

    /// Programmatic event entry: feed a status event into the fanout
    /// queue, exactly as the chat platform's own event source would.
    async fn send_event(&self, event: StatusEvent) -> Result<()> {
        self.notifier.notify(event).await
    }

    /// Enqueue the fixed test line for one chat.
    async fn send_test(&self, chat_id: ChatId) -> Result<()> {
        self.send_tx
            .send(OutboundMessage {
                chat_id,
                text: TEST_REPLY.to_string(),
            })
            .await
            .map_err(|_| Error::QueueClosed)
    }

    async fn authenticate_by_token(&self, token: &str) -> Result<User> {
        if token.is_empty() {
            return Err(Error::Auth("token not provided".to_string()));
        }
        let user = match self.repo.get_user(token).await {
            Ok(user) => user,
            Err(e) => {
                error!(error = %e, "read user data");
                None
            }
        };
        user.ok_or_else(|| Error::Auth("user not found".to_string()))
    }
}
