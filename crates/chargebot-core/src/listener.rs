//! Inbound command pump: a single sequential consumer of the platform's
//! update stream. Mutates the subscription store and enqueues replies.

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    domain::{Command, OutboundMessage, Subscription, SubscriptionType},
    ports::UpdateSource,
    store::SubscriptionStore,
    Error, Result,
};

/// Fixed reply for the `test` command: a synthetic status line with
/// placeholder subject, connector and status values.
pub const TEST_REPLY: &str = "*ChargePointId*: Connector 1: `Status`";

const BACKOFF_INITIAL: Duration = Duration::from_secs(1);
const BACKOFF_MAX: Duration = Duration::from_secs(60);

/// Consume the update stream until cancellation.
///
/// Commands are processed strictly one at a time, so two subscribers'
/// commands never race each other. A poll failure is retried with
/// exponential backoff rather than killing the task.
pub async fn run(
    mut updates: impl UpdateSource,
    store: Arc<SubscriptionStore>,
    send_tx: mpsc::Sender<OutboundMessage>,
    cancel: CancellationToken,
) {
    let mut backoff = BACKOFF_INITIAL;
    loop {
        let batch = tokio::select! {
            _ = cancel.cancelled() => break,
            batch = updates.poll() => batch,
        };
        match batch {
            Ok(commands) => {
                backoff = BACKOFF_INITIAL;
                for command in commands {
                    if handle_command(&command, &store, &send_tx).await.is_err() {
                        // Send queue closed; nothing left to reply to.
                        info!("updates listener stopped");
                        return;
                    }
                }
            }
            Err(e) => {
                error!(error = %e, backoff_secs = backoff.as_secs(), "getting updates");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(BACKOFF_MAX);
            }
        }
    }
    info!("updates listener stopped");
}

/// Interpret one command, mutate the store, enqueue the reply.
pub async fn handle_command(
    command: &Command,
    store: &SubscriptionStore,
    send_tx: &mpsc::Sender<OutboundMessage>,
) -> Result<()> {
    let reply = match command.name.as_str() {
        "start" => {
            let subscription = Subscription {
                user_id: command.user_id,
                user: command.username.clone(),
                subscription_type: SubscriptionType::Status,
            };
            match store.upsert(subscription).await {
                Ok(()) => format!(
                    "Hello *{}*, you are now subscribed to updates",
                    command.username
                ),
                Err(e) => format!("Error adding subscription:\n `{e}`"),
            }
        }
        "stop" => {
            // Propagation failure is already logged by the store; the
            // reply does not change.
            let _ = store.remove(command.user_id).await;
            "Your subscription has been removed".to_string()
        }
        "test" => TEST_REPLY.to_string(),
        _ => "Unknown command".to_string(),
    };

    send_tx
        .send(OutboundMessage {
            chat_id: command.chat_id,
            text: reply,
        })
        .await
        .map_err(|_| Error::QueueClosed)
}
