//! Event fan-out pump: filters domain status events and broadcasts a
//! notification to every current subscriber.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    domain::{ChatId, OutboundMessage, StatusEvent},
    sanitize,
    store::SubscriptionStore,
    Error, Result,
};

/// The only status that is broadcast. Everything else is dropped on
/// purpose; this is a visibility policy, not an oversight.
const FORWARDED_STATUS: &str = "Faulted";

/// Entry point handed to the external event source. `notify` blocks when
/// the event queue is full, which backpressures the source against the
/// dispatcher.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<StatusEvent>,
}

impl Notifier {
    pub fn new(tx: mpsc::Sender<StatusEvent>) -> Self {
        Self { tx }
    }

    pub async fn notify(&self, event: StatusEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| Error::QueueClosed)
    }
}

/// Notification text for a forwarded event: the bolded event kind and the
/// code-quoted status, plus the escaped info line when info is present.
pub fn format_notification(event: &StatusEvent) -> String {
    let mut text = format!("*{}*: `{}`\n", event.kind, event.status);
    if !event.info.is_empty() {
        text.push_str(&format!("{}\n", sanitize::escape(&event.info)));
    }
    text
}

/// Consume the event queue until cancellation.
pub async fn run(
    mut events: mpsc::Receiver<StatusEvent>,
    store: Arc<SubscriptionStore>,
    send_tx: mpsc::Sender<OutboundMessage>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        if fan_out(&event, &store, &send_tx).await.is_err() {
            // Send queue closed; the dispatcher is gone.
            break;
        }
    }
    info!("event fanout stopped");
}

/// Broadcast one event to a snapshot of the current subscriber set.
///
/// Subscribers added after the snapshot do not receive this event;
/// subscribers removed after it may still receive it.
async fn fan_out(
    event: &StatusEvent,
    store: &SubscriptionStore,
    send_tx: &mpsc::Sender<OutboundMessage>,
) -> Result<()> {
    if event.status != FORWARDED_STATUS {
        debug!(status = %event.status, "event dropped by status filter");
        return Ok(());
    }

    let text = format_notification(event);
    let snapshot = store.list().await;
    debug!(subscribers = snapshot.len(), kind = %event.kind, "broadcasting event");

    for subscription in snapshot {
        send_tx
            .send(OutboundMessage {
                chat_id: ChatId(subscription.user_id.0),
                text: text.clone(),
            })
            .await
            .map_err(|_| Error::QueueClosed)?;
    }
    Ok(())
}
