//! Outbound send pump: a fixed pool of workers drains the send queue and
//! delivers each message through a three-tier degrading fallback ladder.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{domain::OutboundMessage, ports::MessageSender, sanitize};

/// Drain the send queue with `workers` concurrent workers until the queue
/// closes or cancellation is requested.
///
/// Two messages dequeued in order may still complete delivery out of
/// order; nothing orders the workers among themselves.
pub async fn run(
    receiver: mpsc::Receiver<OutboundMessage>,
    sender: Arc<dyn MessageSender>,
    workers: usize,
    cancel: CancellationToken,
) {
    let receiver = Arc::new(Mutex::new(receiver));
    let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(workers);

    for _ in 0..workers {
        let receiver = receiver.clone();
        let sender = sender.clone();
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            loop {
                let message = {
                    let mut rx = receiver.lock().await;
                    tokio::select! {
                        _ = cancel.cancelled() => None,
                        message = rx.recv() => message,
                    }
                };
                let Some(message) = message else {
                    // Deliver whatever is already queued before stopping.
                    loop {
                        let drained = { receiver.lock().await.try_recv().ok() };
                        match drained {
                            Some(message) => deliver(sender.as_ref(), &message).await,
                            None => break,
                        }
                    }
                    break;
                };
                deliver(sender.as_ref(), &message).await;
            }
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }
    info!("send dispatcher stopped");
}

/// One delivery attempt with its fallback ladder:
///
/// 1. the text as-is, in the platform's markup dialect;
/// 2. the original stripped of markup, behind an error notice;
/// 3. a minimal message carrying tier 2's error;
/// 4. log and drop.
///
/// No retry survives this function; a dropped message is gone.
pub async fn deliver(sender: &dyn MessageSender, message: &OutboundMessage) {
    let Err(_markup_err) = sender.send_markdown(message.chat_id, &message.text).await else {
        return;
    };

    let degraded = format!(
        "This message caused an error:\n{}",
        sanitize::strip(&message.text)
    );
    let Err(plain_err) = sender.send_plain(message.chat_id, &degraded).await else {
        return;
    };
    error!(chat_id = message.chat_id.0, error = %plain_err, "sending no markup message");

    // Maybe the failure was in parsing, so a message about the error
    // itself can still get through.
    let notice = format!("Error: {plain_err}");
    if let Err(e) = sender.send_plain(message.chat_id, &notice).await {
        error!(chat_id = message.chat_id.0, error = %e, "sending message");
    }
}
