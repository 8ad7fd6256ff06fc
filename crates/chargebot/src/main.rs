use std::sync::Arc;

use teloxide::Bot;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use chargebot_core::{
    config::Config,
    dispatch,
    fanout::{self, Notifier},
    listener,
    ports::MessageSender,
    repo::JsonRepository,
    service::{Core, EventHandler},
    store::SubscriptionStore,
    QUEUE_CAPACITY,
};
use chargebot_telegram::{TelegramSender, TelegramUpdates};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chargebot_core::logging::init("chargebot");

    let cfg = Arc::new(Config::load()?);
    let bot = Bot::new(cfg.bot_token.clone());

    let repo = Arc::new(JsonRepository::new(cfg.state_file.clone()));
    let store = Arc::new(SubscriptionStore::new(repo.clone()));
    store.load().await;

    let (event_tx, event_rx) = mpsc::channel(QUEUE_CAPACITY);
    let (send_tx, send_rx) = mpsc::channel(QUEUE_CAPACITY);
    let cancel = CancellationToken::new();

    let sender: Arc<dyn MessageSender> = Arc::new(TelegramSender::new(bot.clone()));
    let updates = TelegramUpdates::new(bot, cfg.poll_timeout);

    let listener_pump = tokio::spawn(listener::run(
        updates,
        store.clone(),
        send_tx.clone(),
        cancel.clone(),
    ));
    let fanout_pump = tokio::spawn(fanout::run(
        event_rx,
        store,
        send_tx.clone(),
        cancel.clone(),
    ));
    let dispatcher_pump = tokio::spawn(dispatch::run(
        send_rx,
        sender,
        cfg.send_workers,
        cancel.clone(),
    ));

    // Composition point for the outer API layer: everything it calls into
    // the bot with goes through this handler. Held alive so the event
    // queue stays open for the lifetime of the process.
    let _handler: Arc<dyn EventHandler> =
        Arc::new(Core::new(repo, Notifier::new(event_tx), send_tx));

    info!(workers = cfg.send_workers, "chargebot started");

    wait_for_shutdown_signal().await?;
    info!("shutdown signal received, draining");

    cancel.cancel();
    let _ = tokio::join!(listener_pump, fanout_pump, dispatcher_pump);
    info!("chargebot stopped");
    Ok(())
}

/// Completes when the process receives SIGINT or SIGTERM (Ctrl-C on
/// non-unix platforms).
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => {},
        _ = sigterm.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
