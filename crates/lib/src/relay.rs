//! Relay loop: verify the bot, start the Telegram long poll, and dispatch inbound
//! messages one at a time until shutdown.

use crate::channels::{InboundMessage, TelegramChannel};
use crate::config::Settings;
use crate::dispatch::Dispatcher;
use crate::qa::{QaBackend, QaClient};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;

const INBOUND_QUEUE: usize = 64;

/// Run the relay. Blocks until SIGINT/SIGTERM.
/// Fails early if the bot token is rejected by getMe.
pub async fn run(mut settings: Settings) -> Result<()> {
    let telegram = Arc::new(TelegramChannel::new(
        settings.bot_token.clone(),
        Some(settings.telegram_api_base.clone()),
        settings.poll_timeout_secs,
    ));

    let me = telegram
        .get_me()
        .await
        .context("verifying bot credential with getMe")?;
    log::info!(
        "authorized on account {}",
        me.username.as_deref().unwrap_or("<no username>")
    );
    if settings.bot_username.is_none() {
        settings.bot_username = me.username;
    }

    let qa = QaClient::new(&settings.qa);
    let dispatcher = Dispatcher::new(Arc::new(settings), telegram.clone(), qa);

    let (inbound_tx, inbound_rx) = mpsc::channel::<InboundMessage>(INBOUND_QUEUE);
    let poller = telegram.clone().start_inbound(inbound_tx);

    tokio::select! {
        _ = process_inbound(&dispatcher, inbound_rx) => {
            log::warn!("inbound queue closed");
        }
        _ = shutdown_signal() => {
            log::info!("shutdown signal received, stopping telegram poll loop");
        }
    }

    telegram.stop();
    poller.abort();
    let _ = poller.await;
    log::info!("relay stopped");
    Ok(())
}

/// Handle queued messages strictly in arrival order, one at a time.
pub async fn process_inbound<B: QaBackend>(
    dispatcher: &Dispatcher<B>,
    mut inbound_rx: mpsc::Receiver<InboundMessage>,
) {
    while let Some(msg) = inbound_rx.recv().await {
        dispatcher.process(&msg).await;
    }
}

/// Completes on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
