//! Application context and message dispatching utilities.
//!
//! The context contains the shared state and provides helpers for sending
//! responses and notifications back to the frontend bridge.

use std::sync::Arc;

use lyricsync_bridge::{
    MessageFromBackend, MessageToBackend,
    notification::{NotificationMessage, NotificationType},
};
use lyricsync_engine::{StallTicket, StallTimer};
use tokio::sync::mpsc::{Receiver, Sender};

use crate::services;
use crate::state::SharedState;

/// Shared application context passed to services and message handlers.
pub(crate) struct AppContext {
    /// Mutable backend state shared across services.
    pub state: SharedState,
    /// Outbound channel to the frontend bridge.
    pub tx: Sender<MessageFromBackend>,
}

impl AppContext {
    /// Read and dispatch messages from the frontend bridge until it closes,
    /// firing the engine's stall timer in between.
    ///
    /// The timer is re-read after every message, so a re-armed or cancelled
    /// timer replaces the previous sleep.
    pub async fn consume_bridge_messages(self: &Arc<Self>, mut rx: Receiver<MessageToBackend>) {
        loop {
            let stall_timer = self.state.read().await.aligner.pending_stall_timer();

            tokio::select! {
                biased;

                message = rx.recv() => match message {
                    Some(message) => {
                        log::debug!("Got a frontend message: {message:?}");
                        self.dispatch_message(message).await;
                    }
                    None => break,
                },
                ticket = wait_for(stall_timer) => {
                    services::recognition_service::handle_stall_timeout(self.clone(), ticket).await;
                }
            }
        }

        log::info!("Frontend disconnected, ending alignment session");
    }

    /// Dispatches the received message from frontend down to individual
    /// service handlers.
    async fn dispatch_message(self: &Arc<Self>, message: MessageToBackend) {
        match message {
            MessageToBackend::ConfigurationRequest => {
                services::config_service::handle_config_request(self.clone()).await;
            }
            MessageToBackend::SelectProfile(profile) => {
                services::config_service::handle_profile_selection(self.clone(), profile).await;
            }
            MessageToBackend::SetLyrics(text) => {
                services::lyrics_service::handle_set_lyrics(self.clone(), text).await;
            }
            MessageToBackend::ProcessToken { token, confidence } => {
                services::recognition_service::handle_token(self.clone(), token, confidence).await;
            }
            MessageToBackend::Reset => {
                services::lyrics_service::handle_reset(self.clone()).await;
            }
            MessageToBackend::UndoLast => {
                services::lyrics_service::handle_undo(self.clone()).await;
            }
            MessageToBackend::ApplyCorrection { recognized, correct } => {
                services::correction_service::handle_apply_correction(
                    self.clone(),
                    recognized,
                    correct,
                )
                .await;
            }
            MessageToBackend::SnapshotRequest => {
                services::lyrics_service::handle_snapshot_request(self.clone()).await;
            }
            MessageToBackend::RestoreSnapshot(snapshot) => {
                services::lyrics_service::handle_restore_snapshot(self.clone(), snapshot).await;
            }
        }
    }

    /// Send a message to the frontend bridge.
    pub async fn send(&self, message: MessageFromBackend) {
        if let Err(error) = self.tx.send(message).await {
            log::warn!("Frontend is gone, dropping message: {:?}", error.0);
        }
    }

    /// Send a notification message to the frontend bridge.
    pub async fn send_notification(
        &self,
        notification_type: NotificationType,
        content: impl Into<String>,
    ) {
        self.send(MessageFromBackend::NotificationMessage(
            NotificationMessage {
                notification_type,
                message: content.into(),
            },
        ))
        .await;
    }
}

/// Resolves with the ticket once the timer is due; never resolves without one.
async fn wait_for(timer: Option<StallTimer>) -> StallTicket {
    match timer {
        Some(timer) => {
            tokio::time::sleep_until(tokio::time::Instant::from_std(timer.deadline)).await;
            timer.ticket
        }
        None => std::future::pending().await,
    }
}
