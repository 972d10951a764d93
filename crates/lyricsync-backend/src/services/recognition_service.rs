use lyricsync_bridge::MessageFromBackend;
use lyricsync_engine::{MatchOutcomeEvent, StallTicket};

/// Feeds one recognizer word to the engine, after applying learned
/// corrections.
pub async fn handle_token(context: super::AppContextHandle, token: String, confidence: f32) {
    let event = {
        let mut state = context.state.write().await;
        let word = match state.corrections.correct(&token) {
            Some(corrected) => {
                log::debug!("Rewriting {token:?} as {corrected:?}");
                corrected.to_string()
            }
            None => token,
        };
        state.aligner.process_token(&word, confidence)
    };

    if let Some(event) = event {
        publish(&context, event).await;
    }
}

/// Handles a due stall timer. Stale tickets are ignored by the engine.
pub async fn handle_stall_timeout(context: super::AppContextHandle, ticket: StallTicket) {
    let event = {
        let mut state = context.state.write().await;
        state.aligner.on_stall_timeout(ticket)
    };

    if let Some(event) = event {
        publish(&context, event).await;
    }
}

async fn publish(context: &super::AppContextHandle, event: MatchOutcomeEvent) {
    context
        .send(MessageFromBackend::MatchRecorded(event.record))
        .await;
    if let Some(changed) = event.position_changed {
        context
            .send(MessageFromBackend::PositionChanged(changed))
            .await;
    }
}
