use lyricsync_bridge::{MessageFromBackend, notification::NotificationType};
use lyricsync_engine::AlignmentSnapshot;

/// Loads a new song into the engine.
pub async fn handle_set_lyrics(context: super::AppContextHandle, text: String) {
    let token_count = {
        let mut state = context.state.write().await;
        state.aligner.set_lyrics(&text);
        state.aligner.len()
    };

    if token_count == 0 {
        context
            .send_notification(NotificationType::Warning, "The lyrics contain no words.")
            .await;
    }
    context
        .send(MessageFromBackend::LyricsLoaded { token_count })
        .await;
}

/// Restarts the current take from the first token.
pub async fn handle_reset(context: super::AppContextHandle) {
    let changed = {
        let mut state = context.state.write().await;
        state.aligner.reset();
        state.aligner.position_changed()
    };
    context
        .send(MessageFromBackend::PositionChanged(changed))
        .await;
}

pub async fn handle_undo(context: super::AppContextHandle) {
    let changed = {
        let mut state = context.state.write().await;
        state.aligner.undo_last()
    };

    match changed {
        Some(changed) => {
            context
                .send(MessageFromBackend::PositionChanged(changed))
                .await;
        }
        None => {
            log::debug!("Nothing to undo");
            context
                .send_notification(NotificationType::Info, "Nothing to undo.")
                .await;
        }
    }
}

pub async fn handle_snapshot_request(context: super::AppContextHandle) {
    let snapshot = {
        let state = context.state.read().await;
        state.aligner.snapshot()
    };
    context
        .send(MessageFromBackend::SnapshotResponse(snapshot))
        .await;
}

/// Resumes a session from a snapshot. On a mismatched snapshot the lyrics
/// stay loaded and the take starts over.
pub async fn handle_restore_snapshot(context: super::AppContextHandle, snapshot: AlignmentSnapshot) {
    let (restored, token_count, changed) = {
        let mut state = context.state.write().await;
        let restored = state.aligner.restore(snapshot);
        (
            restored,
            state.aligner.len(),
            state.aligner.position_changed(),
        )
    };

    if let Err(error) = restored {
        log::warn!("Rejected snapshot: {error}");
        context
            .send_notification(
                NotificationType::Error,
                format!("Could not resume the session: {error}."),
            )
            .await;
    }
    context
        .send(MessageFromBackend::LyricsLoaded { token_count })
        .await;
    context
        .send(MessageFromBackend::PositionChanged(changed))
        .await;
}
