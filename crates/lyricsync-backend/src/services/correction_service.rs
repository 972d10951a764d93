use lyricsync_bridge::notification::NotificationType;

/// Remembers a manual correction and persists the store.
pub async fn handle_apply_correction(
    context: super::AppContextHandle,
    recognized: String,
    correct: String,
) {
    let saved = {
        let mut state = context.state.write().await;
        if !state.corrections.learn(&recognized, &correct) {
            None
        } else {
            Some(crate::config::save_corrections(&state.paths, &state.corrections).await)
        }
    };

    match saved {
        None => {
            context
                .send_notification(
                    NotificationType::Warning,
                    format!("Ignored correction {recognized:?} -> {correct:?}."),
                )
                .await;
        }
        Some(Ok(())) => {
            log::info!("Learned correction {recognized:?} -> {correct:?}");
            context
                .send_notification(
                    NotificationType::Success,
                    format!("Learned correction {recognized:?} -> {correct:?}."),
                )
                .await;
        }
        Some(Err(error)) => {
            log::error!("Failed to persist corrections: {error}");
            context
                .send_notification(
                    NotificationType::Warning,
                    "Correction learned for this session but could not be saved.",
                )
                .await;
        }
    }
}
