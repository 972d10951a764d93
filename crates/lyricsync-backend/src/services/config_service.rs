use lyricsync_bridge::{MessageFromBackend, notification::NotificationType};
use lyricsync_engine::Profile;

/// Handles an incoming configuration request (see
/// [`lyricsync_bridge::MessageToBackend::ConfigurationRequest`]).
pub async fn handle_config_request(context: super::AppContextHandle) {
    let config = {
        let state = context.state.read().await;
        state.config.clone()
    };
    context
        .send(MessageFromBackend::ConfigurationResponse(config))
        .await;
}

/// Switches the matching profile and persists it to config.
///
/// An explicit threshold override is dropped so the new profile's preset
/// takes effect. The current take keeps its position.
pub async fn handle_profile_selection(context: super::AppContextHandle, profile: Profile) {
    let saved = {
        let mut state = context.state.write().await;
        state.config.engine.profile = profile;
        state.config.engine.threshold = None;
        let engine = state.config.engine;
        state.aligner.set_config(engine);
        crate::config::save_config(&state.paths, &state.config).await
    };

    match saved {
        Ok(()) => {
            context
                .send_notification(
                    NotificationType::Success,
                    format!("Switched to the {profile:?} profile."),
                )
                .await;
        }
        Err(error) => {
            log::error!("Failed to persist profile selection: {error}");
            context
                .send_notification(
                    NotificationType::Warning,
                    "Profile switched for this session but could not be saved.",
                )
                .await;
        }
    }
}
