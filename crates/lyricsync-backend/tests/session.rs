use std::time::Duration;

use lyricsync_backend::ConfigPaths;
use lyricsync_bridge::{
    BridgeChannels, MessageFromBackend, MessageToBackend, notification::NotificationType,
};
use lyricsync_engine::{MatchOutcome, MatchRecord, PositionChanged, Profile};
use tempfile::TempDir;
use tokio::sync::mpsc::{Receiver, Sender};

struct Session {
    tx: Sender<MessageToBackend>,
    rx: Receiver<MessageFromBackend>,
    dir: TempDir,
}

impl Session {
    fn start() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let channels = BridgeChannels::default();
        tokio::spawn(lyricsync_backend::serve(
            ConfigPaths::in_dir(dir.path()),
            channels.backend_rx,
            channels.backend_tx,
        ));

        Self {
            tx: channels.frontend_tx,
            rx: channels.frontend_rx,
            dir,
        }
    }

    async fn send(&self, message: MessageToBackend) {
        self.tx.send(message).await.expect("backend alive");
    }

    async fn recv(&mut self) -> MessageFromBackend {
        self.rx.recv().await.expect("backend alive")
    }

    async fn load(&mut self, lyrics: &str) -> usize {
        self.send(MessageToBackend::SetLyrics(lyrics.to_string()))
            .await;
        match self.recv().await {
            MessageFromBackend::LyricsLoaded { token_count } => token_count,
            other => panic!("expected LyricsLoaded, got {other:?}"),
        }
    }

    async fn word(&mut self, token: &str, confidence: f32) -> MatchRecord {
        self.send(MessageToBackend::ProcessToken {
            token: token.to_string(),
            confidence,
        })
        .await;
        self.record().await
    }

    async fn record(&mut self) -> MatchRecord {
        match self.recv().await {
            MessageFromBackend::MatchRecorded(record) => record,
            other => panic!("expected MatchRecorded, got {other:?}"),
        }
    }

    async fn position(&mut self) -> PositionChanged {
        match self.recv().await {
            MessageFromBackend::PositionChanged(changed) => changed,
            other => panic!("expected PositionChanged, got {other:?}"),
        }
    }

    async fn notification(&mut self) -> NotificationType {
        match self.recv().await {
            MessageFromBackend::NotificationMessage(notification) => {
                notification.notification_type
            }
            other => panic!("expected NotificationMessage, got {other:?}"),
        }
    }

    /// Asserts nothing arrives within `window` of (paused) time.
    async fn silent_for(&mut self, window: Duration) {
        let result = tokio::time::timeout(window, self.rx.recv()).await;
        assert!(result.is_err(), "unexpected message: {result:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn matched_words_move_the_pointer() {
    let mut session = Session::start();
    assert_eq!(session.load("gel bana dogru").await, 3);

    let record = session.word("gel", 0.9).await;
    assert_eq!(record.outcome, MatchOutcome::Correct);
    assert_eq!(session.position().await.position, 1);

    let record = session.word("dogru", 0.9).await;
    assert_eq!(record.target_index, 2);
    let changed = session.position().await;
    assert_eq!(changed.position, 3);
    assert_eq!(changed.accuracy, 1.0);
    assert_eq!(changed.progress, 1.0);
}

#[tokio::test(start_paused = true)]
async fn stall_timer_forces_progress() {
    let mut session = Session::start();
    session.load("gel bana dogru").await;

    for _ in 0..5 {
        let record = session.word("xyzzy", 0.9).await;
        assert_eq!(record.outcome, MatchOutcome::Incorrect);
    }

    // no further input: the paused clock runs straight to the stall deadline
    let record = session.record().await;
    assert_eq!(record.outcome, MatchOutcome::TimedOut);
    assert_eq!(record.target_index, 0);
    assert_eq!(session.position().await.position, 1);

    // the forced advance does not re-arm the timer
    session.silent_for(Duration::from_secs(60)).await;
}

#[tokio::test(start_paused = true)]
async fn reset_cancels_a_pending_stall() {
    let mut session = Session::start();
    session.load("gel bana dogru").await;
    for _ in 0..5 {
        session.word("xyzzy", 0.9).await;
    }

    session.send(MessageToBackend::Reset).await;
    let changed = session.position().await;
    assert_eq!(changed.position, 0);
    assert_eq!(changed.accuracy, 0.0);

    session.silent_for(Duration::from_secs(60)).await;
}

#[tokio::test(start_paused = true)]
async fn partial_word_holds_off_the_stall_timer() {
    let mut session = Session::start();
    session.load("merhaba dunya").await;
    for _ in 0..5 {
        session.word("xyzzy", 0.9).await;
    }

    let record = session.word("mer", 0.5).await;
    assert_eq!(record.outcome, MatchOutcome::Incorrect);
    session.silent_for(Duration::from_secs(60)).await;
}

#[tokio::test(start_paused = true)]
async fn undo_steps_back_once() {
    let mut session = Session::start();
    session.load("gel bana dogru").await;
    session.word("gel", 0.9).await;
    session.position().await;
    session.word("bana", 0.9).await;
    session.position().await;

    session.send(MessageToBackend::UndoLast).await;
    assert_eq!(session.position().await.position, 1);
}

#[tokio::test(start_paused = true)]
async fn undo_at_the_start_only_informs() {
    let mut session = Session::start();
    session.load("gel bana").await;

    session.send(MessageToBackend::UndoLast).await;
    assert_eq!(session.notification().await, NotificationType::Info);
    session.silent_for(Duration::from_secs(60)).await;
}

#[tokio::test(start_paused = true)]
async fn snapshot_resumes_a_session() {
    let mut session = Session::start();
    session.load("gel bana dogru").await;
    session.word("gel", 0.9).await;
    session.position().await;

    session.send(MessageToBackend::SnapshotRequest).await;
    let snapshot = match session.recv().await {
        MessageFromBackend::SnapshotResponse(snapshot) => snapshot,
        other => panic!("expected SnapshotResponse, got {other:?}"),
    };
    assert_eq!(snapshot.current_position, 1);

    let mut resumed = Session::start();
    resumed.load("baska sarki").await;
    resumed
        .send(MessageToBackend::RestoreSnapshot(snapshot))
        .await;
    match resumed.recv().await {
        MessageFromBackend::LyricsLoaded { token_count } => assert_eq!(token_count, 3),
        other => panic!("expected LyricsLoaded, got {other:?}"),
    }
    let changed = resumed.position().await;
    assert_eq!(changed.position, 1);
    assert_eq!(changed.accuracy, 1.0);

    let record = resumed.word("bana", 0.9).await;
    assert_eq!(record.target_index, 1);
}

#[tokio::test(start_paused = true)]
async fn learned_corrections_rewrite_recognizer_words() {
    let mut session = Session::start();
    session.load("merhaba dunya").await;

    for _ in 0..2 {
        session
            .send(MessageToBackend::ApplyCorrection {
                recognized: "marava".to_string(),
                correct: "merhaba".to_string(),
            })
            .await;
        assert_eq!(session.notification().await, NotificationType::Success);
    }
    assert!(session.dir.path().join("corrections.toml").exists());

    let record = session.word("marava", 0.9).await;
    assert_eq!(record.outcome, MatchOutcome::Correct);
    assert_eq!(record.detected.as_deref(), Some("merhaba"));
}

#[tokio::test(start_paused = true)]
async fn profile_selection_is_persisted() {
    let mut session = Session::start();
    session
        .send(MessageToBackend::SelectProfile(Profile::Conservative))
        .await;
    assert_eq!(session.notification().await, NotificationType::Success);

    session.send(MessageToBackend::ConfigurationRequest).await;
    match session.recv().await {
        MessageFromBackend::ConfigurationResponse(config) => {
            assert_eq!(config.engine.profile, Profile::Conservative);
        }
        other => panic!("expected ConfigurationResponse, got {other:?}"),
    }

    let saved = std::fs::read_to_string(session.dir.path().join("config.toml")).expect("config file");
    assert!(saved.contains("conservative"));
}

#[tokio::test(start_paused = true)]
async fn empty_lyrics_warn_and_ignore_words() {
    let mut session = Session::start();
    session
        .send(MessageToBackend::SetLyrics("... !!".to_string()))
        .await;
    assert_eq!(session.notification().await, NotificationType::Warning);
    match session.recv().await {
        MessageFromBackend::LyricsLoaded { token_count } => assert_eq!(token_count, 0),
        other => panic!("expected LyricsLoaded, got {other:?}"),
    }

    session
        .send(MessageToBackend::ProcessToken {
            token: "gel".to_string(),
            confidence: 0.9,
        })
        .await;
    session.silent_for(Duration::from_secs(60)).await;
}
