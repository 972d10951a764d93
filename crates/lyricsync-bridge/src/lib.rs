//! Communication bridge between frontend and backend.
//!
//! This crate defines the types used to connect a lyrics frontend (a karaoke
//! screen, the replay CLI) with the asynchronous backend that owns the
//! alignment engine.
//!
//! The flow is unidirectional in both directions:
//! - The frontend sends commands (load lyrics, feed a recognized word, undo,
//!   request a snapshot).
//! - The backend pushes events (match records, position changes,
//!   notifications).
//!
//! Communication happens over bounded [`tokio::sync::mpsc`] channels wrapped
//! in [`BridgeChannels`].

pub mod config;
pub mod notification;

use lyricsync_engine::{AlignmentSnapshot, MatchRecord, PositionChanged, Profile};
use tokio::sync::mpsc::{self, Receiver, Sender};

/// Messages emitted by the backend to inform the frontend of state updates.
#[derive(Debug, Clone)]
pub enum MessageFromBackend {
    /// Generic message for all notifications in the application.
    NotificationMessage(notification::NotificationMessage),
    /// Response to the configuration request from the frontend.
    ConfigurationResponse(config::Config),
    /// New lyrics were tokenized and the take starts from the beginning.
    LyricsLoaded {
        /// Number of reference tokens after normalization.
        token_count: usize,
    },
    /// A history slot was written for the last recognized word or for a
    /// forced stall advance.
    MatchRecorded(MatchRecord),
    /// The alignment pointer moved.
    PositionChanged(PositionChanged),
    /// Response to a snapshot request.
    SnapshotResponse(AlignmentSnapshot),
}

/// Commands issued by the frontend to control or query the backend.
#[derive(Debug, Clone)]
pub enum MessageToBackend {
    /// Request for the application configuration.
    ConfigurationRequest,
    /// Switch the matching profile and persist the choice.
    SelectProfile(Profile),
    /// Load a new song.
    SetLyrics(String),
    /// One word produced by the speech recognizer.
    ProcessToken {
        token: String,
        /// Recognizer confidence in `[0, 1]`.
        confidence: f32,
    },
    /// Restart the current take.
    Reset,
    /// Step back over the last matched token.
    UndoLast,
    /// The singer fixed a misrecognized word by hand.
    ApplyCorrection { recognized: String, correct: String },
    SnapshotRequest,
    RestoreSnapshot(AlignmentSnapshot),
}

/// Paired `tokio::mpsc` channels for bidirectional communication between
/// frontend and backend.
pub struct BridgeChannels {
    /// Receiver used by the frontend to get messages from the backend.
    pub frontend_rx: Receiver<MessageFromBackend>,
    /// Sender used by the frontend to send commands to the backend.
    pub frontend_tx: Sender<MessageToBackend>,

    /// Receiver used by the backend to get commands from the frontend.
    pub backend_rx: Receiver<MessageToBackend>,
    /// Sender used by the backend to send events/responses to the frontend.
    pub backend_tx: Sender<MessageFromBackend>,
}

impl BridgeChannels {
    /// Creates a new pair of bridged channels with the given buffer capacity.
    pub fn new(buffer: usize) -> Self {
        let (to_backend_tx, to_backend_rx) = mpsc::channel(buffer);
        let (to_frontend_tx, to_frontend_rx) = mpsc::channel(buffer);
        Self {
            frontend_tx: to_backend_tx,
            frontend_rx: to_frontend_rx,
            backend_rx: to_backend_rx,
            backend_tx: to_frontend_tx,
        }
    }
}

impl Default for BridgeChannels {
    fn default() -> Self {
        Self::new(64)
    }
}
