use lyricsync_bridge::config::Config;
use lyricsync_engine::{CorrectionStore, LyricsAligner};

use crate::{clock::TokioClock, config::ConfigPaths};

/// The core backend state: configuration, the alignment engine and the
/// learned corrections.
///
/// Services access it through [`SharedState`]. Only the dispatch task ever
/// takes the lock, so a handler sees the engine exactly as the previous
/// handler left it.
pub struct State {
    /// The loaded application configuration.
    pub config: Config,
    /// Where configuration and corrections are persisted.
    pub paths: ConfigPaths,
    /// The single alignment engine of this session.
    pub aligner: LyricsAligner<TokioClock>,
    /// Corrections applied to recognizer words before alignment.
    pub corrections: CorrectionStore,
}

/// Async-friendly shared reference to the backend [`State`].
pub type SharedState = std::sync::Arc<tokio::sync::RwLock<State>>;
