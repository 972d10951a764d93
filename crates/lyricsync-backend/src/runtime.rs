//! Backend runtime setup and orchestration.
//!
//! This module wires together configuration, the engine and the message
//! dispatch loop that listens to frontend bridge requests.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use lyricsync_bridge::{MessageFromBackend, MessageToBackend};
use lyricsync_engine::{CorrectionStore, LyricsAligner};
use tokio::sync::{
    RwLock,
    mpsc::{Receiver, Sender},
};

use crate::app::AppContext;
use crate::clock::TokioClock;
use crate::config::{ConfigError, ConfigPaths};
use crate::state::State;

/// Loads configuration from `paths` and processes frontend messages until
/// the frontend sender is dropped.
pub async fn serve(
    paths: ConfigPaths,
    rx: Receiver<MessageToBackend>,
    tx: Sender<MessageFromBackend>,
) -> Result<(), ConfigError> {
    let config = crate::config::load_config(&paths).await?;
    let corrections = match crate::config::load_corrections(&paths, config.corrections).await {
        Ok(corrections) => corrections,
        Err(error) => {
            log::warn!("Ignoring unreadable corrections file: {error}");
            CorrectionStore::new(config.corrections)
        }
    };
    log::info!(
        "Backend ready: profile {:?}, {} learned corrections",
        config.engine.profile,
        corrections.len()
    );

    let state = Arc::new(RwLock::new(State {
        aligner: LyricsAligner::with_clock(config.engine, TokioClock),
        config,
        paths,
        corrections,
    }));

    let context = Arc::new(AppContext { state, tx });
    context.consume_bridge_messages(rx).await;

    Ok(())
}

/// Spawn the backend runtime on its own thread and begin processing bridge
/// messages. The thread ends once the frontend sender is dropped.
pub fn run(rx: Receiver<MessageToBackend>, tx: Sender<MessageFromBackend>) -> JoinHandle<()> {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(error) => {
                log::error!("Failed to build tokio runtime: {error}");
                return;
            }
        };

        runtime.block_on(async {
            let result = match ConfigPaths::from_project_dirs() {
                Ok(paths) => serve(paths, rx, tx).await,
                Err(error) => Err(error),
            };
            if let Err(error) = result {
                log::error!("Backend stopped: {error}");
            }
        });
    })
}
