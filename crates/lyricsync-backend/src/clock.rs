use std::time::Instant;

use lyricsync_engine::Clock;

/// Engine clock that reads tokio's notion of time.
///
/// Under a paused test runtime this follows the mocked clock, which keeps
/// the engine's stall bookkeeping consistent with `sleep_until` deadlines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}
