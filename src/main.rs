mod replay;

use std::{
    fs,
    io::Read,
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, anyhow};
use clap::{Parser, ValueEnum};
use lyricsync_bridge::{BridgeChannels, MessageFromBackend, MessageToBackend};
use lyricsync_engine::{MatchOutcome, PositionChanged, Profile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProfileChoice {
    Aggressive,
    Conservative,
}

impl From<ProfileChoice> for Profile {
    fn from(choice: ProfileChoice) -> Self {
        match choice {
            ProfileChoice::Aggressive => Profile::Aggressive,
            ProfileChoice::Conservative => Profile::Conservative,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "lyricsync")]
#[command(about = "Replay a recognizer transcript against song lyrics")]
struct Args {
    /// Plain text file with the song lyrics.
    #[arg(long)]
    lyrics: PathBuf,
    /// Transcript file, one `word [confidence] [@offset_ms]` per line. Read
    /// from stdin when absent.
    #[arg(long)]
    transcript: Option<PathBuf>,
    /// Switch to this matching profile. The choice is stored in the
    /// configuration file.
    #[arg(long, value_enum)]
    profile: Option<ProfileChoice>,
    /// Wait for each word's offset before sending it, so stall timeouts can
    /// fire during silences.
    #[arg(long, default_value_t = false)]
    paced: bool,
    /// Seconds to wait after the last word for a pending stall timeout.
    #[arg(long, default_value_t = 0)]
    linger: u64,
}

fn main() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .with_colors(true)
        .with_threads(true)
        .with_local_timestamps()
        .env()
        .init()
        .context("failed to build logger instance")?;

    let args = Args::parse();
    let lyrics = fs::read_to_string(&args.lyrics)
        .with_context(|| format!("failed to read lyrics from {:?}", args.lyrics))?;
    let transcript = match &args.transcript {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read transcript from {path:?}"))?,
        None => {
            let mut transcript = String::new();
            std::io::stdin()
                .read_to_string(&mut transcript)
                .context("failed to read transcript from stdin")?;
            transcript
        }
    };
    let events = replay::parse_transcript(&transcript)?;

    let channels = BridgeChannels::default();
    let backend = lyricsync_backend::run(channels.backend_rx, channels.backend_tx);
    let mut frontend_rx = channels.frontend_rx;
    let printer = thread::spawn(move || {
        let mut last = None;
        while let Some(message) = frontend_rx.blocking_recv() {
            if let Some(changed) = print_message(&message) {
                last = Some(changed);
            }
        }
        last
    });

    let tx = channels.frontend_tx;
    let send = |message: MessageToBackend| {
        tx.blocking_send(message)
            .map_err(|_| anyhow!("backend stopped unexpectedly"))
    };

    if let Some(profile) = args.profile {
        send(MessageToBackend::SelectProfile(profile.into()))?;
    }
    send(MessageToBackend::SetLyrics(lyrics))?;

    let started = Instant::now();
    for event in events {
        if args.paced
            && let Some(offset) = event.offset
        {
            let elapsed = started.elapsed();
            if offset > elapsed {
                thread::sleep(offset - elapsed);
            }
        }
        send(MessageToBackend::ProcessToken {
            token: event.word,
            confidence: event.confidence,
        })?;
    }

    if args.linger > 0 {
        thread::sleep(Duration::from_secs(args.linger));
    }
    drop(send);
    drop(tx);

    let last = printer
        .join()
        .map_err(|_| anyhow!("printer thread panicked"))?;
    if backend.join().is_err() {
        log::error!("Backend thread panicked");
    }

    match last {
        Some(changed) => println!(
            "Finished at position {} ({:.0}% through the song, {:.0}% accurate)",
            changed.position,
            changed.progress * 100.0,
            changed.accuracy * 100.0
        ),
        None => println!("The pointer never moved"),
    }

    Ok(())
}

/// Prints one backend message, returning it when it is a position change.
fn print_message(message: &MessageFromBackend) -> Option<PositionChanged> {
    match message {
        MessageFromBackend::NotificationMessage(notification) => {
            println!("[{:?}] {}", notification.notification_type, notification.message);
        }
        MessageFromBackend::LyricsLoaded { token_count } => {
            println!("Loaded {token_count} words");
        }
        MessageFromBackend::MatchRecorded(record) => {
            let heard = record.detected.as_deref().unwrap_or("-");
            let mark = match record.outcome {
                MatchOutcome::Correct => "ok",
                MatchOutcome::Incorrect => "miss",
                MatchOutcome::Skipped => "skip",
                MatchOutcome::TimedOut => "timeout",
            };
            println!(
                "  #{:<4} {mark:<7} {heard} ({:.2})",
                record.target_index, record.confidence
            );
        }
        MessageFromBackend::PositionChanged(changed) => {
            println!(
                "-> position {} | progress {:.0}% | accuracy {:.0}%",
                changed.position,
                changed.progress * 100.0,
                changed.accuracy * 100.0
            );
            return Some(*changed);
        }
        MessageFromBackend::ConfigurationResponse(config) => {
            println!("Configuration: {config:?}");
        }
        MessageFromBackend::SnapshotResponse(snapshot) => {
            println!("Snapshot at position {}", snapshot.current_position);
        }
    }

    None
}
