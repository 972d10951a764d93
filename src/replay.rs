//! Recognizer transcript format.
//!
//! One event per line: `word [confidence] [@offset_ms]`. Blank lines and
//! lines starting with `#` are skipped. The confidence defaults to 1 and the
//! offset, measured from the start of the replay, is only used when pacing.

use std::time::Duration;

use anyhow::{Context, bail};

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEvent {
    pub word: String,
    pub confidence: f32,
    pub offset: Option<Duration>,
}

pub fn parse_transcript(text: &str) -> anyhow::Result<Vec<TranscriptEvent>> {
    let mut events = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let event = parse_line(line).with_context(|| format!("transcript line {}", number + 1))?;
        events.push(event);
    }

    Ok(events)
}

fn parse_line(line: &str) -> anyhow::Result<TranscriptEvent> {
    let mut fields = line.split_whitespace();
    let Some(word) = fields.next() else {
        bail!("missing word");
    };

    let mut confidence = None;
    let mut offset = None;
    for field in fields {
        if let Some(milliseconds) = field.strip_prefix('@') {
            if offset.is_some() {
                bail!("more than one offset");
            }
            let milliseconds: u64 = milliseconds
                .parse()
                .with_context(|| format!("invalid offset {field:?}"))?;
            offset = Some(Duration::from_millis(milliseconds));
        } else {
            if confidence.is_some() {
                bail!("unexpected field {field:?}");
            }
            let value: f32 = field
                .parse()
                .with_context(|| format!("invalid confidence {field:?}"))?;
            if !(0.0..=1.0).contains(&value) {
                bail!("confidence {value} is outside [0, 1]");
            }
            confidence = Some(value);
        }
    }

    Ok(TranscriptEvent {
        word: word.to_string(),
        confidence: confidence.unwrap_or(1.0),
        offset,
    })
}
