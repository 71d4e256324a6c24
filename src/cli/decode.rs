//! `tablo decode`: run recorded frames through the decoder.
//!
//! Useful for checking a captured feed against both dialects without a
//! live connection. Each input line is one frame; blank lines are skipped.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::protocol::{Message, decode_frame};

/// Per-run totals
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    pub frames: usize,
    pub messages: usize,
    pub dropped: usize,
}

/// Decode a frame log (or stdin) and print one line per message.
pub fn decode_file(path: Option<&Path>) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let summary = match path {
        Some(path) if path != Path::new("-") => {
            let file = File::open(path)
                .with_context(|| format!("failed to open `{}`", path.display()))?;
            decode_lines(BufReader::new(file), &mut out)?
        }
        _ => decode_lines(io::stdin().lock(), &mut out)?,
    };

    crate::log!(
        "decode";
        "{} frames, {} messages, {} dropped",
        summary.frames,
        summary.messages,
        summary.dropped
    );
    Ok(())
}

pub fn decode_lines(reader: impl BufRead, out: &mut impl Write) -> Result<DecodeSummary> {
    let mut summary = DecodeSummary::default();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let frame = line.trim();
        if frame.is_empty() {
            continue;
        }
        summary.frames += 1;

        match decode_frame(frame) {
            Ok(messages) => {
                for message in &messages {
                    writeln!(out, "{}: {}", number + 1, describe(message))?;
                }
                summary.messages += messages.len();
            }
            Err(e) => {
                writeln!(out, "{}: dropped: {e}", number + 1)?;
                summary.dropped += 1;
            }
        }
    }
    Ok(summary)
}

fn describe(message: &Message) -> String {
    match message {
        Message::Ping => "ping".to_string(),
        Message::RouteSnapshot(route) => {
            let ids: Vec<&str> = route.stops().iter().map(|s| s.id.as_str()).collect();
            match &route.line.name {
                Some(line) => format!("route `{line}` [{}]", ids.join(", ")),
                None => format!("route [{}]", ids.join(", ")),
            }
        }
        Message::PositionUpdate(update) => match update.timestamp {
            Some(ts) => format!("position {} -> {} at {}", update.current, update.next, ts.to_rfc3339()),
            None => format!("position {} -> {}", update.current, update.next),
        },
        Message::Telemetry(t) => {
            let keys: Vec<&str> = t.fields.keys().map(String::as_str).collect();
            format!("telemetry {} {{{}}}", t.source, keys.join(", "))
        }
    }
}
