//! Render Actor - the bundled rendering surfaces
//!
//! Turns [`RenderCommand`]s into terminal output or JSON lines, and answers
//! every `DrawRoute` with estimated label widths so the display can settle.
//!
//! The display also waits on this actor's queue, so widths are never sent
//! with a blocking `send`. When the display queue is full the newest
//! measurement is held and delivered once there is room.

use std::io::Write;

use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::messages::{DisplayMsg, RenderCommand};
use crate::feed::ConnectionState;
use crate::layout::LabelWidths;
use crate::logger::{status_detach, status_error, status_success, status_warning};
use crate::route::{Stop, StopId};
use crate::{debug, log};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Status line and log output for an attached terminal
    Terminal,
    /// One JSON object per command on stdout
    JsonLines,
}

/// Label width as `glyph_width` per character of the longer name.
pub fn estimate_widths(stops: &[Stop], glyph_width: f64) -> LabelWidths {
    stops
        .iter()
        .map(|stop| {
            let chars = stop
                .secondary_name
                .as_deref()
                .map_or(0, |s| s.chars().count())
                .max(stop.name.chars().count());
            (stop.id.clone(), chars as f64 * glyph_width)
        })
        .collect()
}

pub struct RenderActor {
    rx: mpsc::Receiver<RenderCommand>,
    display_tx: mpsc::Sender<DisplayMsg>,
    mode: RenderMode,
    glyph_width: f64,
    /// Stop names of the drawn route
    names: FxHashMap<StopId, String>,
    /// Measurement waiting for room in the display queue
    unsent: Option<DisplayMsg>,
}

impl RenderActor {
    pub fn new(
        rx: mpsc::Receiver<RenderCommand>,
        display_tx: mpsc::Sender<DisplayMsg>,
        mode: RenderMode,
        glyph_width: f64,
    ) -> Self {
        Self {
            rx,
            display_tx,
            mode,
            glyph_width,
            names: FxHashMap::default(),
            unsent: None,
        }
    }

    /// Run the actor event loop.
    pub async fn run(mut self) {
        loop {
            let display_tx = self.display_tx.clone();
            tokio::select! {
                permit = display_tx.reserve(), if self.unsent.is_some() => {
                    match (permit, self.unsent.take()) {
                        (Ok(permit), Some(measured)) => permit.send(measured),
                        (Err(_), _) => debug!("render"; "display gone, measurement dropped"),
                        (Ok(_), None) => {}
                    }
                }
                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
            }
        }
        status_detach();
    }

    fn handle(&mut self, cmd: RenderCommand) {
        if let RenderCommand::DrawRoute {
            revision, stops, ..
        } = &cmd
        {
            self.names = stops
                .iter()
                .map(|stop| (stop.id.clone(), stop.name.clone()))
                .collect();
            let widths = estimate_widths(stops, self.glyph_width);
            self.offer(DisplayMsg::Measured {
                revision: *revision,
                widths,
            });
        }

        match self.mode {
            RenderMode::Terminal => self.draw(&cmd),
            RenderMode::JsonLines => print_json(&cmd),
        }
    }

    /// Queue widths for the display without waiting. A newer measurement
    /// replaces one still held here.
    fn offer(&mut self, measured: DisplayMsg) {
        self.unsent = None;
        match self.display_tx.try_send(measured) {
            Ok(()) => {}
            Err(TrySendError::Full(measured)) => {
                debug!("render"; "display busy, holding measurement");
                self.unsent = Some(measured);
            }
            Err(TrySendError::Closed(_)) => debug!("render"; "display gone, measurement dropped"),
        }
    }

    fn name<'a>(&'a self, id: &'a StopId) -> &'a str {
        self.names.get(id).map_or(id.as_str(), String::as_str)
    }

    fn draw(&self, cmd: &RenderCommand) {
        match cmd {
            RenderCommand::ConnectionStatus { state, attempts } => match state {
                ConnectionState::Open => status_success("feed connected"),
                ConnectionState::Connecting => status_warning("connecting to feed"),
                ConnectionState::Reconnecting => {
                    status_warning(&format!("reconnecting (attempt {})", attempts))
                }
                ConnectionState::Closed => status_warning("feed closed"),
            },
            RenderCommand::ConnectionLost { attempts } => status_error(
                "feed lost",
                &format!("no connection after {} attempts", attempts),
            ),
            RenderCommand::DrawRoute { line, stops, .. } => {
                let names: Vec<&str> = stops.iter().map(|stop| stop.name.as_str()).collect();
                let line_name = line.name.as_deref().unwrap_or("route");
                status_detach();
                log!("route"; "{}: {}", line_name, names.join(" - "));
            }
            RenderCommand::Position {
                current,
                next,
                current_index,
            } => {
                status_detach();
                log!("route"; "#{} {} (next {})", current_index, self.name(current), self.name(next));
            }
            RenderCommand::Layout { revision, layout } => {
                debug!("layout"; "revision {}: {} slots, line {:.0}", revision, layout.slots.len(), layout.line.length);
            }
            RenderCommand::Animate {
                kind,
                from,
                to,
                duration_ms,
                ..
            } => {
                debug!("anim"; "{} {:.1} -> {:.1} in {}ms", kind.label(), from, to, duration_ms);
            }
            RenderCommand::TransitionDone { kind, .. } => debug!("anim"; "{} done", kind.label()),
            RenderCommand::Telemetry(telemetry) => {
                debug!("feed"; "{} {}", telemetry.source, serde_json::Value::Object(telemetry.fields.clone()));
            }
            RenderCommand::ClockSync { offset_ms } => debug!("feed"; "server clock offset {}ms", offset_ms),
            // Too frequent for a terminal
            RenderCommand::Frame { .. } => {}
        }
    }
}

fn print_json(cmd: &RenderCommand) {
    match serde_json::to_string(cmd) {
        Ok(line) => {
            let mut stdout = std::io::stdout().lock();
            let _ = writeln!(stdout, "{}", line);
            let _ = stdout.flush();
        }
        Err(e) => debug!("render"; "unserializable command: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::LineMeta;

    #[test]
    fn test_estimate_widths() {
        let mut lubyanka = Stop::new("S2", "Lubyanka");
        lubyanka.secondary_name = Some("Lubyanka Square".into());
        let stops = [Stop::new("S1", "Park"), lubyanka];

        let widths = estimate_widths(&stops, 10.0);
        assert_eq!(widths[&StopId::new("S1")], 40.0);
        assert_eq!(widths[&StopId::new("S2")], 150.0);
    }

    #[tokio::test]
    async fn test_draw_route_answers_measured() {
        let (render_tx, render_rx) = mpsc::channel(4);
        let (display_tx, mut display_rx) = mpsc::channel(4);
        let handle = tokio::spawn(
            RenderActor::new(render_rx, display_tx, RenderMode::Terminal, 14.0).run(),
        );

        render_tx
            .send(RenderCommand::DrawRoute {
                revision: 7,
                line: LineMeta::default(),
                stops: vec![Stop::new("S1", "Park"), Stop::new("S2", "Ring")],
            })
            .await
            .unwrap();

        match display_rx.recv().await {
            Some(DisplayMsg::Measured { revision, widths }) => {
                assert_eq!(revision, 7);
                assert_eq!(widths.len(), 2);
                assert_eq!(widths[&StopId::new("S1")], 56.0);
            }
            other => panic!("unexpected {other:?}"),
        }

        drop(render_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_full_display_queue_does_not_stall() {
        let (render_tx, render_rx) = mpsc::channel(1);
        let (display_tx, mut display_rx) = mpsc::channel(1);
        display_tx.try_send(DisplayMsg::Shutdown).unwrap();
        let handle = tokio::spawn(
            RenderActor::new(render_rx, display_tx, RenderMode::Terminal, 14.0).run(),
        );

        // More commands than both queues hold; a blocked renderer never drains them
        let sends = async {
            for revision in 1..=6 {
                render_tx
                    .send(RenderCommand::DrawRoute {
                        revision,
                        line: LineMeta::default(),
                        stops: vec![Stop::new("S1", "Park")],
                    })
                    .await
                    .unwrap();
            }
            render_tx
                .send(RenderCommand::ClockSync { offset_ms: 0 })
                .await
                .unwrap();
        };
        tokio::time::timeout(std::time::Duration::from_secs(2), sends)
            .await
            .expect("renderer blocked on the display queue");

        assert!(matches!(display_rx.recv().await, Some(DisplayMsg::Shutdown)));
        // Only the newest revision is delivered once there is room
        match display_rx.recv().await {
            Some(DisplayMsg::Measured { revision, .. }) => assert_eq!(revision, 6),
            other => panic!("unexpected {other:?}"),
        }

        drop(render_tx);
        handle.await.unwrap();
    }
}
