//! Feed routing and transition scheduling for [`Display`].

use tokio::time::Instant;

use super::Display;
use crate::actor::messages::RenderCommand;
use crate::animate::{Animation, AnimationKind};
use crate::feed::ConnectionEvent;
use crate::layout::{LabelWidths, compute_layout};
use crate::protocol::{ClientMessage, Message, PositionUpdate, decode_frame};
use crate::route::{Applied, PositionPointer, Route, RouteChange, RouteRevision, StateRejection};
use crate::debug;

impl Display {
    // =========================================================================
    // Feed
    // =========================================================================

    pub fn handle_feed_event(
        &mut self,
        event: ConnectionEvent,
        now: Instant,
        out: &mut Vec<RenderCommand>,
    ) {
        match event {
            ConnectionEvent::Opened => {
                if let Some(feed) = &self.feed
                    && let Err(e) = feed.send(&ClientMessage::Ping)
                {
                    debug!("feed"; "ping not sent: {}", e);
                }
            }
            ConnectionEvent::Message(raw) => match decode_frame(&raw) {
                Ok(messages) => {
                    for message in messages {
                        self.handle_message(message, now, out);
                    }
                }
                Err(e) => debug!("feed"; "dropped frame: {}", e),
            },
            ConnectionEvent::Error(cause) => debug!("feed"; "error: {}", cause),
            ConnectionEvent::Closed { code } => match code {
                Some(code) => debug!("feed"; "closed with code {}", code),
                None => debug!("feed"; "closed"),
            },
            ConnectionEvent::Terminated { attempts } => {
                debug!("feed"; "terminated after {} attempts", attempts);
                out.push(RenderCommand::ConnectionLost { attempts });
            }
            ConnectionEvent::StateChanged { state, attempts } => {
                out.push(RenderCommand::ConnectionStatus { state, attempts });
            }
        }
    }

    pub fn handle_message(&mut self, message: Message, now: Instant, out: &mut Vec<RenderCommand>) {
        match message {
            Message::Ping => debug!("feed"; "ping"),
            Message::RouteSnapshot(route) => self.apply_route(route, out),
            Message::PositionUpdate(update) => self.apply_position(&update, now, out),
            Message::Telemetry(telemetry) => out.push(RenderCommand::Telemetry(telemetry)),
        }
    }

    fn apply_route(&mut self, route: Route, out: &mut Vec<RenderCommand>) {
        let len = route.len();
        let revision = match self.store.apply_route_snapshot(route) {
            RouteChange::Unchanged => {
                debug!("route"; "{} ({} stops)", StateRejection::UnchangedRoute, len);
                return;
            }
            RouteChange::Changed(revision) => revision,
        };

        // Old elements are about to be replaced
        self.animator.cancel_all();
        self.settled = None;
        self.layout = None;
        self.pending = self.store.pointer().cloned();

        let Some(route) = self.store.route() else {
            return;
        };
        debug!("route"; "revision {}: {} stops", revision, route.len());
        out.push(RenderCommand::DrawRoute {
            revision,
            line: route.line.clone(),
            stops: route.stops().to_vec(),
        });
    }

    fn apply_position(&mut self, update: &PositionUpdate, now: Instant, out: &mut Vec<RenderCommand>) {
        if let Some(timestamp) = update.timestamp {
            let offset_ms = self.clock.sync(timestamp);
            out.push(RenderCommand::ClockSync { offset_ms });
        }

        let pointer = match self.store.apply_position_update(update) {
            Ok(Applied { pointer, moved: true }) => pointer,
            Ok(Applied { moved: false, .. }) => return,
            Err(rejection) => {
                debug!("route"; "position rejected: {}", rejection);
                return;
            }
        };

        out.push(RenderCommand::Position {
            current: pointer.current.clone(),
            next: pointer.next.clone(),
            current_index: self.store.current_index().unwrap_or_default(),
        });

        if self.is_settled() {
            self.start_transitions(&pointer, now, out);
        } else {
            debug!("anim"; "layout pending, holding {}", pointer.current);
            self.pending = Some(pointer);
        }
    }

    // =========================================================================
    // Renderer
    // =========================================================================

    /// Accept label widths for `revision`. Stale revisions are ignored.
    pub fn handle_measured(
        &mut self,
        revision: RouteRevision,
        widths: LabelWidths,
        now: Instant,
        out: &mut Vec<RenderCommand>,
    ) {
        if revision != self.store.revision() {
            debug!("layout"; "stale measurement for revision {}", revision);
            return;
        }
        let Some(route) = self.store.route().cloned() else {
            return;
        };
        let remeasure = self.settled == Some(revision);

        self.widths = widths;
        let layout = compute_layout(&route, &self.widths, &self.layout_config);
        for issue in &layout.issues {
            debug!("layout"; "{}", issue);
        }
        if !layout.is_complete() {
            debug!("layout"; "{} stops without width", layout.unmeasured.len());
        }

        out.push(RenderCommand::Layout {
            revision,
            layout: layout.clone(),
        });
        self.layout = Some(layout);
        self.settled = Some(revision);

        if remeasure {
            self.snap_shift(out);
        } else if let Some(pointer) = self.pending.take() {
            self.start_transitions(&pointer, now, out);
        }
    }

    /// Jump the progress bar to the current stop of a fresh layout.
    fn snap_shift(&mut self, out: &mut Vec<RenderCommand>) {
        let Some(target) = self.current_shift() else {
            return;
        };
        self.animator.cancel(AnimationKind::Shift);
        self.shift = target;
        out.push(RenderCommand::Frame {
            kind: AnimationKind::Shift,
            target: None,
            value: target,
        });
    }

    fn current_shift(&self) -> Option<f64> {
        let pointer = self.store.pointer()?;
        self.layout.as_ref()?.shift_for(&pointer.current)
    }

    // =========================================================================
    // Animation
    // =========================================================================

    fn start_transitions(&mut self, pointer: &PositionPointer, now: Instant, out: &mut Vec<RenderCommand>) {
        let Some(to) = self
            .layout
            .as_ref()
            .and_then(|layout| layout.shift_for(&pointer.current))
        else {
            return;
        };

        let shift = Animation::new(AnimationKind::Shift, self.shift, to, self.animation.shift());
        self.start(shift, now, out);

        let highlight = Animation::new(AnimationKind::Highlight, 0.0, 1.0, self.animation.highlight())
            .with_target(pointer.current.clone());
        self.start(highlight, now, out);
    }

    fn start(&mut self, animation: Animation, now: Instant, out: &mut Vec<RenderCommand>) {
        out.push(RenderCommand::Animate {
            kind: animation.kind,
            target: animation.target.clone(),
            from: animation.from,
            to: animation.to,
            duration_ms: animation.duration.as_millis() as u64,
        });
        self.animator.animate(animation, now);
    }

    /// Advance running transitions to `now`.
    pub fn tick(&mut self, now: Instant, out: &mut Vec<RenderCommand>) {
        let tick = self.animator.tick(now);
        for frame in tick.frames {
            if frame.kind == AnimationKind::Shift {
                self.shift = frame.value;
            }
            out.push(RenderCommand::Frame {
                kind: frame.kind,
                target: frame.target,
                value: frame.value,
            });
        }
        for done in tick.completed {
            debug!("anim"; "{} done", done.kind.label());
            out.push(RenderCommand::TransitionDone {
                kind: done.kind,
                target: done.target,
            });
        }
    }
}
