//! Display Actor - owns the board state
//!
//! Feed events, renderer measurements and frame ticks all land here, so the
//! route store, layout and animator have a single writer.
//!
//! # Settling
//!
//! A changed route is drawn first and laid out only once the renderer
//! reports label widths for that revision. Position changes arriving in
//! between are held as `pending` and animated after the layout exists.
//!
//! ```text
//! RouteSnapshot --> DrawRoute --> (renderer) --> Measured --> Layout
//!                                                                |
//! PositionUpdate --> Position ---------(pending)-------------> Animate
//! ```

mod handlers;

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use super::messages::{DisplayMsg, RenderCommand};
use crate::animate::Animator;
use crate::config::{AnimationConfig, DisplayConfig};
use crate::feed::{ConnectionEvent, ConnectionHandle};
use crate::layout::{LabelWidths, Layout, LayoutConfig};
use crate::route::{PositionPointer, RouteRevision, RouteStore, ServerClock};

/// Board state machine, free of I/O.
///
/// Every handler appends the resulting render commands to `out`.
pub struct Display {
    layout_config: LayoutConfig,
    animation: AnimationConfig,
    store: RouteStore,
    animator: Animator,
    clock: ServerClock,
    widths: LabelWidths,
    /// Revision the current layout was computed for
    settled: Option<RouteRevision>,
    layout: Option<Layout>,
    /// Pointer waiting for the layout before it can animate
    pending: Option<PositionPointer>,
    /// Progress bar translation as last rendered
    shift: f64,
    feed: Option<ConnectionHandle>,
}

impl Display {
    pub fn new(config: &DisplayConfig) -> Self {
        Self {
            layout_config: config.layout.engine(),
            animation: config.animation.clone(),
            store: RouteStore::new(),
            animator: Animator::new(),
            clock: ServerClock::default(),
            widths: LabelWidths::default(),
            settled: None,
            layout: None,
            pending: None,
            shift: 0.0,
            feed: None,
        }
    }

    /// Attach the feed connection used for the keepalive ping.
    pub fn with_feed(mut self, feed: ConnectionHandle) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn store(&self) -> &RouteStore {
        &self.store
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn clock(&self) -> &ServerClock {
        &self.clock
    }

    pub fn shift(&self) -> f64 {
        self.shift
    }

    pub fn is_animating(&self) -> bool {
        !self.animator.is_idle()
    }

    /// Layout exists for the held route
    pub fn is_settled(&self) -> bool {
        self.layout.is_some() && self.settled == Some(self.store.revision())
    }

    /// Stop all animations and close the feed.
    pub fn shutdown(&mut self) {
        self.animator.cancel_all();
        if let Some(feed) = &self.feed {
            feed.close();
        }
    }
}

/// Drives a [`Display`] from its inputs and forwards render commands.
pub struct DisplayActor {
    display: Display,
    feed_rx: mpsc::Receiver<ConnectionEvent>,
    rx: mpsc::Receiver<DisplayMsg>,
    render_tx: mpsc::Sender<RenderCommand>,
    frame: Duration,
}

impl DisplayActor {
    pub fn new(
        display: Display,
        feed_rx: mpsc::Receiver<ConnectionEvent>,
        rx: mpsc::Receiver<DisplayMsg>,
        render_tx: mpsc::Sender<RenderCommand>,
        frame: Duration,
    ) -> Self {
        Self {
            display,
            feed_rx,
            rx,
            render_tx,
            frame,
        }
    }

    /// Run the actor event loop.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.frame);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut feed_open = true;
        let mut out = Vec::new();

        loop {
            let animating = self.display.is_animating();
            let running = tokio::select! {
                event = self.feed_rx.recv(), if feed_open => {
                    match event {
                        Some(event) => self.display.handle_feed_event(event, Instant::now(), &mut out),
                        // Display keeps showing the last state without a feed
                        None => {
                            crate::debug!("display"; "feed channel closed");
                            feed_open = false;
                        }
                    }
                    true
                }
                msg = self.rx.recv() => match msg {
                    Some(DisplayMsg::Measured { revision, widths }) => {
                        self.display.handle_measured(revision, widths, Instant::now(), &mut out);
                        true
                    }
                    Some(DisplayMsg::Shutdown) | None => false,
                },
                _ = ticker.tick(), if animating => {
                    self.display.tick(Instant::now(), &mut out);
                    true
                }
            };

            if !Self::flush(&self.render_tx, &mut out).await || !running {
                break;
            }
        }

        crate::debug!("display"; "shutting down");
        self.display.shutdown();
    }

    /// Forward queued commands. Returns false once the renderer is gone.
    async fn flush(render_tx: &mpsc::Sender<RenderCommand>, out: &mut Vec<RenderCommand>) -> bool {
        for cmd in out.drain(..) {
            if render_tx.send(cmd).await.is_err() {
                return false;
            }
        }
        true
    }
}
