//! Actor Coordinator - wires the feed, display and renderer together
//!
//! The Coordinator is a thin orchestrator that:
//! - Opens the feed connection
//! - Creates communication channels
//! - Runs the actors until shutdown

mod runtime;

use std::sync::Arc;

use anyhow::Result;
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use super::display::{Display, DisplayActor};
use super::messages::{DisplayMsg, RenderCommand};
use super::render::{RenderActor, RenderMode};
use crate::config::DisplayConfig;
use crate::feed::{ConnectionManager, WsTransport};

const CHANNEL_BUFFER: usize = 32;

/// Coordinator - wires up and runs the actor system.
pub struct Coordinator {
    config: Arc<DisplayConfig>,
    mode: RenderMode,
    shutdown_rx: Option<Receiver<()>>,
}

impl Coordinator {
    /// Create from Arc<DisplayConfig>.
    pub fn with_config(config: Arc<DisplayConfig>) -> Self {
        Self {
            config,
            mode: RenderMode::Terminal,
            shutdown_rx: None,
        }
    }

    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set shutdown signal receiver.
    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    /// Run the actor system.
    pub async fn run(mut self) -> Result<()> {
        let url = self.config.feed_url()?;
        crate::log!("feed"; "connecting to {}", url);

        let (display_tx, display_rx) = mpsc::channel::<DisplayMsg>(CHANNEL_BUFFER);
        let (render_tx, render_rx) = mpsc::channel::<RenderCommand>(CHANNEL_BUFFER);

        let transport = WsTransport::new(self.config.feed.read_timeout())
            .with_connect_timeout(self.config.feed.connect_timeout());
        let (feed, feed_rx) = ConnectionManager::new(&self.config.feed, transport).open(url);

        let display = Display::new(&self.config).with_feed(feed.clone());
        let display_actor = DisplayActor::new(
            display,
            feed_rx,
            display_rx,
            render_tx,
            self.config.animation.frame(),
        );
        let render_actor = RenderActor::new(
            render_rx,
            display_tx.clone(),
            self.mode,
            self.config.layout.glyph_width,
        );

        runtime::run_actors(
            display_actor,
            render_actor,
            display_tx,
            feed,
            self.shutdown_rx.take(),
        )
        .await
    }
}
