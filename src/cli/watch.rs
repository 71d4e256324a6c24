//! `tablo watch`: connect to the feed and drive the board until Ctrl+C.

use std::sync::Arc;

use anyhow::Result;

use crate::actor::{Coordinator, RenderMode};
use crate::config::DisplayConfig;
use crate::core::register_shutdown;

pub fn watch(config: DisplayConfig, json: bool) -> Result<()> {
    let mode = if json {
        RenderMode::JsonLines
    } else {
        RenderMode::Terminal
    };

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    let mut coordinator = Coordinator::with_config(Arc::new(config)).with_mode(mode);
    if let Some(rx) = register_shutdown() {
        coordinator = coordinator.with_shutdown_signal(rx);
    }

    rt.block_on(coordinator.run())
}
