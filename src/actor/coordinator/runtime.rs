use std::time::Duration;

use anyhow::Result;
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use crate::actor::display::DisplayActor;
use crate::actor::messages::DisplayMsg;
use crate::actor::render::RenderActor;
use crate::feed::ConnectionHandle;

/// Run all actors concurrently.
pub(super) async fn run_actors(
    display: DisplayActor,
    render: RenderActor,
    display_tx: mpsc::Sender<DisplayMsg>,
    feed: ConnectionHandle,
    shutdown_rx: Option<Receiver<()>>,
) -> Result<()> {
    let display_handle = tokio::spawn(async move { display.run().await });
    let render_handle = tokio::spawn(async move { render.run().await });

    let Some(rx) = shutdown_rx else {
        let _ = display_handle.await;
        feed.close();
        let _ = render_handle.await;
        return Ok(());
    };

    loop {
        if rx.try_recv().is_ok() || crate::core::is_shutdown() {
            crate::debug!("actor"; "shutdown signal received");
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    crate::debug!("actor"; "closing feed");
    feed.close();
    let _ = display_tx.send(DisplayMsg::Shutdown).await;
    drop(display_tx);

    let _ = tokio::time::timeout(Duration::from_millis(500), display_handle).await;
    let _ = tokio::time::timeout(Duration::from_millis(500), render_handle).await;

    Ok(())
}
