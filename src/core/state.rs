//! Process-wide shutdown state.
//!
//! The only global state besides the logger's verbosity flag. Ctrl+C sets
//! `SHUTDOWN` and, once the actor system is running, notifies it through a
//! registered crossbeam channel.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel::{Receiver, Sender, bounded};

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Shutdown signal sender for actor system
static SHUTDOWN_TX: OnceLock<Sender<()>> = OnceLock::new();

/// Setup the global Ctrl+C handler. Call once at program start
///
/// - Before `register_shutdown()`: exit immediately, nothing to stop
/// - After `register_shutdown()`: notify the coordinator, which closes the
///   feed and stops the actors
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);

        match SHUTDOWN_TX.get() {
            Some(tx) => {
                crate::log!("tablo"; "shutting down...");
                let _ = tx.try_send(());
            }
            None => std::process::exit(0),
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register the actor system for graceful shutdown.
///
/// Returns `None` if a receiver was already registered.
pub fn register_shutdown() -> Option<Receiver<()>> {
    let (tx, rx) = bounded(1);
    SHUTDOWN_TX.set(tx).ok()?;
    Some(rx)
}

/// Check if shutdown has been requested
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

// =============================================================================
// Tests
// =============================================================================
