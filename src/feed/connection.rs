//! Connection Manager
//!
//! Owns the feed connection lifecycle and is the only writer of the
//! connection state.
//!
//! # Architecture
//!
//! ```text
//!                  control (close)
//! ConnectionHandle ---------------> ConnectionActor ---ConnectionEvent---> display
//!        |                               ^
//!        | outbound text                 | SessionEvent
//!        v                               |
//!    session thread (blocking socket, one per connect attempt)
//! ```
//!
//! Attempts are strictly sequential: a new session starts only after the
//! previous one ended and the reconnect delay elapsed. A manual `close()`
//! wins over a pending reconnect.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

use super::backoff::{ReconnectDecision, ReconnectPolicy};
use super::transport::{SocketRead, Transport};
use crate::config::FeedConfig;
use crate::protocol::ClientMessage;

/// Event channel buffer size
const EVENT_BUFFER: usize = 32;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("not connected")]
    NotConnected,

    #[error("unsupported feed scheme `{0}`")]
    UnsupportedScheme(String),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("socket error: {0}")]
    Socket(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
    Reconnecting,
}

/// Lifecycle events delivered to the display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Opened,
    Message(String),
    Error(String),
    Closed { code: Option<u16> },
    /// Attempt cap reached; no further attempts will be made
    Terminated { attempts: u32 },
    StateChanged { state: ConnectionState, attempts: u32 },
}

struct Shared {
    state: ConnectionState,
    attempts: u32,
    /// Outbound queue of the open session
    outbound: Option<Sender<String>>,
}

enum Control {
    Close,
}

/// Cloneable handle to a running connection
#[derive(Clone)]
pub struct ConnectionHandle {
    shared: Arc<Mutex<Shared>>,
    control: mpsc::UnboundedSender<Control>,
}

impl ConnectionHandle {
    /// Queue a message for the peer. Fails unless the connection is open.
    pub fn send(&self, message: &ClientMessage) -> Result<(), ConnectionError> {
        let shared = self.shared.lock();
        match (&shared.state, &shared.outbound) {
            (ConnectionState::Open, Some(tx)) => tx
                .send(message.to_json())
                .map_err(|_| ConnectionError::NotConnected),
            _ => Err(ConnectionError::NotConnected),
        }
    }

    /// Close the connection and cancel any pending reconnect.
    pub fn close(&self) {
        let _ = self.control.send(Control::Close);
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    /// Reconnect attempts since the last successful open
    pub fn attempts(&self) -> u32 {
        self.shared.lock().attempts
    }
}

pub struct ConnectionManager {
    policy: ReconnectPolicy,
    transport: Arc<dyn Transport>,
}

impl ConnectionManager {
    pub fn new(config: &FeedConfig, transport: impl Transport) -> Self {
        Self {
            policy: ReconnectPolicy::from_config(config),
            transport: Arc::new(transport),
        }
    }

    /// Spawn the connection actor. Must be called inside a tokio runtime.
    pub fn open(self, url: Url) -> (ConnectionHandle, mpsc::Receiver<ConnectionEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Mutex::new(Shared {
            state: ConnectionState::Connecting,
            attempts: 0,
            outbound: None,
        }));

        let actor = ConnectionActor {
            url,
            policy: self.policy,
            transport: self.transport,
            shared: Arc::clone(&shared),
            events: events_tx,
            control: control_rx,
        };
        tokio::spawn(actor.run());

        let handle = ConnectionHandle {
            shared,
            control: control_tx,
        };
        (handle, events_rx)
    }
}

// ============================================================================
// Actor
// ============================================================================

/// How a session ended
enum SessionEnd {
    Closed(Option<u16>),
    Cancelled,
}

/// Events from a session thread
enum SessionEvent {
    Opened,
    Frame(String),
    Error(String),
    Failed(String),
    Closed(Option<u16>),
}

struct Session {
    events: mpsc::UnboundedReceiver<SessionEvent>,
    stop: Arc<AtomicBool>,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

struct ConnectionActor {
    url: Url,
    policy: ReconnectPolicy,
    transport: Arc<dyn Transport>,
    shared: Arc<Mutex<Shared>>,
    events: mpsc::Sender<ConnectionEvent>,
    control: mpsc::UnboundedReceiver<Control>,
}

impl ConnectionActor {
    async fn run(mut self) {
        crate::debug!("feed"; "connecting to {}", self.url);
        self.set_state(ConnectionState::Connecting).await;

        loop {
            let session = self.start_session();
            match self.drive_session(session).await {
                SessionEnd::Cancelled => break,
                SessionEnd::Closed(code) => {
                    self.shared.lock().outbound = None;
                    self.emit(ConnectionEvent::Closed { code }).await;
                }
            }

            match self.policy.on_close() {
                ReconnectDecision::Retry { attempt, delay } => {
                    crate::debug!(
                        "feed";
                        "reconnecting in {}ms ({}/{})",
                        delay.as_millis(),
                        attempt,
                        self.policy.max_attempts()
                    );
                    self.set_state(ConnectionState::Reconnecting).await;
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.control.recv() => break,
                    }
                }
                ReconnectDecision::GiveUp { attempts } => {
                    crate::log!("feed"; "giving up after {} attempts", attempts);
                    self.set_state(ConnectionState::Closed).await;
                    self.emit(ConnectionEvent::Terminated { attempts }).await;
                    return;
                }
            }
        }

        crate::debug!("feed"; "closed by request");
        self.set_state(ConnectionState::Closed).await;
    }

    fn start_session(&self) -> Session {
        let (tx, rx) = mpsc::unbounded_channel();
        let stop = Arc::new(AtomicBool::new(false));
        let (out_tx, out_rx) = channel::unbounded();
        self.shared.lock().outbound = Some(out_tx);

        let transport = Arc::clone(&self.transport);
        let url = self.url.clone();
        let thread_stop = Arc::clone(&stop);
        std::thread::spawn(move || session_loop(transport.as_ref(), &url, &tx, &out_rx, &thread_stop));

        Session { events: rx, stop }
    }

    async fn drive_session(&mut self, mut session: Session) -> SessionEnd {
        loop {
            tokio::select! {
                event = session.events.recv() => match event {
                    Some(SessionEvent::Opened) => {
                        self.policy.on_open();
                        crate::log!("feed"; "connected to {}", self.url);
                        self.set_state(ConnectionState::Open).await;
                        self.emit(ConnectionEvent::Opened).await;
                    }
                    Some(SessionEvent::Frame(text)) => {
                        self.emit(ConnectionEvent::Message(text)).await;
                    }
                    Some(SessionEvent::Error(cause)) => {
                        self.emit(ConnectionEvent::Error(cause)).await;
                    }
                    Some(SessionEvent::Failed(cause)) => {
                        crate::debug!("feed"; "{}", cause);
                        self.emit(ConnectionEvent::Error(cause)).await;
                        return SessionEnd::Closed(None);
                    }
                    Some(SessionEvent::Closed(code)) => return SessionEnd::Closed(code),
                    None => return SessionEnd::Closed(None),
                },
                // Close request, or every handle dropped
                _ = self.control.recv() => return SessionEnd::Cancelled,
            }
        }
    }

    async fn set_state(&self, state: ConnectionState) {
        let attempts = {
            let mut shared = self.shared.lock();
            shared.state = state;
            shared.attempts = self.policy.attempts();
            if state != ConnectionState::Open {
                shared.outbound = None;
            }
            shared.attempts
        };
        self.emit(ConnectionEvent::StateChanged { state, attempts }).await;
    }

    async fn emit(&self, event: ConnectionEvent) {
        // Receiver gone means the display stopped; nothing left to notify
        let _ = self.events.send(event).await;
    }
}

/// Blocking socket loop for one connect attempt
fn session_loop(
    transport: &dyn Transport,
    url: &Url,
    events: &mpsc::UnboundedSender<SessionEvent>,
    outbound: &Receiver<String>,
    stop: &AtomicBool,
) {
    let mut socket = match transport.connect(url) {
        Ok(socket) => socket,
        Err(e) => {
            let _ = events.send(SessionEvent::Failed(e.to_string()));
            return;
        }
    };
    if events.send(SessionEvent::Opened).is_err() {
        socket.close();
        return;
    }

    loop {
        if stop.load(Ordering::SeqCst) || crate::core::is_shutdown() {
            socket.close();
            return;
        }

        while let Ok(text) = outbound.try_recv() {
            if let Err(e) = socket.send_text(&text) {
                let _ = events.send(SessionEvent::Error(e.to_string()));
            }
        }

        let event = match socket.read() {
            Ok(SocketRead::Idle) => continue,
            Ok(SocketRead::Frame(text)) => SessionEvent::Frame(text),
            Ok(SocketRead::Closed(code)) => {
                let _ = events.send(SessionEvent::Closed(code));
                return;
            }
            Err(e) => {
                let _ = events.send(SessionEvent::Failed(e.to_string()));
                return;
            }
        };
        if events.send(event).is_err() {
            socket.close();
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::transport::{FeedSocket, WsTransport};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// One scripted connect attempt
    enum Attempt {
        Refuse,
        /// Accept, replay reads, then stay idle
        Accept(Vec<SocketRead>),
    }

    #[derive(Clone, Default)]
    struct Scripted {
        attempts: Arc<Mutex<VecDeque<Attempt>>>,
        connects: Arc<AtomicUsize>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl Scripted {
        fn new(attempts: Vec<Attempt>) -> Self {
            Self {
                attempts: Arc::new(Mutex::new(attempts.into())),
                ..Default::default()
            }
        }

        fn connects(&self) -> usize {
            self.connects.load(Ordering::SeqCst)
        }
    }

    struct FakeSocket {
        reads: VecDeque<SocketRead>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl FeedSocket for FakeSocket {
        fn read(&mut self) -> Result<SocketRead, ConnectionError> {
            match self.reads.pop_front() {
                Some(read) => Ok(read),
                None => {
                    std::thread::sleep(Duration::from_millis(2));
                    Ok(SocketRead::Idle)
                }
            }
        }

        fn send_text(&mut self, text: &str) -> Result<(), ConnectionError> {
            self.sent.lock().push(text.to_string());
            Ok(())
        }

        fn close(&mut self) {}
    }

    impl Transport for Scripted {
        fn connect(&self, _url: &Url) -> Result<Box<dyn FeedSocket>, ConnectionError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            // Unscripted attempts are refused
            match self.attempts.lock().pop_front() {
                Some(Attempt::Accept(reads)) => Ok(Box::new(FakeSocket {
                    reads: reads.into(),
                    sent: Arc::clone(&self.sent),
                })),
                Some(Attempt::Refuse) | None => {
                    Err(ConnectionError::Connect("connection refused".into()))
                }
            }
        }
    }

    fn config(max_attempts: u32) -> FeedConfig {
        FeedConfig {
            max_attempts,
            ..FeedConfig::default()
        }
    }

    fn open(
        transport: &Scripted,
        max_attempts: u32,
    ) -> (ConnectionHandle, mpsc::Receiver<ConnectionEvent>) {
        let url = Url::parse("ws://127.0.0.1:9/ws/").unwrap();
        ConnectionManager::new(&config(max_attempts), transport.clone()).open(url)
    }

    async fn collect_until(
        rx: &mut mpsc::Receiver<ConnectionEvent>,
        done: impl Fn(&ConnectionEvent) -> bool,
    ) -> Vec<ConnectionEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            let stop = done(&event);
            events.push(event);
            if stop {
                break;
            }
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_never_exceed_cap() {
        let transport = Scripted::new(Vec::new());
        let (handle, mut rx) = open(&transport, 3);

        let events = collect_until(&mut rx, |e| matches!(e, ConnectionEvent::Terminated { .. })).await;
        assert_eq!(events.last(), Some(&ConnectionEvent::Terminated { attempts: 3 }));
        assert_eq!(transport.connects(), 4);
        assert_eq!(handle.state(), ConnectionState::Closed);

        // Actor is gone, nothing else happens
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(rx.recv().await.is_none());
        assert_eq!(transport.connects(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_interval() {
        let transport = Scripted::new(Vec::new());
        let start = tokio::time::Instant::now();
        let (_handle, mut rx) = open(&transport, 2);

        collect_until(&mut rx, |e| matches!(e, ConnectionEvent::Terminated { .. })).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(2000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(2100), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_resets_counter() {
        let transport = Scripted::new(vec![
            Attempt::Refuse,
            Attempt::Refuse,
            Attempt::Accept(vec![SocketRead::Closed(Some(1006))]),
        ]);
        let (_handle, mut rx) = open(&transport, 3);

        let events = collect_until(&mut rx, |e| matches!(e, ConnectionEvent::Terminated { .. })).await;
        assert!(events.contains(&ConnectionEvent::Opened));
        assert!(events.contains(&ConnectionEvent::Closed { code: Some(1006) }));
        assert_eq!(events.last(), Some(&ConnectionEvent::Terminated { attempts: 3 }));
        // 2 refused + 1 open, then 3 fresh retries after the reset
        assert_eq!(transport.connects(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_suppresses_reconnect() {
        let transport = Scripted::new(Vec::new());
        let (handle, mut rx) = open(&transport, 60);

        collect_until(&mut rx, |e| {
            matches!(
                e,
                ConnectionEvent::StateChanged {
                    state: ConnectionState::Reconnecting,
                    ..
                }
            )
        })
        .await;
        handle.close();

        let rest = collect_until(&mut rx, |_| false).await;
        assert_eq!(
            rest.last(),
            Some(&ConnectionEvent::StateChanged {
                state: ConnectionState::Closed,
                attempts: 1,
            })
        );
        assert_eq!(transport.connects(), 1);
        assert_eq!(handle.state(), ConnectionState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_and_send() {
        let transport = Scripted::new(vec![Attempt::Accept(vec![
            SocketRead::Frame("a".into()),
            SocketRead::Frame("b".into()),
        ])]);
        let (handle, mut rx) = open(&transport, 1);
        assert!(matches!(
            handle.send(&ClientMessage::Ping),
            Err(ConnectionError::NotConnected)
        ));

        let events = collect_until(&mut rx, |e| e == &ConnectionEvent::Message("b".into())).await;
        assert_eq!(
            events,
            [
                ConnectionEvent::StateChanged {
                    state: ConnectionState::Connecting,
                    attempts: 0
                },
                ConnectionEvent::StateChanged {
                    state: ConnectionState::Open,
                    attempts: 0
                },
                ConnectionEvent::Opened,
                ConnectionEvent::Message("a".into()),
                ConnectionEvent::Message("b".into()),
            ]
        );

        handle.send(&ClientMessage::Ping).unwrap();
        for _ in 0..500 {
            if !transport.sent.lock().is_empty() {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(*transport.sent.lock(), [r#"{"type":"ping"}"#]);

        handle.close();
        collect_until(&mut rx, |_| false).await;
        assert_eq!(handle.state(), ConnectionState::Closed);
        assert!(matches!(
            handle.send(&ClientMessage::Ping),
            Err(ConnectionError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_unanswered_handshake_reaches_cap() {
        // Never accepted, never upgraded: every attempt hangs in the handshake
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = Url::parse(&format!("ws://{}/ws/", listener.local_addr().unwrap())).unwrap();
        let config = FeedConfig {
            reconnect_interval_ms: 100,
            max_attempts: 2,
            ..FeedConfig::default()
        };
        let transport =
            WsTransport::new(Duration::from_millis(20)).with_connect_timeout(Duration::from_millis(150));
        let (handle, mut rx) = ConnectionManager::new(&config, transport).open(url);

        let events = tokio::time::timeout(
            Duration::from_secs(5),
            collect_until(&mut rx, |e| matches!(e, ConnectionEvent::Terminated { .. })),
        )
        .await
        .expect("connection manager stuck in handshake");
        assert_eq!(events.last(), Some(&ConnectionEvent::Terminated { attempts: 2 }));
        assert!(!events.contains(&ConnectionEvent::Opened));
        assert_eq!(handle.state(), ConnectionState::Closed);
        drop(listener);
    }
}
