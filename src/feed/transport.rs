//! Socket seam between the connection actor and the network.
//!
//! Sockets are blocking and are driven from a dedicated thread per session.
//! `read` must return within a bounded time (`SocketRead::Idle` on timeout)
//! so the session thread can service outbound sends and stop requests.
//! `connect` is bounded too: the TCP connect and the upgrade each give up
//! after the connect timeout.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::Duration;

use tungstenite::protocol::Message;
use tungstenite::{HandshakeError, WebSocket};
use url::Url;

use super::ConnectionError;

/// Result of one bounded read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketRead {
    Frame(String),
    /// Nothing arrived within the read timeout
    Idle,
    /// Peer closed, with its close code if it sent one
    Closed(Option<u16>),
}

pub trait FeedSocket: Send {
    fn read(&mut self) -> Result<SocketRead, ConnectionError>;
    fn send_text(&mut self, text: &str) -> Result<(), ConnectionError>;
    fn close(&mut self);
}

/// Opens feed sockets
pub trait Transport: Send + Sync + 'static {
    fn connect(&self, url: &Url) -> Result<Box<dyn FeedSocket>, ConnectionError>;
}

// ============================================================================
// WebSocket transport
// ============================================================================

/// Default bound on the TCP connect and the upgrade handshake
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Plain `ws://` transport over tungstenite
pub struct WsTransport {
    read_timeout: Duration,
    connect_timeout: Duration,
}

impl WsTransport {
    pub fn new(read_timeout: Duration) -> Self {
        Self {
            read_timeout,
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// First address of `url` that accepts within the connect timeout.
    fn open_stream(&self, url: &Url) -> Result<TcpStream, ConnectionError> {
        let addrs = url
            .socket_addrs(|| None)
            .map_err(|e| ConnectionError::Connect(e.to_string()))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }
        Err(ConnectionError::Connect(match last_err {
            Some(e) => e.to_string(),
            None => format!("no address for {url}"),
        }))
    }
}

impl Transport for WsTransport {
    fn connect(&self, url: &Url) -> Result<Box<dyn FeedSocket>, ConnectionError> {
        if url.scheme() != "ws" {
            return Err(ConnectionError::UnsupportedScheme(url.scheme().to_string()));
        }

        let stream = self.open_stream(url)?;
        stream.set_read_timeout(Some(self.connect_timeout))?;
        stream.set_write_timeout(Some(self.connect_timeout))?;

        // A timed out read surfaces as an interrupted handshake
        let (ws, _response) = tungstenite::client(url.as_str(), stream).map_err(|e| match e {
            HandshakeError::Interrupted(_) => ConnectionError::Connect(format!(
                "no upgrade reply within {}ms",
                self.connect_timeout.as_millis()
            )),
            HandshakeError::Failure(e) => ConnectionError::Connect(e.to_string()),
        })?;

        // Switch to short timed reads for polling
        ws.get_ref().set_read_timeout(Some(self.read_timeout))?;

        crate::debug!("feed"; "handshake complete: {}", url);
        Ok(Box::new(WsSocket { ws }))
    }
}

struct WsSocket {
    ws: WebSocket<TcpStream>,
}

impl FeedSocket for WsSocket {
    fn read(&mut self) -> Result<SocketRead, ConnectionError> {
        match self.ws.read() {
            Ok(Message::Text(text)) => Ok(SocketRead::Frame(text.as_str().to_owned())),
            Ok(Message::Binary(bytes)) => Ok(SocketRead::Frame(
                String::from_utf8_lossy(&bytes).into_owned(),
            )),
            Ok(Message::Close(frame)) => Ok(SocketRead::Closed(frame.map(|f| u16::from(f.code)))),
            // Ping/pong are answered by tungstenite itself
            Ok(_) => Ok(SocketRead::Idle),
            Err(tungstenite::Error::Io(ref e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                // Flush any queued pong
                let _ = self.ws.flush();
                Ok(SocketRead::Idle)
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(SocketRead::Closed(None))
            }
            Err(e) => Err(ConnectionError::Socket(e.to_string())),
        }
    }

    fn send_text(&mut self, text: &str) -> Result<(), ConnectionError> {
        self.ws
            .send(Message::Text(text.to_owned().into()))
            .map_err(|e| ConnectionError::Socket(e.to_string()))
    }

    fn close(&mut self) {
        let _ = self.ws.close(None);
        let _ = self.ws.flush();
    }
}
