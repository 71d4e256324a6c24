//! Feed connection: reconnect policy, socket transport and the connection
//! actor.

mod backoff;
mod connection;
mod transport;

pub use connection::{
    ConnectionError, ConnectionEvent, ConnectionHandle, ConnectionManager, ConnectionState,
};
pub use transport::WsTransport;
