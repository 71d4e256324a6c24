//! Feed protocol: frame decoding for both server dialects.

mod decode;
mod message;
mod wire;

pub use decode::decode_frame;
pub use message::{ClientMessage, DecodeError, Message, PositionUpdate, StopRef, Telemetry};
