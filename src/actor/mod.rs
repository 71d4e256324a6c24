//! Actor System for the live board
//!
//! ```text
//! ConnectionManager --> DisplayActor --> RenderActor
//!   (websocket)        (state, anim)    (terminal/json)
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types for inter-actor communication
//! - `display` - Route state, layout and transitions
//! - `render` - Bundled rendering surfaces and width measurement
//! - `coordinator` - Wires up and runs actors

pub mod coordinator;
pub mod display;
pub mod messages;
pub mod render;

pub use coordinator::Coordinator;
pub use render::RenderMode;
