//! Route state: the stop model, the single-writer store and the server clock.

mod clock;
mod model;
mod store;

pub use clock::{ServerClock, parse_server_time};
pub use model::{IconPart, LineMeta, Route, Stop, StopId, Transfer};
pub use store::{
    Applied, PositionPointer, RouteChange, RouteRevision, RouteStore, StateRejection,
};
