//! Route State Store
//!
//! Holds the canonical route and the current/next pointer. Only the display
//! actor writes to it; everything downstream reads snapshots.
//!
//! # Change Detection
//!
//! A candidate route replaces the held one when its length differs or the
//! ids at some index differ. Names, transfers and line meta do not count, so
//! a re-sent snapshot with fresh labels is discarded without relayout.

use std::sync::Arc;

use thiserror::Error;

use super::model::{Route, StopId};
use crate::protocol::{PositionUpdate, StopRef};

/// Monotonic counter bumped on every accepted route change
pub type RouteRevision = u64;

/// Why an update was not applied. None of these are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateRejection {
    #[error("unknown stop {0}")]
    UnknownStop(StopRef),

    #[error("position update before any route")]
    NoRoute,

    #[error("route unchanged")]
    UnchangedRoute,
}

/// Which stop is current and which is next
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionPointer {
    pub current: StopId,
    pub next: StopId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteChange {
    Changed(RouteRevision),
    Unchanged,
}

/// Accepted position update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub pointer: PositionPointer,
    /// False when the update repeated the held pointer
    pub moved: bool,
}

#[derive(Debug, Default)]
pub struct RouteStore {
    route: Option<Arc<Route>>,
    pointer: Option<PositionPointer>,
    revision: RouteRevision,
}

impl RouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    pub fn pointer(&self) -> Option<&PositionPointer> {
        self.pointer.as_ref()
    }

    pub fn revision(&self) -> RouteRevision {
        self.revision
    }

    /// Index of the current stop in the held route
    pub fn current_index(&self) -> Option<usize> {
        let route = self.route.as_ref()?;
        route.index_of(&self.pointer.as_ref()?.current)
    }

    /// Offer a new route snapshot.
    ///
    /// A candidate without line meta inherits the held meta. On change the
    /// held pointer survives only if both of its ids exist in the new route.
    pub fn apply_route_snapshot(&mut self, mut candidate: Route) -> RouteChange {
        if let Some(held) = &self.route {
            if held.same_sequence(&candidate) {
                return RouteChange::Unchanged;
            }
            if candidate.line.is_empty() {
                candidate.line = held.line.clone();
            }
        }

        if let Some(pointer) = &self.pointer
            && !(candidate.contains(&pointer.current) && candidate.contains(&pointer.next))
        {
            self.pointer = None;
        }

        self.route = Some(Arc::new(candidate));
        self.revision += 1;
        RouteChange::Changed(self.revision)
    }

    /// Resolve and apply a current/next update. Both ids are replaced
    /// together or not at all.
    pub fn apply_position_update(
        &mut self,
        update: &PositionUpdate,
    ) -> Result<Applied, StateRejection> {
        let route = self.route.as_ref().ok_or(StateRejection::NoRoute)?;
        let current = resolve(route, &update.current)?;
        let next = resolve(route, &update.next)?;

        let pointer = PositionPointer { current, next };
        let moved = self.pointer.as_ref() != Some(&pointer);
        self.pointer = Some(pointer.clone());
        Ok(Applied { pointer, moved })
    }
}

/// Map a reference to the route's own id
fn resolve(route: &Route, stop: &StopRef) -> Result<StopId, StateRejection> {
    let index = match stop {
        StopRef::Index(i) => Some(*i),
        StopRef::Id(id) => route.index_of(id),
    };
    index
        .and_then(|i| route.get(i))
        .map(|s| s.id.clone())
        .ok_or_else(|| StateRejection::UnknownStop(stop.clone()))
}
