//! Pathfinding and reachability over a water traversal surface.
//!
//! The host simulation owns terrain, obstacles and agents, and exposes them
//! through [NavWorld]. This crate owns the searches: a cell-level A* with a
//! region-based long-range heuristic, a cached reachability oracle, and the
//! per-agent follower that plans and advances movement each tick.

pub mod cell;
mod curve;
pub mod follow;
pub mod pathfind;
mod pool;
pub mod reach;
pub mod region;
pub mod region_cost;
pub mod traversal;
mod world;

#[cfg(test)]
pub(crate) mod helpers;

pub use cell::{Cell, GridDims};
pub use follow::{FollowState, PatherEvent, PatherEventPayload, PatherEventQueue, PathFollower};
pub use pathfind::{Path, PathError, PathNode, Pathfinder, SearchStats};
pub use pool::{AsyncWorkerPool, CancelToken};
pub use reach::Reachability;
pub use region::{
    CellKind, LinkId, LinkSpan, Region, RegionDiscovery, RegionGraph, RegionId, RegionLink,
    SpanAxis, SurfaceSource,
};
pub use region_cost::{RegionCosts, RegionDistance, COST_UNREACHABLE};
pub use traversal::{
    AgentId, Capability, CellRect, Destination, EndMode, GoalArea, TraversalParams,
};
pub use world::{NavWorld, ObstacleCost};
