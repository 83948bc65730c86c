use crate::cell::{Cell, GridDims};
use crate::region::RegionGraph;
use crate::traversal::{AgentId, TraversalParams};

/// Cost contribution of whatever is built on a cell, for a given traversal
/// mode
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ObstacleCost {
    /// Nothing in the way
    Clear,

    /// Passable at a price, e.g. an openable door or a destructible blocker
    Extra(u32),

    Impassable,
}

/// The host simulation as seen by the searches. All queries are fast and
/// side-effect free; the region graph must not be mid-rebuild while a search
/// is running.
///
/// The diagnostics hooks default to no-ops and must not affect correctness.
pub trait NavWorld {
    fn dims(&self) -> GridDims;

    /// Static walkability of the traversal surface, ignoring obstacles
    fn is_walkable(&self, cell: Cell) -> bool;

    /// Terrain cost added on entering the cell
    fn terrain_cost(&self, cell: Cell) -> u32;

    /// Is this cell part of the water surface
    fn is_water(&self, cell: Cell) -> bool;

    /// Cost of whatever is built on the cell under the given traversal mode
    fn obstacle_cost(&self, cell: Cell, params: &TraversalParams) -> ObstacleCost;

    /// Per-cell danger weight from this agent's situational awareness
    fn avoidance(&self, _cell: Cell, _agent: Option<AgentId>) -> u32 {
        0
    }

    /// Allowed-area mask; cells outside incur a penalty rather than a block
    fn in_allowed_area(&self, _cell: Cell, _agent: Option<AgentId>) -> bool {
        true
    }

    /// Can the obstacle on this cell be destroyed to pass, by a mode that
    /// destroys obstacles
    fn can_destroy(&self, _cell: Cell) -> bool {
        false
    }

    /// Does another agent currently occupy this cell
    fn is_blocked_by_agent(&self, _cell: Cell, _asking: Option<AgentId>) -> bool {
        false
    }

    /// Read-only snapshot of the current region graph for this surface
    fn regions(&self) -> &RegionGraph;

    fn flash_cell(&self, _cell: Cell, _reason: &'static str) {}

    fn draw_path(&self, _cells: &[Cell]) {}
}

impl ObstacleCost {
    pub fn passable(self) -> Option<u32> {
        match self {
            ObstacleCost::Clear => Some(0),
            ObstacleCost::Extra(c) => Some(c),
            ObstacleCost::Impassable => None,
        }
    }
}
