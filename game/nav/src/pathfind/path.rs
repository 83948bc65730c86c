use common::*;

use crate::cell::Cell;

/// One step of a path and what it costs to enter
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct PathNode {
    pub cell: Cell,
    /// Cost of stepping into this cell from its predecessor, 0 for the start
    pub entry_cost: u32,
}

/// A concrete cell-by-cell route. First node is the start, last node
/// satisfies the requested end mode
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Path {
    nodes: Vec<PathNode>,
    /// The cell the search was aiming for, not necessarily the last node
    target: Cell,
    total_cost: u32,
    used_region_heuristic: bool,
}

impl Path {
    pub(crate) fn new(nodes: Vec<PathNode>, target: Cell, used_region_heuristic: bool) -> Self {
        debug_assert!(!nodes.is_empty());
        let total_cost = nodes.iter().map(|n| n.entry_cost).sum();
        Self {
            nodes,
            target,
            total_cost,
            used_region_heuristic,
        }
    }

    pub fn nodes(&self) -> &[PathNode] {
        &self.nodes
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.nodes.iter().map(|n| n.cell)
    }

    pub fn start(&self) -> Cell {
        self.nodes[0].cell
    }

    pub fn end(&self) -> Cell {
        self.nodes[self.nodes.len() - 1].cell
    }

    /// The cell the search was aiming for. Differs from [end] when the end
    /// mode only required touching the destination
    pub fn target(&self) -> Cell {
        self.target
    }

    pub fn total_cost(&self) -> u32 {
        self.total_cost
    }

    /// Whether the search switched to the region heuristic. Such paths are
    /// treated as less trustworthy near their end
    pub fn used_region_heuristic(&self) -> bool {
        self.used_region_heuristic
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(
            f,
            "path of {} cells from {} to {} (cost {})",
            self.nodes.len(),
            self.start(),
            self.end(),
            self.total_cost
        )
    }
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum PathError {
    #[error("cell {0} is out of bounds")]
    OutOfBounds(Cell),

    #[error("cell {0} is not walkable")]
    NotWalkable(Cell),

    #[error("destination has no enterable goal cell")]
    GoalBlocked,

    #[error("frontier exhausted, no route exists")]
    NoRoute,

    #[error("node expansion limit of {0} hit before reaching the goal")]
    LimitExceeded(usize),

    #[error("search cancelled")]
    Cancelled,
}

slog_value_debug!(PathError);
