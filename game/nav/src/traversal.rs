use common::*;
use enumflags2::{bitflags, BitFlags};

use crate::cell::Cell;

/// Opaque handle to a host-owned agent
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct AgentId(pub u32);

/// What an agent is allowed to cross. A closed set of flags instead of
/// host-side capability introspection
#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Capability {
    CrossWater,
    OpenDoors,
    DestroyObstacles,
    CollidesWithAgents,
}

#[derive(Copy, Clone, Debug)]
pub struct TraversalParams {
    pub agent: Option<AgentId>,
    pub caps: BitFlags<Capability>,

    /// Agent-specific base cost of a cardinal move
    pub cost_cardinal: u32,

    /// Agent-specific base cost of a diagonal move
    pub cost_diagonal: u32,
}

/// Policy for what counts as reaching the destination
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EndMode {
    /// Arrive exactly inside the destination
    OnCell,

    /// Arrive on or adjacent to the destination, excluding the diagonal
    /// corners of the surrounding ring
    Touch,
}

/// Inclusive cell rectangle
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct CellRect {
    min: Cell,
    max: Cell,
}

/// A search target, single cell or area
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Destination(CellRect);

/// Destination combined with its end mode, precomputed once per search
#[derive(Copy, Clone, Debug)]
pub struct GoalArea {
    rect: CellRect,
    /// Corner cells excluded from touch semantics, empty otherwise
    disallowed: [Option<Cell>; 4],
}

impl TraversalParams {
    pub fn for_agent(agent: AgentId) -> Self {
        Self {
            agent: Some(agent),
            caps: Capability::CrossWater | Capability::CollidesWithAgents,
            cost_cardinal: 13,
            cost_diagonal: 18,
        }
    }

    /// Agent-less params, e.g. feasibility queries for a hypothetical mover
    pub fn generic() -> Self {
        Self {
            agent: None,
            caps: Capability::CrossWater.into(),
            cost_cardinal: 13,
            cost_diagonal: 18,
        }
    }

    pub fn with_caps(mut self, caps: BitFlags<Capability>) -> Self {
        self.caps = caps;
        self
    }

    pub fn can(&self, cap: Capability) -> bool {
        self.caps.contains(cap)
    }

    /// Stable identity of this traversal mode for caching. Two params with
    /// equal signatures answer reachability identically
    pub fn signature(&self) -> u64 {
        let agent = self.agent.map(|a| a.0 as u64 + 1).unwrap_or(0);
        (agent << 8) | self.caps.bits() as u64
    }
}

impl CellRect {
    pub fn new(a: Cell, b: Cell) -> Self {
        Self {
            min: Cell(a.0.min(b.0), a.1.min(b.1)),
            max: Cell(a.0.max(b.0), a.1.max(b.1)),
        }
    }

    pub fn single(cell: Cell) -> Self {
        Self {
            min: cell,
            max: cell,
        }
    }

    pub fn min(&self) -> Cell {
        self.min
    }

    pub fn max(&self) -> Cell {
        self.max
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.0 >= self.min.0 && cell.0 <= self.max.0 && cell.1 >= self.min.1 && cell.1 <= self.max.1
    }

    pub fn expanded(&self, by: i32) -> Self {
        Self {
            min: Cell(self.min.0 - by, self.min.1 - by),
            max: Cell(self.max.0 + by, self.max.1 + by),
        }
    }

    pub fn corners(&self) -> [Cell; 4] {
        [
            self.min,
            Cell(self.max.0, self.min.1),
            Cell(self.min.0, self.max.1),
            self.max,
        ]
    }

    pub fn center(&self) -> Cell {
        Cell(
            (self.min.0 + self.max.0) / 2,
            (self.min.1 + self.max.1) / 2,
        )
    }

    pub fn iter_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let (min, max) = (self.min, self.max);
        (min.1..=max.1).flat_map(move |z| (min.0..=max.0).map(move |x| Cell(x, z)))
    }

    pub fn is_single_cell(&self) -> bool {
        self.min == self.max
    }
}

impl Destination {
    pub fn single(cell: Cell) -> Self {
        Self(CellRect::single(cell))
    }

    pub fn area(a: Cell, b: Cell) -> Self {
        Self(CellRect::new(a, b))
    }

    pub fn rect(&self) -> &CellRect {
        &self.0
    }

    pub fn center(&self) -> Cell {
        self.0.center()
    }

    /// The cells that satisfy the end mode, minus disallowed corners for
    /// touch on an area
    pub fn goal_area(&self, end_mode: EndMode) -> GoalArea {
        match end_mode {
            EndMode::OnCell => GoalArea {
                rect: self.0,
                disallowed: [None; 4],
            },
            EndMode::Touch => {
                let expanded = self.0.expanded(1);
                let mut disallowed = [None; 4];
                for (slot, corner) in disallowed.iter_mut().zip(expanded.corners()) {
                    *slot = Some(corner);
                }
                GoalArea {
                    rect: expanded,
                    disallowed,
                }
            }
        }
    }
}

impl GoalArea {
    pub fn contains(&self, cell: Cell) -> bool {
        self.rect.contains(cell) && !self.disallowed.iter().flatten().any(|&c| c == cell)
    }

    pub fn rect(&self) -> &CellRect {
        &self.rect
    }

    pub fn iter_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.rect.iter_cells().filter(move |c| self.contains(*c))
    }
}

impl Debug for AgentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "agent #{}", self.0)
    }
}

impl Debug for CellRect {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "[{:?} -> {:?}]", self.min, self.max)
    }
}

slog_value_debug!(AgentId);
slog_value_debug!(Destination);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_on_cell_is_exact() {
        let dest = Destination::single(Cell(4, 4));
        let goal = dest.goal_area(EndMode::OnCell);

        assert!(goal.contains(Cell(4, 4)));
        assert!(!goal.contains(Cell(4, 5)));
        assert!(!goal.contains(Cell(5, 5)));
    }

    #[test]
    fn goal_touch_excludes_corners() {
        let dest = Destination::single(Cell(4, 4));
        let goal = dest.goal_area(EndMode::Touch);

        // centre and orthogonal neighbours count
        assert!(goal.contains(Cell(4, 4)));
        assert!(goal.contains(Cell(3, 4)));
        assert!(goal.contains(Cell(4, 3)));

        // diagonal corners of the expanded rect don't
        assert!(!goal.contains(Cell(3, 3)));
        assert!(!goal.contains(Cell(5, 5)));
        assert!(!goal.contains(Cell(3, 5)));
        assert!(!goal.contains(Cell(5, 3)));
    }

    #[test]
    fn goal_touch_area() {
        let dest = Destination::area(Cell(2, 2), Cell(4, 3));
        let goal = dest.goal_area(EndMode::Touch);

        assert!(goal.contains(Cell(1, 2)));
        assert!(goal.contains(Cell(5, 3)));
        assert!(goal.contains(Cell(3, 1)));
        assert!(!goal.contains(Cell(1, 1)));
        assert!(!goal.contains(Cell(5, 4)));
    }

    #[test]
    fn signatures_differ_by_caps_and_agent() {
        let a = TraversalParams::for_agent(AgentId(1));
        let b = TraversalParams::for_agent(AgentId(2));
        let c = a.clone().with_caps(a.caps | Capability::OpenDoors);

        assert_ne!(a.signature(), b.signature());
        assert_ne!(a.signature(), c.signature());
        assert_eq!(a.signature(), TraversalParams::for_agent(AgentId(1)).signature());
    }
}
