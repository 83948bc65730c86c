//! Builder-style test worlds, test-only.

use ahash::{AHashMap, AHashSet};
use common::parking_lot::Mutex;

use crate::cell::{Cell, GridDims};
use crate::region::{CellKind, RegionDiscovery, RegionGraph, SurfaceSource};
use crate::traversal::{AgentId, Capability, TraversalParams};
use crate::world::{NavWorld, ObstacleCost};

#[derive(Copy, Clone)]
struct Obstacle {
    destructible: bool,
}

pub struct SurfaceBuilder {
    dims: GridDims,
    solid: AHashSet<Cell>,
    doors: AHashMap<Cell, u32>,
    terrain: AHashMap<Cell, u32>,
    water: AHashSet<Cell>,
    obstacles: AHashMap<Cell, Obstacle>,
    avoid: AHashMap<Cell, u32>,
    allowed: Option<AHashSet<Cell>>,
    occupied: AHashSet<Cell>,
}

impl SurfaceBuilder {
    pub fn new(x: u32, z: u32) -> Self {
        Self {
            dims: GridDims::new(x, z),
            solid: AHashSet::new(),
            doors: AHashMap::new(),
            terrain: AHashMap::new(),
            water: AHashSet::new(),
            obstacles: AHashMap::new(),
            avoid: AHashMap::new(),
            allowed: None,
            occupied: AHashSet::new(),
        }
    }

    /// Removes cells from the surface entirely
    pub fn wall(mut self, cells: impl IntoIterator<Item = (i32, i32)>) -> Self {
        self.solid.extend(cells.into_iter().map(Cell::from));
        self
    }

    pub fn door(mut self, cell: (i32, i32), cost: u32) -> Self {
        self.doors.insert(cell.into(), cost);
        self
    }

    pub fn terrain(mut self, cell: (i32, i32), cost: u32) -> Self {
        self.terrain.insert(cell.into(), cost);
        self
    }

    pub fn water(mut self, cells: impl IntoIterator<Item = (i32, i32)>) -> Self {
        self.water.extend(cells.into_iter().map(Cell::from));
        self
    }

    /// Impassable obstacles standing on walkable surface
    pub fn obstacle_wall(
        mut self,
        cells: impl IntoIterator<Item = (i32, i32)>,
        destructible: bool,
    ) -> Self {
        for cell in cells {
            self.obstacles.insert(cell.into(), Obstacle { destructible });
        }
        self
    }

    pub fn avoidance(mut self, cell: (i32, i32), weight: u32) -> Self {
        self.avoid.insert(cell.into(), weight);
        self
    }

    /// Restricts the allowed area to exactly these cells
    pub fn allow_only(mut self, cells: impl IntoIterator<Item = (i32, i32)>) -> Self {
        self.allowed = Some(cells.into_iter().map(Cell::from).collect());
        self
    }

    /// Marks a cell occupied by some other agent
    pub fn occupied(mut self, cell: (i32, i32)) -> Self {
        self.occupied.insert(cell.into());
        self
    }

    pub fn build(self) -> TestWorld {
        let regions = RegionDiscovery::discover(&self);
        TestWorld {
            builder: self,
            regions,
            blocked: Mutex::new(AHashSet::new()),
        }
    }
}

impl SurfaceSource for SurfaceBuilder {
    fn dims(&self) -> GridDims {
        self.dims
    }

    fn kind(&self, cell: Cell) -> CellKind {
        if self.solid.contains(&cell) {
            CellKind::Solid
        } else if let Some(cost) = self.doors.get(&cell) {
            CellKind::Door(*cost)
        } else if self.obstacles.contains_key(&cell) {
            // obstacles split regions whether or not they are destructible
            CellKind::Solid
        } else {
            CellKind::Open
        }
    }
}

pub struct TestWorld {
    builder: SurfaceBuilder,
    regions: RegionGraph,
    /// Cells removed from the surface after discovery
    blocked: Mutex<AHashSet<Cell>>,
}

impl TestWorld {
    /// Makes a cell unwalkable without rediscovering regions: live
    /// walkability changes, the region graph keeps its discovery-time shape
    pub fn block(&self, cell: (i32, i32)) {
        self.blocked.lock().insert(cell.into());
    }
}

impl NavWorld for TestWorld {
    fn dims(&self) -> GridDims {
        self.builder.dims
    }

    fn is_walkable(&self, cell: Cell) -> bool {
        self.builder.dims.contains(cell)
            && !self.builder.solid.contains(&cell)
            && !self.blocked.lock().contains(&cell)
    }

    fn terrain_cost(&self, cell: Cell) -> u32 {
        self.builder.terrain.get(&cell).copied().unwrap_or(0)
    }

    fn is_water(&self, cell: Cell) -> bool {
        self.builder.water.contains(&cell)
    }

    fn obstacle_cost(&self, cell: Cell, params: &TraversalParams) -> ObstacleCost {
        if let Some(cost) = self.builder.doors.get(&cell) {
            return if params.can(Capability::OpenDoors) {
                ObstacleCost::Extra(*cost)
            } else {
                ObstacleCost::Impassable
            };
        }
        if self.builder.obstacles.contains_key(&cell) {
            return ObstacleCost::Impassable;
        }
        ObstacleCost::Clear
    }

    fn avoidance(&self, cell: Cell, _agent: Option<AgentId>) -> u32 {
        self.builder.avoid.get(&cell).copied().unwrap_or(0)
    }

    fn in_allowed_area(&self, cell: Cell, _agent: Option<AgentId>) -> bool {
        match &self.builder.allowed {
            Some(allowed) => allowed.contains(&cell),
            None => true,
        }
    }

    fn is_blocked_by_agent(&self, cell: Cell, _asking: Option<AgentId>) -> bool {
        self.builder.occupied.contains(&cell)
    }

    fn can_destroy(&self, cell: Cell) -> bool {
        self.builder
            .obstacles
            .get(&cell)
            .map(|o| o.destructible)
            .unwrap_or(false)
    }

    fn regions(&self) -> &RegionGraph {
        &self.regions
    }
}
