//! Exercising the expansion cap needs a search limit far below the default,
//! and the config global is process-wide, so this lives in its own binary.

use std::collections::HashSet;

use nav::{
    CancelToken, Cell, CellKind, Destination, EndMode, GridDims, NavWorld, ObstacleCost,
    PathError, Pathfinder, RegionDiscovery, RegionGraph, SurfaceSource, TraversalParams,
};

struct Surface {
    dims: GridDims,
    walls: HashSet<Cell>,
}

impl SurfaceSource for Surface {
    fn dims(&self) -> GridDims {
        self.dims
    }

    fn kind(&self, cell: Cell) -> CellKind {
        if self.walls.contains(&cell) {
            CellKind::Solid
        } else {
            CellKind::Open
        }
    }
}

/// A wall across the middle with a single gap in the far corner, so reaching
/// the other side takes many more expansions than the capped budget allows
struct WalledYard {
    surface: Surface,
    regions: RegionGraph,
}

impl WalledYard {
    fn new() -> Self {
        let surface = Surface {
            dims: GridDims::new(30, 30),
            walls: (0..29).map(|z| Cell(15, z)).collect(),
        };
        let regions = RegionDiscovery::discover(&surface);
        Self { surface, regions }
    }
}

impl NavWorld for WalledYard {
    fn dims(&self) -> GridDims {
        self.surface.dims
    }

    fn is_walkable(&self, cell: Cell) -> bool {
        self.surface.dims.contains(cell) && !self.surface.walls.contains(&cell)
    }

    fn terrain_cost(&self, _cell: Cell) -> u32 {
        0
    }

    fn is_water(&self, _cell: Cell) -> bool {
        false
    }

    fn obstacle_cost(&self, _cell: Cell, _params: &TraversalParams) -> ObstacleCost {
        ObstacleCost::Clear
    }

    fn regions(&self) -> &RegionGraph {
        &self.regions
    }
}

#[test]
fn expansion_cap_aborts_the_search() {
    common::logging::for_tests();
    config::init(config::ConfigType::String("(pathfinder: (search_limit: 25))"))
        .expect("config should parse");

    let yard = WalledYard::new();
    let mut finder = Pathfinder::new(yard.dims());

    let res = finder.find_path(
        &yard,
        Cell(0, 15),
        &Destination::single(Cell(29, 15)),
        EndMode::OnCell,
        &TraversalParams::generic(),
        &CancelToken::default(),
    );
    assert_eq!(res, Err(PathError::LimitExceeded(25)));
    assert!(finder.last_stats().aborted);

    // a goal on the near side still fits inside the budget
    let res = finder.find_path(
        &yard,
        Cell(0, 15),
        &Destination::single(Cell(3, 15)),
        EndMode::OnCell,
        &TraversalParams::generic(),
        &CancelToken::default(),
    );
    assert!(res.is_ok());
}
