use common::*;
use grid::DynamicGrid;

use crate::cell::{Cell, GridDims};
use crate::region::graph::{LinkSpan, RegionGraph, SpanAxis};
use crate::region::RegionId;

/// Region size bound. Flood fills never cross a tile boundary, so long-range
/// estimates stay meaningful on wide open surfaces
pub const TILE_SIZE: i32 = 12;

/// What a cell is, as far as region membership goes
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CellKind {
    /// Open surface, part of a normal region
    Open,

    /// Door with its opening cost; becomes a single-cell region
    Door(u32),

    /// Not part of the surface at all
    Solid,
}

/// The surface as seen by region discovery. Deliberately narrower than the
/// full nav world so providers can run before the world is assembled
pub trait SurfaceSource {
    fn dims(&self) -> GridDims;
    fn kind(&self, cell: Cell) -> CellKind;
}

/// Reference region graph provider. Flood fills open cells into per-tile
/// regions, makes each door its own single-cell region, then groups boundary
/// runs between differing regions into link spans
pub struct RegionDiscovery {
    dims: GridDims,
    /// Assigned region per cell, 0 until visited
    assigned: DynamicGrid<u32>,
    /// Flood fill frontier, reused across fills
    frontier: Vec<usize>,
}

impl RegionDiscovery {
    pub fn discover(source: &impl SurfaceSource) -> RegionGraph {
        let dims = source.dims();
        let mut this = Self {
            dims,
            assigned: DynamicGrid::new([dims.x() as usize, dims.z() as usize]),
            frontier: Vec::new(),
        };

        let mut graph = RegionGraph::new(dims);
        this.fill_regions(source, &mut graph);
        this.discover_links(&mut graph);

        debug!(
            "region discovery finished";
            "regions" => graph.region_count(),
            "links" => graph.link_count(),
        );
        graph
    }

    fn fill_regions(&mut self, source: &impl SurfaceSource, graph: &mut RegionGraph) {
        for idx in 0..self.dims.cell_count() {
            if self.assigned[idx] != 0 {
                continue;
            }

            let cell = self.dims.cell_of(idx);
            match source.kind(cell) {
                CellKind::Solid => {}
                CellKind::Door(cost) => {
                    let id = graph.add_region(vec![cell], Some(cost));
                    self.assigned[idx] = id.0;
                }
                CellKind::Open => self.flood_fill(source, graph, idx),
            }
        }
    }

    /// Cardinal flood fill of one contiguous open zone, clipped to the tile
    /// containing the start cell
    fn flood_fill(&mut self, source: &impl SurfaceSource, graph: &mut RegionGraph, start: usize) {
        // region ids are handed out by the graph, so cells are marked with a
        // placeholder first and patched afterwards
        const PENDING: u32 = u32::MAX;

        let tile = tile_of(self.dims.cell_of(start));

        let mut cells = Vec::new();
        self.frontier.clear();
        self.frontier.push(start);
        self.assigned[start] = PENDING;

        while let Some(idx) = self.frontier.pop() {
            cells.push(self.dims.cell_of(idx));

            let neighbours = self
                .assigned
                .cardinal_neighbours(idx)
                .collect::<ArrayVec<_, 4>>();
            for n in neighbours {
                if self.assigned[n] != 0 {
                    continue;
                }

                let cell = self.dims.cell_of(n);
                if tile_of(cell) == tile && source.kind(cell) == CellKind::Open {
                    self.assigned[n] = PENDING;
                    self.frontier.push(n);
                }
            }
        }

        let id = graph.add_region(cells, None);
        let assigned = &mut self.assigned;
        for cell in graph.region(id).expect("region just added").cells() {
            let idx = self.dims.index_of(*cell).expect("discovered in bounds");
            assigned[idx] = id.0;
        }
    }

    /// Groups adjacent differing-region runs along both axes into link spans
    fn discover_links(&self, graph: &mut RegionGraph) {
        let (w, h) = (self.dims.x() as i32, self.dims.z() as i32);

        // boundaries between (x, z) and (x+1, z): spans run along z
        for x in 0..w - 1 {
            let pairs = (0..h).map(|z| (z, self.pair_at(Cell(x, z), Cell(x + 1, z))));
            Self::emit_spans(graph, pairs, |z0, len| LinkSpan {
                root: Cell(x, z0),
                axis: SpanAxis::Z,
                length: len,
            });
        }

        // boundaries between (x, z) and (x, z+1): spans run along x
        for z in 0..h - 1 {
            let pairs = (0..w).map(|x| (x, self.pair_at(Cell(x, z), Cell(x, z + 1))));
            Self::emit_spans(graph, pairs, |x0, len| LinkSpan {
                root: Cell(x0, z),
                axis: SpanAxis::X,
                length: len,
            });
        }
    }

    fn pair_at(&self, a: Cell, b: Cell) -> Option<(RegionId, RegionId)> {
        let ra = self.region_of(a)?;
        let rb = self.region_of(b)?;
        (ra != rb).then(|| (ra, rb))
    }

    fn region_of(&self, cell: Cell) -> Option<RegionId> {
        let idx = self.dims.index_of(cell)?;
        RegionId(self.assigned[idx]).ok()
    }

    fn emit_spans(
        graph: &mut RegionGraph,
        pairs: impl Iterator<Item = (i32, Option<(RegionId, RegionId)>)>,
        make_span: impl Fn(i32, u16) -> LinkSpan,
    ) {
        for (pair, mut group) in &pairs.group_by(|(_, pair)| *pair) {
            let pair = some_or_continue!(pair);
            let (start, _) = group.next().expect("groups are never empty");
            let length = 1 + group.count() as u16;

            graph.add_link(pair.0, pair.1, make_span(start, length));
        }
    }
}

fn tile_of(cell: Cell) -> (i32, i32) {
    (cell.x().div_euclid(TILE_SIZE), cell.z().div_euclid(TILE_SIZE))
}
