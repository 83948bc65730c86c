use ahash::AHashMap;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableUnGraph};
use petgraph::visit::EdgeRef;

use common::*;
use grid::DynamicGrid;

use crate::cell::{Cell, GridDims};
use crate::region::RegionId;
use crate::traversal::CellRect;

pub type LinkId = EdgeIndex<u32>;

/// A contiguous walkable zone of the surface, clipped to its tile
pub struct Region {
    id: RegionId,
    valid: bool,
    cells: Vec<Cell>,
    /// Opening cost if this region is a single-cell door
    door_cost: Option<u32>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SpanAxis {
    X,
    Z,
}

/// Contiguous run of boundary cells forming one side of a link
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct LinkSpan {
    pub root: Cell,
    pub axis: SpanAxis,
    pub length: u16,
}

/// Boundary edge between two adjacent regions
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct RegionLink {
    pub span: LinkSpan,
}

type RegionNavGraph = StableUnGraph<Region, RegionLink, u32>;

pub struct RegionGraph {
    graph: RegionNavGraph,
    // need parallel edges between the same pair, so a lookup side table
    // rather than a graphmap
    node_lookup: AHashMap<RegionId, NodeIndex<u32>>,
    /// 0 = no region
    cell_regions: DynamicGrid<u32>,
    dims: GridDims,
    next: RegionId,
}

impl LinkSpan {
    pub fn iter_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let root = self.root;
        let axis = self.axis;
        (0..self.length as i32).map(move |i| match axis {
            SpanAxis::X => root.offset(i, 0),
            SpanAxis::Z => root.offset(0, i),
        })
    }

    /// The cell along the span closest to the given source cell
    pub fn closest_cell(&self, source: Cell) -> Cell {
        self.iter_cells()
            .min_by_key(|c| c.manhattan_distance(source))
            .expect("span cannot be zero length")
    }
}

impl Region {
    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn is_door(&self) -> bool {
        self.door_cost.is_some()
    }

    pub fn door_cost(&self) -> Option<u32> {
        self.door_cost
    }
}

impl RegionGraph {
    pub fn new(dims: GridDims) -> Self {
        Self {
            graph: RegionNavGraph::with_capacity(64, 64),
            node_lookup: AHashMap::with_capacity(64),
            cell_regions: DynamicGrid::new([dims.x() as usize, dims.z() as usize]),
            dims,
            next: RegionId::FIRST,
        }
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn add_region(&mut self, cells: Vec<Cell>, door_cost: Option<u32>) -> RegionId {
        assert!(!cells.is_empty(), "region must have cells");
        debug_assert!(
            door_cost.is_none() || cells.len() == 1,
            "door region must be a single cell"
        );

        let id = self.next;
        self.next = RegionId(id.0 + 1);

        for cell in &cells {
            let idx = self
                .dims
                .index_of(*cell)
                .unwrap_or_else(|| panic!("region cell {} out of bounds", cell));
            debug_assert_eq!(self.cell_regions[idx], 0, "cell {} already owned", cell);
            self.cell_regions[idx] = id.0;
        }

        let node = self.graph.add_node(Region {
            id,
            valid: true,
            cells,
            door_cost,
        });
        self.node_lookup.insert(id, node);

        id
    }

    pub fn add_link(&mut self, a: RegionId, b: RegionId, span: LinkSpan) -> Option<LinkId> {
        let (na, nb) = (self.node(a)?, self.node(b)?);
        debug!("adding region link"; "a" => a, "b" => b, "root" => span.root, "len" => span.length);
        Some(self.graph.add_edge(na, nb, RegionLink { span }))
    }

    /// Marks the region invalid without removing it; the provider rebuilds
    /// later
    pub fn invalidate(&mut self, id: RegionId) {
        if let Some(node) = self.node_lookup.get(&id).copied() {
            if let Some(region) = self.graph.node_weight_mut(node) {
                region.valid = false;
            }
        }
    }

    pub fn region_at(&self, cell: Cell) -> Option<RegionId> {
        let idx = self.dims.index_of(cell)?;
        RegionId(self.cell_regions[idx]).ok()
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        let node = self.node(id)?;
        self.graph.node_weight(node)
    }

    /// Links leaving the region, with the region on the far side
    pub fn links_of(
        &self,
        id: RegionId,
    ) -> impl Iterator<Item = (LinkId, &RegionLink, RegionId)> + '_ {
        self.node(id).into_iter().flat_map(move |node| {
            self.graph.edges(node).map(move |e| {
                let other = if e.source() == node {
                    e.target()
                } else {
                    e.source()
                };
                (e.id(), e.weight(), self.graph[other].id)
            })
        })
    }

    pub fn link(&self, id: LinkId) -> Option<(&RegionLink, (RegionId, RegionId))> {
        let weight = self.graph.edge_weight(id)?;
        let (a, b) = self.graph.edge_endpoints(id)?;
        Some((weight, (self.graph[a].id, self.graph[b].id)))
    }

    pub fn neighbours(&self, id: RegionId) -> impl Iterator<Item = RegionId> + '_ {
        self.node(id)
            .into_iter()
            .flat_map(move |node| self.graph.neighbors(node).map(move |n| self.graph[n].id))
    }

    /// Distinct valid regions intersecting the rect
    pub fn regions_of_rect(&self, rect: &CellRect) -> SmallVec<[RegionId; 4]> {
        let mut out = SmallVec::new();
        for cell in rect.iter_cells() {
            if let Some(id) = self.region_at(cell) {
                if !out.contains(&id) {
                    out.push(id);
                }
            }
        }
        out
    }

    pub fn region_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn node(&self, id: RegionId) -> Option<NodeIndex<u32>> {
        self.node_lookup.get(&id).copied()
    }
}

impl Debug for LinkSpan {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "LinkSpan({} along {:?} x{})",
            self.root, self.axis, self.length
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_cells_and_closest() {
        let span = LinkSpan {
            root: Cell(4, 2),
            axis: SpanAxis::Z,
            length: 3,
        };

        let cells = span.iter_cells().collect::<Vec<_>>();
        assert_eq!(cells, vec![Cell(4, 2), Cell(4, 3), Cell(4, 4)]);

        assert_eq!(span.closest_cell(Cell(0, 0)), Cell(4, 2));
        assert_eq!(span.closest_cell(Cell(9, 9)), Cell(4, 4));
        assert_eq!(span.closest_cell(Cell(4, 3)), Cell(4, 3));
    }

    #[test]
    fn parallel_links_between_same_pair() {
        let dims = GridDims::new(8, 8);
        let mut graph = RegionGraph::new(dims);

        let a = graph.add_region(vec![Cell(0, 0)], None);
        let b = graph.add_region(vec![Cell(2, 0)], None);

        let span = |z| LinkSpan {
            root: Cell(1, z),
            axis: SpanAxis::Z,
            length: 1,
        };
        graph.add_link(a, b, span(0)).unwrap();
        graph.add_link(a, b, span(4)).unwrap();

        assert_eq!(graph.link_count(), 2);
        assert_eq!(graph.links_of(a).count(), 2);
        // but only one neighbouring region
        let mut ns = graph.neighbours(a).collect::<Vec<_>>();
        ns.dedup();
        assert_eq!(ns, vec![b]);
    }

    #[test]
    fn cell_ownership() {
        let dims = GridDims::new(4, 4);
        let mut graph = RegionGraph::new(dims);

        let id = graph.add_region(vec![Cell(1, 1), Cell(1, 2)], None);
        assert_eq!(graph.region_at(Cell(1, 1)), Some(id));
        assert_eq!(graph.region_at(Cell(1, 2)), Some(id));
        assert_eq!(graph.region_at(Cell(0, 0)), None);
        assert_eq!(graph.region_at(Cell(-1, 0)), None);
    }

    #[test]
    fn invalidation_keeps_region() {
        let dims = GridDims::new(4, 4);
        let mut graph = RegionGraph::new(dims);

        let id = graph.add_region(vec![Cell(0, 0)], None);
        assert!(graph.region(id).unwrap().is_valid());

        graph.invalidate(id);
        assert!(!graph.region(id).unwrap().is_valid());
        // still resolvable, just not traversable
        assert_eq!(graph.region_at(Cell(0, 0)), Some(id));
    }
}
