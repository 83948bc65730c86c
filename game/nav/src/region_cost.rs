//! Long-range distance estimates over the region graph.
//!
//! A lazy, memoized Dijkstra from the destination outward across region
//! links. Distances are kept per link; a region's estimate is fixed the
//! first time one of its links settles and the region is never expanded
//! again. Crossing a region is priced by a sampled median cost density
//! rather than true per-cell costs.

use std::collections::BinaryHeap;

use ahash::{AHashMap, AHashSet};

use common::*;

use crate::cell::{is_diagonal_offset, octile_cost, Cell, NEIGHBOUR_OFFSETS};
use crate::pathfind::MinScored;
use crate::region::{LinkId, LinkSpan, RegionGraph, RegionId};
use crate::traversal::{CellRect, TraversalParams};
use crate::world::NavWorld;

/// Sentinel distance for regions with no route to the destination. Callers
/// compare against it, they never see an error
pub const COST_UNREACHABLE: u32 = 10_000_000;

/// Sample value for a cell that the current traversal mode cannot enter at
/// all. Regions only hold walkable cells, but obstacles can still bar a mode
const IMPASSABLE_SAMPLE: u32 = 10_000;

/// Distance estimate from a region to the destination
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RegionDistance {
    pub cost: u32,
    /// Cheapest boundary link out of the region towards the destination,
    /// with its own settled distance
    pub best_link: Option<(LinkId, u32)>,
    pub second_link: Option<(LinkId, u32)>,
}

impl RegionDistance {
    pub const UNREACHABLE: Self = Self {
        cost: COST_UNREACHABLE,
        best_link: None,
        second_link: None,
    };

    pub fn is_reachable(&self) -> bool {
        self.cost < COST_UNREACHABLE
    }
}

#[derive(Copy, Clone)]
struct RegionEstimate {
    best: (u32, LinkId),
    second: Option<(u32, LinkId)>,
}

/// One destination's worth of lazy region distances. Build once per search,
/// query as often as the heuristic needs
pub struct RegionCosts<'a, W: NavWorld + ?Sized> {
    world: &'a W,
    graph: &'a RegionGraph,
    params: TraversalParams,
    dest_rect: CellRect,
    /// Regions touching the destination rect, distance 0 by definition
    dest_regions: SmallVec<[RegionId; 4]>,

    estimates: AHashMap<RegionId, RegionEstimate>,
    /// Regions whose outgoing links have been pushed
    expanded: AHashSet<RegionId>,
    settled: AHashSet<LinkId>,
    frontier: BinaryHeap<MinScored<u32, LinkId>>,
    /// Memoized per-region median cost density
    densities: AHashMap<RegionId, u32>,
}

impl<'a, W: NavWorld + ?Sized> RegionCosts<'a, W> {
    pub fn new(world: &'a W, dest_rect: CellRect, params: TraversalParams) -> Self {
        let graph = world.regions();
        let dest_regions = graph.regions_of_rect(&dest_rect);

        let mut this = Self {
            world,
            graph,
            params,
            dest_rect,
            dest_regions,
            estimates: AHashMap::new(),
            expanded: AHashSet::new(),
            settled: AHashSet::new(),
            frontier: BinaryHeap::new(),
            densities: AHashMap::new(),
        };
        this.seed_goal_links();
        this
    }

    pub fn dest_rect(&self) -> &CellRect {
        &self.dest_rect
    }

    /// Distance estimate from the given region to the destination, pumping
    /// the coarse search only as far as this query demands
    pub fn distance_to(&mut self, region: RegionId) -> RegionDistance {
        if self.dest_regions.contains(&region) {
            return RegionDistance {
                cost: 0,
                best_link: None,
                second_link: None,
            };
        }

        self.pump_until(region);

        match self.estimates.get(&region) {
            Some(est) => RegionDistance {
                cost: est.best.0,
                best_link: Some((est.best.1, est.best.0)),
                second_link: est.second.map(|(d, l)| (l, d)),
            },
            None => RegionDistance::UNREACHABLE,
        }
    }

    /// Runs the link Dijkstra until the region has both links recorded or
    /// the frontier runs dry
    fn pump_until(&mut self, target: RegionId) {
        let needs_more = |est: Option<&RegionEstimate>| match est {
            None => true,
            Some(est) => est.second.is_none(),
        };

        while needs_more(self.estimates.get(&target)) {
            let MinScored(dist, link) = match self.frontier.pop() {
                Some(entry) => entry,
                None => return,
            };
            if !self.settled.insert(link) {
                continue;
            }

            let (span, (a, b)) = match self.graph.link(link) {
                Some(l) => (l.0.span, l.1),
                None => continue,
            };

            for region in [a, b] {
                self.record(region, dist, link);

                if self.expanded.insert(region) {
                    self.expand(region, link, span, dist);
                }
            }
        }
    }

    /// Notes a settled link against its region. First settle fixes the best
    /// link, a later one the second
    fn record(&mut self, region: RegionId, dist: u32, link: LinkId) {
        match self.estimates.get_mut(&region) {
            None => {
                self.estimates.insert(
                    region,
                    RegionEstimate {
                        best: (dist, link),
                        second: None,
                    },
                );
            }
            Some(est) => {
                if est.second.is_none() && est.best.1 != link {
                    est.second = Some((dist, link));
                }
            }
        }
    }

    /// Pushes all of the region's other links priced for crossing it
    fn expand(&mut self, region: RegionId, via: LinkId, via_span: LinkSpan, dist: u32) {
        let links = self
            .graph
            .links_of(region)
            .map(|(id, l, _)| (id, l.span))
            .collect::<SmallVec<[_; 8]>>();

        for (other, span) in links {
            if other == via || self.settled.contains(&other) {
                continue;
            }

            let cross = self.crossing_cost(region, via_span, span);
            self.frontier
                .push(MinScored(dist.saturating_add(cross), other));
        }
    }

    /// Cost of crossing a region between two of its links. Doors cost their
    /// opening cost, open regions a density-scaled octile distance
    fn crossing_cost(
        &mut self,
        region: RegionId,
        from: LinkSpan,
        to: LinkSpan,
    ) -> u32 {
        if let Some(cost) = self
            .graph
            .region(region)
            .and_then(|r| r.door_cost())
        {
            return cost;
        }

        let density = self.density(region);
        // diagonal steps keep the same ratio as the agent's own move costs
        let diagonal = density.saturating_mul(self.params.cost_diagonal)
            / self.params.cost_cardinal.max(1);
        let a = from.closest_cell(to.root);
        let b = to.closest_cell(a);
        octile_cost(a, b, density, diagonal).max(1)
    }

    /// Median sampled cost of entering a cell of this region, used as the
    /// price per cardinal step when crossing it
    fn density(&mut self, region: RegionId) -> u32 {
        if let Some(d) = self.densities.get(&region) {
            return *d;
        }

        let d = self.sample_density(region);
        self.densities.insert(region, d);
        d
    }

    fn sample_density(&self, region: RegionId) -> u32 {
        let cells = match self.graph.region(region) {
            Some(r) => r.cells(),
            None => return self.params.cost_cardinal,
        };

        let sample_count = config::get().region_costs.sample_count.max(1);

        // deterministic per region so estimates are stable across searches
        let mut rng = SmallRng::seed_from_u64(region.0 as u64);
        let mut samples = cells
            .choose_multiple(&mut rng, sample_count)
            .map(|cell| self.cell_cost(*cell))
            .collect::<SmallVec<[u32; 16]>>();
        samples.sort_unstable();

        // lower median, deliberately a touch optimistic
        let median = (samples.len() / 2).saturating_sub(1);
        samples[median]
    }

    /// Local traversal cost of one cell, agent collisions excluded since
    /// they move before a long path gets there
    fn cell_cost(&self, cell: Cell) -> u32 {
        let obstacle = match self.world.obstacle_cost(cell, &self.params).passable() {
            Some(extra) => extra,
            None => return IMPASSABLE_SAMPLE,
        };

        let cfg = config::get();
        let mut cost = self
            .params
            .cost_cardinal
            .saturating_add(self.world.terrain_cost(cell))
            .saturating_add(obstacle)
            .saturating_add(self.world.avoidance(cell, self.params.agent) * cfg.pathfinder.avoidance_weight);

        if !self.world.in_allowed_area(cell, self.params.agent) {
            cost = cost.saturating_add(cfg.pathfinder.out_of_area_penalty);
        }

        cost
    }

    /// Exact cell Dijkstra from the destination rect to each link of the
    /// destination regions. The coarse model is too blunt right next to the
    /// goal, so these links get real distances
    fn seed_goal_links(&mut self) {
        let mut dist: AHashMap<Cell, u32> = AHashMap::new();
        let mut heap: BinaryHeap<MinScored<u32, Cell>> = BinaryHeap::new();

        for cell in self.dest_rect.iter_cells() {
            if self.world.is_walkable(cell) {
                dist.insert(cell, 0);
                heap.push(MinScored(0, cell));
            }
        }

        // cells eligible for relaxation: the destination regions plus their
        // link spans (span cells may sit across the boundary)
        let mut allowed: AHashSet<Cell> = AHashSet::new();
        let mut goal_links: AHashMap<Cell, SmallVec<[LinkId; 2]>> = AHashMap::new();
        for region in self.dest_regions.clone() {
            if let Some(r) = self.graph.region(region) {
                allowed.extend(r.cells().iter().copied());
            }
            for (id, link, _) in self.graph.links_of(region) {
                for cell in link.span.iter_cells() {
                    allowed.insert(cell);
                    goal_links.entry(cell).or_default().push(id);
                }
            }
        }

        let mut remaining = goal_links.values().flatten().copied().collect::<AHashSet<_>>();
        let mut seeds: AHashMap<LinkId, u32> = AHashMap::new();

        while let Some(MinScored(d, cell)) = heap.pop() {
            if dist.get(&cell).copied().unwrap_or(u32::MAX) < d {
                continue;
            }

            if let Some(links) = goal_links.get(&cell) {
                for link in links {
                    if remaining.remove(link) {
                        seeds.insert(*link, d);
                    }
                }
                if remaining.is_empty() {
                    break;
                }
            }

            for (dx, dz) in NEIGHBOUR_OFFSETS {
                let next = cell.offset(dx, dz);
                if !allowed.contains(&next) {
                    continue;
                }

                let diagonal = is_diagonal_offset(dx, dz);
                let step = some_or_continue!(self.step_cost(cell, next, diagonal));
                let nd = d.saturating_add(step);
                if nd < dist.get(&next).copied().unwrap_or(u32::MAX) {
                    dist.insert(next, nd);
                    heap.push(MinScored(nd, next));
                }
            }
        }

        for (link, d) in seeds {
            self.frontier.push(MinScored(d, link));
        }
    }

    fn step_cost(&self, from: Cell, into: Cell, diagonal: bool) -> Option<u32> {
        if !self.world.is_walkable(into) {
            return None;
        }
        if diagonal {
            // no corner cutting, same rule as the grid search
            let (a, b) = (Cell(into.x(), from.z()), Cell(from.x(), into.z()));
            if !self.world.is_walkable(a) || !self.world.is_walkable(b) {
                return None;
            }
        }

        let base = if diagonal {
            self.params.cost_diagonal
        } else {
            self.params.cost_cardinal
        };
        let obstacle = self.world.obstacle_cost(into, &self.params).passable()?;
        Some(base + self.world.terrain_cost(into) + obstacle)
    }
}
