//! Grid A* over the traversal surface.
//!
//! Starts with a local octile heuristic whose strength scales with distance
//! to the goal. Once enough nodes have been opened the search switches, once
//! and permanently, to region-graph distance estimates and restarts from the
//! start cell, discarding everything learnt under the local scores.

use common::*;

use crate::cell::{is_diagonal_offset, octile_cost, Cell, GridDims, NEIGHBOUR_OFFSETS};
use crate::curve;
use crate::pathfind::path::{Path, PathError, PathNode};
use crate::pathfind::scratch::SearchScratch;
use crate::pool::CancelToken;
use crate::region_cost::{RegionCosts, COST_UNREACHABLE};
use crate::region::RegionGraph;
use crate::traversal::{Capability, CellRect, Destination, EndMode, TraversalParams};
use crate::world::NavWorld;

/// Counters from the most recent search
#[derive(Copy, Clone, Debug, Default)]
pub struct SearchStats {
    /// Nodes pushed onto the frontier, including re-openings
    pub opened: usize,
    /// Nodes popped and expanded
    pub expanded: usize,
    pub used_region_heuristic: bool,
    /// Cancelled or over the expansion cap
    pub aborted: bool,
}

/// A reusable grid searcher. Holds its scratch allocations across searches,
/// so one instance per concurrent search
pub struct Pathfinder {
    scratch: SearchScratch,
    stats: SearchStats,
}

impl Pathfinder {
    pub fn new(dims: GridDims) -> Self {
        Self {
            scratch: SearchScratch::new(dims),
            stats: SearchStats::default(),
        }
    }

    pub fn last_stats(&self) -> SearchStats {
        self.stats
    }

    pub fn find_path<W: NavWorld + ?Sized>(
        &mut self,
        world: &W,
        from: Cell,
        dest: &Destination,
        end_mode: EndMode,
        params: &TraversalParams,
        cancel: &CancelToken,
    ) -> Result<Path, PathError> {
        let cfg = config::get();
        let tuning = &cfg.pathfinder;
        let dims = world.dims();
        let graph = world.regions();

        if !dims.contains(from) {
            return Err(PathError::OutOfBounds(from));
        }
        if !world.is_walkable(from) {
            return Err(PathError::NotWalkable(from));
        }

        let goal = dest.goal_area(end_mode);
        let goal_rect = *goal.rect();
        let target = dest.center();
        if !goal.iter_cells().any(|c| dims.contains(c)) {
            return Err(PathError::OutOfBounds(target));
        }
        if dest.rect().is_single_cell()
            && end_mode == EndMode::OnCell
            && !world.is_walkable(target)
        {
            return Err(PathError::NotWalkable(target));
        }

        self.stats = SearchStats::default();
        self.scratch.begin_search(dims);

        if goal.contains(from) {
            return Ok(Path::new(
                vec![PathNode {
                    cell: from,
                    entry_cost: 0,
                }],
                target,
                false,
            ));
        }

        let mut region_costs: Option<RegionCosts<'_, W>> = None;

        let start_idx = dims.index_of(from).ok_or(PathError::OutOfBounds(from))?;
        let h0 = local_heuristic(from, &goal_rect, params, &tuning.heuristic_strength);
        self.scratch.open(start_idx, 0, start_idx, h0);
        self.stats.opened = 1;

        while let Some(idx) = self.scratch.pop() {
            if cancel.is_cancelled() {
                self.stats.aborted = true;
                debug!("search cancelled"; "expanded" => self.stats.expanded);
                return Err(PathError::Cancelled);
            }

            self.scratch.close(idx);
            let cell = dims.cell_of(idx);

            if goal.contains(cell) {
                let nodes = self.reconstruct(dims, start_idx, idx);
                debug!(
                    "path found";
                    "from" => from, "target" => target,
                    "len" => nodes.len(), "expanded" => self.stats.expanded,
                    "region_heuristic" => self.stats.used_region_heuristic,
                );
                return Ok(Path::new(nodes, target, self.stats.used_region_heuristic));
            }

            self.stats.expanded += 1;
            if self.stats.expanded >= tuning.search_limit {
                self.stats.aborted = true;
                warn!(
                    "search hit expansion limit";
                    "from" => from, "target" => target, "limit" => tuning.search_limit,
                );
                return Err(PathError::LimitExceeded(tuning.search_limit));
            }

            // permanent switch to the region heuristic once the local one
            // has clearly stopped paying off. nodes costed under the inflated
            // local estimates can carry suboptimal g, so the whole search
            // restarts from the start cell under a fresh generation
            if region_costs.is_none() && self.stats.opened >= tuning.region_heuristic_threshold {
                let mut costs = RegionCosts::new(world, *dest.rect(), *params);
                self.stats.used_region_heuristic = true;
                debug!(
                    "switching to region heuristic";
                    "opened" => self.stats.opened, "expanded" => self.stats.expanded,
                );

                self.scratch.begin_search(dims);
                let h = region_heuristic(&mut costs, graph, from, params);
                self.scratch.open(start_idx, 0, start_idx, h);
                self.stats.opened += 1;
                region_costs = Some(costs);
                continue;
            }

            let g = self.scratch.g(idx);
            for (dx, dz) in NEIGHBOUR_OFFSETS {
                let next = cell.offset(dx, dz);
                let next_idx = some_or_continue!(dims.index_of(next));
                if self.scratch.is_closed(next_idx) {
                    continue;
                }
                if !world.is_walkable(next) {
                    continue;
                }

                let diagonal = is_diagonal_offset(dx, dz);
                if diagonal && cuts_corner(world, cell, dx, dz) {
                    continue;
                }

                let entry = some_or_continue!(entry_cost(world, next, params, diagonal));
                let next_g = g.saturating_add(entry);
                if self.scratch.is_open(next_idx) && next_g >= self.scratch.g(next_idx) {
                    continue;
                }

                let h = match region_costs.as_mut() {
                    Some(costs) => region_heuristic(costs, graph, next, params),
                    None => local_heuristic(next, &goal_rect, params, &tuning.heuristic_strength),
                };

                self.scratch.open(next_idx, next_g, idx, next_g as f32 + h);
                self.stats.opened += 1;
            }
        }

        debug!(
            "no route";
            "from" => from, "target" => target, "expanded" => self.stats.expanded,
        );
        Err(PathError::NoRoute)
    }

    fn reconstruct(&self, dims: GridDims, start_idx: usize, goal_idx: usize) -> Vec<PathNode> {
        let mut nodes = Vec::new();
        let mut idx = goal_idx;
        loop {
            let parent = self.scratch.parent(idx);
            let entry = if idx == start_idx {
                0
            } else {
                // parent g is always <= child g
                self.scratch.g(idx) - self.scratch.g(parent)
            };
            nodes.push(PathNode {
                cell: dims.cell_of(idx),
                entry_cost: entry,
            });

            if idx == start_idx {
                break;
            }
            idx = parent;
        }
        nodes.reverse();
        nodes
    }
}

/// Octile distance to the goal rect, inflated by the distance-scaled
/// strength curve. Deliberately inadmissible at range: far searches prefer
/// speed over optimality
fn local_heuristic(
    cell: Cell,
    goal: &CellRect,
    params: &TraversalParams,
    strength: &[(u32, f32)],
) -> f32 {
    let (dx, dz) = rect_deltas(cell, goal);
    let base = octile_deltas(dx, dz, params.cost_cardinal, params.cost_diagonal);
    let straight_line = dx.max(dz);
    base as f32 * curve::eval(strength, straight_line)
}

/// Region-graph estimate: the queried region's settled boundary links plus
/// the local octile distance to the nearer of them. Not strength-scaled, the
/// coarse distances already cover the range
fn region_heuristic<W: NavWorld + ?Sized>(
    costs: &mut RegionCosts<W>,
    graph: &RegionGraph,
    cell: Cell,
    params: &TraversalParams,
) -> f32 {
    let region = match graph.region_at(cell) {
        Some(r) => r,
        None => return COST_UNREACHABLE as f32,
    };

    let distance = costs.distance_to(region);
    if distance.cost == 0 {
        // inside a destination region: plain local distance
        let (dx, dz) = rect_deltas(cell, costs.dest_rect());
        return octile_deltas(dx, dz, params.cost_cardinal, params.cost_diagonal) as f32;
    }
    if !distance.is_reachable() {
        return COST_UNREACHABLE as f32;
    }

    let mut best = COST_UNREACHABLE as f32;
    for (link, link_dist) in [distance.best_link, distance.second_link]
        .into_iter()
        .flatten()
    {
        if let Some((link, _)) = graph.link(link) {
            let anchor = link.span.closest_cell(cell);
            let h = link_dist
                .saturating_add(octile_cost(
                    cell,
                    anchor,
                    params.cost_cardinal,
                    params.cost_diagonal,
                )) as f32;
            best = best.min(h);
        }
    }
    best
}

/// Cost of stepping into a cell, `None` if the traversal mode cannot enter
/// it at all. Shared with the follower's lookahead revalidation
pub fn entry_cost<W: NavWorld + ?Sized>(
    world: &W,
    into: Cell,
    params: &TraversalParams,
    diagonal: bool,
) -> Option<u32> {
    if world.is_water(into) && !params.can(Capability::CrossWater) {
        return None;
    }
    let obstacle = world.obstacle_cost(into, params).passable()?;

    let cfg = config::get();
    let tuning = &cfg.pathfinder;

    let base = if diagonal {
        params.cost_diagonal
    } else {
        params.cost_cardinal
    };
    let mut cost = base
        .saturating_add(world.terrain_cost(into))
        .saturating_add(obstacle)
        .saturating_add(world.avoidance(into, params.agent) * tuning.avoidance_weight);

    if !world.in_allowed_area(into, params.agent) {
        cost = cost.saturating_add(tuning.out_of_area_penalty);
    }
    if params.can(Capability::CollidesWithAgents) && world.is_blocked_by_agent(into, params.agent)
    {
        cost = cost.saturating_add(tuning.agent_block_penalty);
    }

    Some(cost)
}

/// Diagonal steps may not pass between two blocked orthogonal cells
pub(crate) fn cuts_corner<W: NavWorld + ?Sized>(world: &W, from: Cell, dx: i32, dz: i32) -> bool {
    !world.is_walkable(from.offset(dx, 0)) || !world.is_walkable(from.offset(0, dz))
}

fn rect_deltas(cell: Cell, rect: &CellRect) -> (u32, u32) {
    let dx = (rect.min().x() - cell.x()).max(cell.x() - rect.max().x()).max(0) as u32;
    let dz = (rect.min().z() - cell.z()).max(cell.z() - rect.max().z()).max(0) as u32;
    (dx, dz)
}

fn octile_deltas(dx: u32, dz: u32, cardinal: u32, diagonal: u32) -> u32 {
    let (lo, hi) = if dx < dz { (dx, dz) } else { (dz, dx) };
    lo * diagonal + (hi - lo) * cardinal
}
