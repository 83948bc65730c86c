//! Cheap connectivity queries ahead of a full search.
//!
//! Modes that respect static region validity get a BFS over the region
//! graph; modes that can destroy obstacles get a cell flood fill honouring
//! live state. Answers are cached per (origin region, destination region,
//! traversal signature) until something invalidates them.

use std::cell::{Cell as StdCell, RefCell};
use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};

use common::*;

use crate::cell::{Cell, NEIGHBOUR_OFFSETS};
use crate::region::RegionId;
use crate::traversal::{AgentId, Capability, Destination, EndMode, TraversalParams};
use crate::world::NavWorld;

type CacheKey = (RegionId, RegionId, u64);

#[derive(Copy, Clone)]
struct CachedReach {
    reachable: bool,
    /// Who asked, so their cached answers can be dropped when their
    /// capabilities change
    agent: Option<AgentId>,
}

struct ReachScratch {
    cache: AHashMap<CacheKey, CachedReach>,
    region_queue: VecDeque<RegionId>,
    region_seen: AHashSet<RegionId>,
    cell_queue: VecDeque<Cell>,
    cell_seen: AHashSet<Cell>,
}

/// The reachability oracle. Not reentrant: a query issued from inside
/// another query is refused and answered pessimistically
pub struct Reachability {
    inner: RefCell<ReachScratch>,
    reentrancy_warned: StdCell<bool>,
}

impl Default for Reachability {
    fn default() -> Self {
        Self::new()
    }
}

impl Reachability {
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(ReachScratch {
                cache: AHashMap::new(),
                region_queue: VecDeque::new(),
                region_seen: AHashSet::new(),
                cell_queue: VecDeque::new(),
                cell_seen: AHashSet::new(),
            }),
            reentrancy_warned: StdCell::new(false),
        }
    }

    /// Can an agent at `from` reach the destination at all. False negatives
    /// only under reentrancy; never panics
    pub fn can_reach<W: NavWorld + ?Sized>(
        &self,
        world: &W,
        from: Cell,
        dest: &Destination,
        end_mode: EndMode,
        params: &TraversalParams,
    ) -> bool {
        let mut inner = match self.inner.try_borrow_mut() {
            Ok(inner) => inner,
            Err(_) => {
                // fail closed rather than panic mid-query
                if !self.reentrancy_warned.replace(true) {
                    warn!("reentrant reachability query refused"; "from" => from);
                }
                return false;
            }
        };

        if params.can(Capability::DestroyObstacles) {
            // destructible modes ignore the static region graph entirely
            return inner.flood_fill(world, from, dest, end_mode, params);
        }

        let graph = world.regions();
        let origin = match graph.region_at(from) {
            Some(r) => r,
            None => return false,
        };

        let goal = dest.goal_area(end_mode);
        let targets = graph.regions_of_rect(goal.rect());
        if targets.is_empty() {
            return false;
        }

        let sig = params.signature();
        let mut unknown = SmallVec::<[RegionId; 4]>::new();
        for target in &targets {
            match inner.cache.get(&(origin, *target, sig)) {
                Some(hit) if hit.reachable => return true,
                Some(_) => {}
                None => unknown.push(*target),
            }
        }
        if unknown.is_empty() {
            // every target individually known unreachable
            return false;
        }

        inner.region_bfs(world, origin, &unknown, params)
    }

    /// Drops every cached answer
    pub fn invalidate_all(&self) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.cache.clear();
        }
    }

    /// Drops answers cached on behalf of one agent, e.g. after its
    /// capabilities changed
    pub fn invalidate_for_agent(&self, agent: AgentId) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.cache.retain(|_, v| v.agent != Some(agent));
        }
    }

    /// Drops answers involving a region, e.g. after terrain changed there
    pub fn invalidate_region(&self, region: RegionId) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner
                .cache
                .retain(|(origin, target, _), _| *origin != region && *target != region);
        }
    }

    #[cfg(test)]
    pub(crate) fn cached_answers(&self) -> usize {
        self.inner.borrow().cache.len()
    }
}

impl ReachScratch {
    /// BFS over region links. Door regions need the door capability, invalid
    /// regions are skipped until their provider rebuilds them
    fn region_bfs<W: NavWorld + ?Sized>(
        &mut self,
        world: &W,
        origin: RegionId,
        targets: &[RegionId],
        params: &TraversalParams,
    ) -> bool {
        let graph = world.regions();
        let sig = params.signature();

        self.region_queue.clear();
        self.region_seen.clear();
        self.region_queue.push_back(origin);
        self.region_seen.insert(origin);

        let mut found = None;
        'bfs: while let Some(region) = self.region_queue.pop_front() {
            if targets.contains(&region) {
                found = Some(region);
                break 'bfs;
            }

            let r = some_or_continue!(graph.region(region));
            if !r.is_valid() {
                continue;
            }
            if r.is_door() && !params.can(Capability::OpenDoors) {
                continue;
            }

            for next in graph.neighbours(region) {
                if self.region_seen.insert(next) {
                    self.region_queue.push_back(next);
                }
            }
        }

        match found {
            Some(region) => {
                self.cache.insert(
                    (origin, region, sig),
                    CachedReach {
                        reachable: true,
                        agent: params.agent,
                    },
                );
                true
            }
            None => {
                // the whole component was explored, every target missed
                for target in targets {
                    self.cache.insert(
                        (origin, *target, sig),
                        CachedReach {
                            reachable: false,
                            agent: params.agent,
                        },
                    );
                }
                false
            }
        }
    }

    /// Cell-level flood fill for modes that may destroy what blocks them.
    /// Terminates as soon as a visited cell touches the destination
    fn flood_fill<W: NavWorld + ?Sized>(
        &mut self,
        world: &W,
        from: Cell,
        dest: &Destination,
        end_mode: EndMode,
        params: &TraversalParams,
    ) -> bool {
        let dims = world.dims();
        let goal = dest.goal_area(end_mode);

        if goal.contains(from) {
            return true;
        }

        self.cell_queue.clear();
        self.cell_seen.clear();
        self.cell_queue.push_back(from);
        self.cell_seen.insert(from);

        while let Some(cell) = self.cell_queue.pop_front() {
            for (dx, dz) in NEIGHBOUR_OFFSETS {
                let next = cell.offset(dx, dz);
                if goal.contains(next) {
                    return true;
                }
                if !dims.contains(next)
                    || !world.is_walkable(next)
                    || !self.cell_seen.insert(next)
                {
                    continue;
                }

                let enterable = match world.obstacle_cost(next, params) {
                    crate::world::ObstacleCost::Impassable => world.can_destroy(next),
                    _ => true,
                };
                if enterable {
                    self.cell_queue.push_back(next);
                }
            }
        }

        false
    }
}
