//! Motion state machine driving an agent along paths.
//!
//! `Idle -> Moving -> {Arrived, Failed} -> Idle`. Path planning races a
//! forward search against a reverse feasibility probe on the worker pool:
//! the probe's path is never used, but a probe that proves "unreachable"
//! first fails the whole request without waiting for the forward search.
//! Each tick accrues movement points against the next cell's entry cost and
//! watches for reasons to replan.

use std::sync::Arc;

use common::parking_lot::Mutex;
use common::*;

use crate::cell::{Cell, GridDims};
use crate::curve;
use crate::pathfind::{cuts_corner, entry_cost, Path, PathError, Pathfinder};
use crate::pool::{AsyncWorkerPool, CancelToken};
use crate::reach::Reachability;
use crate::traversal::{AgentId, Destination, EndMode, TraversalParams};
use crate::world::NavWorld;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum FollowState {
    Idle,
    Moving,
    /// Terminal until the next `start_path` or `stop`
    Arrived,
    Failed,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PatherEventPayload {
    Arrived { cell: Cell },
    Failed { error: PathError },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PatherEvent {
    pub agent: AgentId,
    pub payload: PatherEventPayload,
}

/// Terminal path events for the host to consume each tick
#[derive(Default)]
pub struct PatherEventQueue(Vec<PatherEvent>);

impl PatherEventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: PatherEvent) {
        self.0.push(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = PatherEvent> + '_ {
        self.0.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

struct ActivePath {
    path: Path,
    /// Index of the next node to pay for and enter
    next: usize,
    dest: Destination,
    end_mode: EndMode,
    params: TraversalParams,
}

/// Per-agent follower. Owns two pathfinders so the forward search and the
/// reverse probe never share scratch state
pub struct PathFollower {
    agent: AgentId,
    state: FollowState,
    active: Option<ActivePath>,
    forward: Arc<Mutex<Pathfinder>>,
    reverse: Arc<Mutex<Pathfinder>>,
    /// Movement points paid so far toward the next cell
    progress: u32,
    /// Consecutive ticks spent waiting on an occupied cell
    blocked_ticks: u32,
}

impl PathFollower {
    pub fn new(agent: AgentId, dims: GridDims) -> Self {
        Self {
            agent,
            state: FollowState::Idle,
            active: None,
            forward: Arc::new(Mutex::new(Pathfinder::new(dims))),
            reverse: Arc::new(Mutex::new(Pathfinder::new(dims))),
            progress: 0,
            blocked_ticks: 0,
        }
    }

    pub fn state(&self) -> FollowState {
        self.state
    }

    /// Current cell while a path is active
    pub fn position(&self) -> Option<Cell> {
        let active = self.active.as_ref()?;
        Some(active.path.nodes()[active.next - 1].cell)
    }

    pub fn path(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| &a.path)
    }

    /// Exposed for hosts that want to shove or reroute stuck agents; no
    /// policy is applied here
    pub fn blocked_ticks(&self) -> u32 {
        self.blocked_ticks
    }

    pub fn stop(&mut self) {
        self.finish(FollowState::Idle);
    }

    /// Plans a path and starts following it. Idempotent: asking for the
    /// journey already underway is a cheap no-op. Failures surface as
    /// `Failed` events; the return value says whether the follower is now
    /// moving (or already arrived)
    #[allow(clippy::too_many_arguments)]
    pub fn start_path<W>(
        &mut self,
        world: &Arc<W>,
        pool: &AsyncWorkerPool,
        reach: &Reachability,
        from: Cell,
        dest: Destination,
        end_mode: EndMode,
        params: TraversalParams,
        events: &mut PatherEventQueue,
    ) -> bool
    where
        W: NavWorld + Send + Sync + 'static,
    {
        if self.state == FollowState::Moving {
            if let Some(active) = &self.active {
                if active.dest == dest
                    && active.end_mode == end_mode
                    && active.params.signature() == params.signature()
                {
                    trace!("start_path for journey already underway"; "agent" => self.agent);
                    return true;
                }
            }
        }

        // cheap connectivity probe before paying for a real search
        if !reach.can_reach(&**world, from, &dest, end_mode, &params) {
            debug!("destination unreachable, not searching"; "agent" => self.agent, "dest" => dest);
            self.fail(PathError::NoRoute, events);
            return false;
        }

        match self.search_race(world, pool, from, &dest, end_mode, &params) {
            Ok(path) => {
                debug!("path started"; "agent" => self.agent, "len" => path.len());
                world.draw_path(&path.cells().collect::<Vec<_>>());
                let arrived = path.len() == 1;
                let cell = path.end();
                self.active = Some(ActivePath {
                    path,
                    next: 1,
                    dest,
                    end_mode,
                    params,
                });
                self.state = FollowState::Moving;
                self.progress = 0;
                self.blocked_ticks = 0;

                if arrived {
                    self.arrive(cell, events);
                }
                true
            }
            Err(error) => {
                self.fail(error, events);
                false
            }
        }
    }

    /// Advances the follower by one tick of `speed` movement points.
    /// `current_dest` is where the host wants the agent now; drifting too
    /// far from the planned destination forces a replan
    pub fn tick<W>(
        &mut self,
        world: &Arc<W>,
        pool: &AsyncWorkerPool,
        reach: &Reachability,
        current_dest: &Destination,
        speed: u32,
        events: &mut PatherEventQueue,
    ) where
        W: NavWorld + Send + Sync + 'static,
    {
        if self.state != FollowState::Moving {
            return;
        }
        let position = match self.position() {
            Some(p) => p,
            None => return,
        };

        if let Some(reason) = self.replan_reason(&**world, current_dest, position) {
            debug!("replanning"; "agent" => self.agent, "reason" => reason);
            world.flash_cell(position, reason);
            let (end_mode, params) = match &self.active {
                Some(active) => (active.end_mode, active.params),
                None => return,
            };
            self.stop();
            self.start_path(
                world,
                pool,
                reach,
                position,
                *current_dest,
                end_mode,
                params,
                events,
            );
            return;
        }

        let active = match self.active.as_mut() {
            Some(a) => a,
            None => return,
        };

        let next_cell = active.path.nodes()[active.next].cell;
        if world.is_blocked_by_agent(next_cell, Some(self.agent)) {
            self.blocked_ticks += 1;
            return;
        }
        self.blocked_ticks = 0;
        self.progress = self.progress.saturating_add(speed);

        let mut arrived_at = None;
        while active.next < active.path.len() {
            let node = active.path.nodes()[active.next];
            if self.progress < node.entry_cost {
                break;
            }
            self.progress -= node.entry_cost;
            active.next += 1;

            if active.next >= active.path.len() {
                arrived_at = Some(node.cell);
                break;
            }
        }

        if let Some(cell) = arrived_at {
            self.arrive(cell, events);
        }
    }

    /// Why the current path can no longer be trusted, if anything
    fn replan_reason<W: NavWorld + ?Sized>(
        &self,
        world: &W,
        current_dest: &Destination,
        position: Cell,
    ) -> Option<&'static str> {
        let active = self.active.as_ref()?;
        let cfg = config::get();
        let tuning = &cfg.follower;

        // destination drift, tolerated more generously far from the goal
        let drift = active
            .dest
            .center()
            .manhattan_distance(current_dest.center());
        if drift > 0 {
            let remaining = position.manhattan_distance(active.dest.center());
            let tolerance = curve::eval(&tuning.drift_tolerance, remaining);
            if drift as f32 > tolerance {
                return Some("destination drift");
            }
        }

        // the next few cells must still be walkable and enterable, by the
        // same rules the search applied when it picked them
        let mut prev = position;
        for node in active
            .path
            .nodes()
            .iter()
            .skip(active.next)
            .take(tuning.lookahead_cells)
        {
            if !world.is_walkable(node.cell) {
                return Some("lookahead unwalkable");
            }
            let (dx, dz) = (node.cell.x() - prev.x(), node.cell.z() - prev.z());
            let diagonal = dx != 0 && dz != 0;
            if diagonal && cuts_corner(world, prev, dx, dz) {
                return Some("lookahead cuts corner");
            }
            if entry_cost(world, node.cell, &active.params, diagonal).is_none() {
                return Some("lookahead blocked");
            }
            prev = node.cell;
        }

        // heuristic-assisted paths get less accurate near their tail
        let remaining_nodes = active.path.len() - active.next;
        if active.path.used_region_heuristic() && remaining_nodes <= tuning.stale_tail_window {
            return Some("stale heuristic tail");
        }

        None
    }

    /// Races the forward search against a reverse feasibility probe:
    /// - a decisive "not found" from either side cancels the other and
    ///   fails immediately
    /// - a found forward path is adopted regardless of the probe
    /// - a positive probe just means the forward result is worth waiting for
    ///
    /// Both tasks are joined before returning, so no search outlives the
    /// call. A panicked task is logged and treated as not found
    fn search_race<W>(
        &mut self,
        world: &Arc<W>,
        pool: &AsyncWorkerPool,
        from: Cell,
        dest: &Destination,
        end_mode: EndMode,
        params: &TraversalParams,
    ) -> Result<Path, PathError>
    where
        W: NavWorld + Send + Sync + 'static,
    {
        // the probe starts from any enterable goal cell
        let rev_from = dest
            .goal_area(end_mode)
            .iter_cells()
            .find(|&c| world.dims().contains(c) && world.is_walkable(c))
            .ok_or(PathError::GoalBlocked)?;

        let fwd_cancel = CancelToken::new();
        let rev_cancel = CancelToken::new();

        let mut fwd = {
            let world = Arc::clone(world);
            let finder = Arc::clone(&self.forward);
            let cancel = fwd_cancel.clone();
            let (dest, params) = (*dest, *params);
            pool.spawn(async move {
                finder
                    .lock()
                    .find_path(&*world, from, &dest, end_mode, &params, &cancel)
            })
        };

        let mut rev = {
            let world = Arc::clone(world);
            let finder = Arc::clone(&self.reverse);
            let cancel = rev_cancel.clone();
            let rev_dest = Destination::single(from);
            let params = *params;
            pool.spawn(async move {
                finder
                    .lock()
                    .find_path(&*world, rev_from, &rev_dest, EndMode::Touch, &params, &cancel)
            })
        };

        let agent = self.agent;
        pool.block_on(async move {
            tokio::select! {
                f = &mut fwd => {
                    rev_cancel.cancel();
                    let _ = (&mut rev).await;
                    join_result(agent, f)
                }
                r = &mut rev => {
                    match join_result(agent, r) {
                        Err(error) => {
                            // decisive negative answer, don't wait for forward
                            fwd_cancel.cancel();
                            let _ = (&mut fwd).await;
                            Err(error)
                        }
                        Ok(_probe_path) => {
                            // route exists; only the forward path is usable
                            join_result(agent, (&mut fwd).await)
                        }
                    }
                }
            }
        })
    }

    fn arrive(&mut self, cell: Cell, events: &mut PatherEventQueue) {
        debug!("arrived"; "agent" => self.agent, "cell" => cell);
        events.push(PatherEvent {
            agent: self.agent,
            payload: PatherEventPayload::Arrived { cell },
        });
        self.finish(FollowState::Arrived);
    }

    fn fail(&mut self, error: PathError, events: &mut PatherEventQueue) {
        debug!("path failed"; "agent" => self.agent, "error" => error.clone());
        events.push(PatherEvent {
            agent: self.agent,
            payload: PatherEventPayload::Failed { error },
        });
        self.finish(FollowState::Failed);
    }

    fn finish(&mut self, state: FollowState) {
        self.state = state;
        self.active = None;
        self.progress = 0;
        self.blocked_ticks = 0;
    }
}

fn join_result(
    agent: AgentId,
    joined: Result<Result<Path, PathError>, tokio::task::JoinError>,
) -> Result<Path, PathError> {
    match joined {
        Ok(result) => result,
        Err(error) => {
            // a panicked search never takes the agent down with it
            error!("search task failed"; "agent" => agent, "error" => %error);
            Err(PathError::NoRoute)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::{SurfaceBuilder, TestWorld};

    struct Rig {
        world: Arc<TestWorld>,
        pool: AsyncWorkerPool,
        reach: Reachability,
        events: PatherEventQueue,
        follower: PathFollower,
    }

    impl Rig {
        fn new(world: TestWorld) -> Self {
            common::logging::for_tests();
            let dims = world.dims();
            Self {
                world: Arc::new(world),
                pool: AsyncWorkerPool::new(2).unwrap(),
                reach: Reachability::new(),
                events: PatherEventQueue::new(),
                follower: PathFollower::new(AgentId(1), dims),
            }
        }

        fn start(&mut self, from: (i32, i32), to: (i32, i32)) -> bool {
            self.follower.start_path(
                &self.world,
                &self.pool,
                &self.reach,
                from.into(),
                Destination::single(to.into()),
                EndMode::OnCell,
                TraversalParams::for_agent(AgentId(1)),
                &mut self.events,
            )
        }

        fn tick(&mut self, to: (i32, i32), speed: u32) {
            self.follower.tick(
                &self.world,
                &self.pool,
                &self.reach,
                &Destination::single(to.into()),
                speed,
                &mut self.events,
            );
        }
    }

    #[test]
    fn walks_the_path_and_arrives() {
        let mut rig = Rig::new(SurfaceBuilder::new(10, 3).build());
        let params = TraversalParams::for_agent(AgentId(1));

        assert!(rig.start((0, 1), (4, 1)));
        assert_eq!(rig.follower.state(), FollowState::Moving);
        assert!(rig.events.is_empty());

        // one cardinal step per tick at exactly the entry cost
        for expected in 1..4 {
            rig.tick((4, 1), params.cost_cardinal);
            assert_eq!(rig.follower.position(), Some(Cell(expected, 1)));
            assert_eq!(rig.follower.state(), FollowState::Moving);
        }

        rig.tick((4, 1), params.cost_cardinal);
        assert_eq!(rig.follower.state(), FollowState::Arrived);
        let events = rig.events.drain().collect::<Vec<_>>();
        assert_eq!(
            events,
            vec![PatherEvent {
                agent: AgentId(1),
                payload: PatherEventPayload::Arrived { cell: Cell(4, 1) },
            }]
        );
    }

    #[test]
    fn repeated_start_is_a_noop() {
        let mut rig = Rig::new(SurfaceBuilder::new(10, 3).build());

        assert!(rig.start((0, 1), (6, 1)));
        let before = rig.follower.path().map(|p| p.len());

        assert!(rig.start((0, 1), (6, 1)));
        assert_eq!(rig.follower.path().map(|p| p.len()), before);
        assert!(rig.events.is_empty());
    }

    #[test]
    fn unreachable_destination_fails_up_front() {
        let mut rig = Rig::new(
            SurfaceBuilder::new(10, 10)
                .wall((0..10).map(|z| (5, z)))
                .build(),
        );

        assert!(!rig.start((0, 0), (9, 9)));
        assert_eq!(rig.follower.state(), FollowState::Failed);
        let events = rig.events.drain().collect::<Vec<_>>();
        assert_eq!(
            events,
            vec![PatherEvent {
                agent: AgentId(1),
                payload: PatherEventPayload::Failed {
                    error: PathError::NoRoute,
                },
            }]
        );
    }

    #[test]
    fn occupied_cell_stalls_without_failing() {
        // single-file corridor, no way around the squatter at (2, 0)
        let mut rig = Rig::new(SurfaceBuilder::new(5, 1).occupied((2, 0)).build());
        let params = TraversalParams::for_agent(AgentId(1));

        assert!(rig.start((0, 0), (4, 0)));
        rig.tick((4, 0), params.cost_cardinal);
        assert_eq!(rig.follower.position(), Some(Cell(1, 0)));

        for stalled in 1..=3 {
            rig.tick((4, 0), params.cost_cardinal);
            assert_eq!(rig.follower.position(), Some(Cell(1, 0)));
            assert_eq!(rig.follower.blocked_ticks(), stalled);
            assert_eq!(rig.follower.state(), FollowState::Moving);
        }
    }

    #[test]
    fn destination_drift_forces_replan() {
        let mut rig = Rig::new(SurfaceBuilder::new(10, 3).build());
        let params = TraversalParams::for_agent(AgentId(1));

        assert!(rig.start((0, 1), (4, 1)));
        assert_eq!(rig.follower.path().map(|p| p.target()), Some(Cell(4, 1)));

        // the host now wants (7, 1), well past the drift tolerance this
        // close to the goal
        rig.tick((7, 1), params.cost_cardinal);
        assert_eq!(rig.follower.state(), FollowState::Moving);
        assert_eq!(rig.follower.path().map(|p| p.target()), Some(Cell(7, 1)));
    }

    #[test]
    fn lookahead_catches_cells_turning_unwalkable() {
        // single-file corridor; no obstacle appears on (3, 0), the surface
        // itself stops being walkable there after the path was planned
        let mut rig = Rig::new(SurfaceBuilder::new(5, 1).build());
        let params = TraversalParams::for_agent(AgentId(1));

        assert!(rig.start((0, 0), (4, 0)));
        rig.world.block((3, 0));

        rig.tick((4, 0), params.cost_cardinal);
        assert_eq!(rig.follower.state(), FollowState::Failed);
        assert!(rig.follower.position().is_none());
        let events = rig.events.drain().collect::<Vec<_>>();
        assert_eq!(
            events,
            vec![PatherEvent {
                agent: AgentId(1),
                payload: PatherEventPayload::Failed {
                    error: PathError::NoRoute,
                },
            }]
        );
    }

    #[test]
    fn lookahead_catches_new_corner_cuts() {
        let mut rig = Rig::new(SurfaceBuilder::new(3, 3).build());
        let params = TraversalParams::for_agent(AgentId(1));

        assert!(rig.start((0, 0), (2, 2)));
        assert_eq!(rig.follower.path().map(|p| p.len()), Some(3));

        // (1, 1) is still enterable on its own, but the planned diagonal
        // into it now squeezes past a blocked corner
        rig.world.block((1, 0));

        rig.tick((2, 2), params.cost_diagonal);
        assert_eq!(rig.follower.state(), FollowState::Moving);
        assert_eq!(rig.follower.path().map(|p| p.len()), Some(4));
        assert!(rig.events.is_empty());
    }

    #[test]
    fn negative_reverse_search_settles_the_race() {
        // a tiny pocket appears behind a fresh wall. the reverse search
        // exhausts the pocket in a few dozen expansions while the forward
        // search is still flooding its far larger side, so its negative
        // answer fails the request and cancels the forward search
        let mut rig = Rig::new(SurfaceBuilder::new(200, 40).build());
        for z in 0..40 {
            rig.world.block((198, z));
        }

        assert!(!rig.start((0, 20), (199, 20)));
        assert_eq!(rig.follower.state(), FollowState::Failed);
        let events = rig.events.drain().collect::<Vec<_>>();
        assert_eq!(
            events,
            vec![PatherEvent {
                agent: AgentId(1),
                payload: PatherEventPayload::Failed {
                    error: PathError::NoRoute,
                },
            }]
        );

        // cancelled mid-search rather than run to exhaustion
        assert!(rig.follower.forward.lock().last_stats().aborted);
    }

    #[test]
    fn stop_resets_to_idle() {
        let mut rig = Rig::new(SurfaceBuilder::new(10, 3).build());

        assert!(rig.start((0, 1), (6, 1)));
        rig.follower.stop();
        assert_eq!(rig.follower.state(), FollowState::Idle);
        assert!(rig.follower.path().is_none());
        assert!(rig.follower.position().is_none());
    }
}
