use serde::Deserialize;

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub pathfinder: Pathfinder,
    pub region_costs: RegionCosts,
    pub follower: Follower,
}

#[derive(Deserialize)]
#[serde(default)]
pub struct Pathfinder {
    /// Hard cap on node expansions per search
    pub search_limit: usize,

    /// Opened nodes before switching to the region heuristic
    pub region_heuristic_threshold: usize,

    /// (straight line distance, octile multiplier), ascending by distance
    pub heuristic_strength: Vec<(u32, f32)>,

    /// Added to entry cost when another agent occupies the cell
    pub agent_block_penalty: u32,

    /// Added to entry cost outside the agent's allowed area
    pub out_of_area_penalty: u32,

    /// Multiplier on per-cell avoidance weights
    pub avoidance_weight: u32,
}

#[derive(Deserialize)]
#[serde(default)]
pub struct RegionCosts {
    /// Cells sampled per region for the median cost density. Tuned, not derived
    pub sample_count: usize,
}

#[derive(Deserialize)]
#[serde(default)]
pub struct Follower {
    /// Cells ahead of the agent revalidated each tick
    pub lookahead_cells: usize,

    /// (distance to destination, tolerated drift in cells), ascending
    pub drift_tolerance: Vec<(u32, f32)>,

    /// Remaining-path length under which a heuristic-assisted path is
    /// treated as potentially stale
    pub stale_tail_window: usize,
}

impl Default for Pathfinder {
    fn default() -> Self {
        Self {
            search_limit: 160_000,
            region_heuristic_threshold: 2_500,
            heuristic_strength: vec![(5, 1.02), (20, 1.2), (100, 1.8), (300, 3.5)],
            agent_block_penalty: 175,
            out_of_area_penalty: 600,
            avoidance_weight: 8,
        }
    }
}

impl Default for RegionCosts {
    fn default() -> Self {
        Self { sample_count: 11 }
    }
}

impl Default for Follower {
    fn default() -> Self {
        Self {
            lookahead_cells: 5,
            drift_tolerance: vec![(30, 0.5), (120, 2.0), (600, 6.0)],
            stale_tail_window: 8,
        }
    }
}
