mod path;
mod pathfinder;
mod scratch;

pub use path::{Path, PathError, PathNode};
pub use pathfinder::{entry_cost, Pathfinder, SearchStats};
pub(crate) use pathfinder::cuts_corner;
pub(crate) use scratch::MinScored;
