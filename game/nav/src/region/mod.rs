//! Region graph: contiguous walkable zones connected by boundary link spans.
//! Built by a provider ([discovery] is the reference one), consumed read-only
//! by the searches.

mod discovery;
mod graph;

pub use discovery::{CellKind, RegionDiscovery, SurfaceSource, TILE_SIZE};
pub use graph::{LinkId, LinkSpan, Region, RegionGraph, RegionLink, SpanAxis};

use common::*;

/// Region id, unique per graph. 0 is uninitialized, starts at 1
#[derive(Default, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct RegionId(pub(crate) u32);

impl RegionId {
    pub const UNINITIALIZED: RegionId = RegionId(0);
    pub const FIRST: RegionId = RegionId(1);

    pub fn initialized(self) -> bool {
        self.0 != 0
    }

    pub fn ok(self) -> Option<Self> {
        if self.initialized() {
            Some(self)
        } else {
            None
        }
    }
}

impl Debug for RegionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "region #{}", self.0)
    }
}

slog_value_debug!(RegionId);
