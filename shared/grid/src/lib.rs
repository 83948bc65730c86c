mod dynamic;

pub use dynamic::{DynamicGrid, GridCoord};
