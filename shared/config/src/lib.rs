mod config;
mod load;

pub use crate::config::{Config, Follower, Pathfinder, RegionCosts};
pub use load::{get, init, ConfigError, ConfigType};
