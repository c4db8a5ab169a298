// Gauntlet Schema - Shared content definitions
// This crate contains the read-only content contract consumed by the battle
// engine: unit templates, skill descriptors, status definitions, classes,
// leader skills, encounters and fight-level effects. Everything here is plain
// data, serializable with serde (RON for authoring, postcard for bundles).

pub use classes::*;
pub use encounters::*;
pub use leader::*;
pub use pack::*;
pub use skills::*;
pub use stats::*;
pub use status::*;
pub use units::*;

pub mod classes;
pub mod encounters;
pub mod leader;
pub mod pack;
pub mod skills;
pub mod stats;
pub mod status;
pub mod units;
