pub mod ai;
pub mod calculators;
pub mod death;
pub mod effects;
pub mod engine;
pub mod fight_effects;
pub mod leader;
pub mod pipeline;
pub mod resources;
pub mod roster;
pub mod runner;
pub mod state;
pub mod stats;
pub mod targeting;
pub mod turn_order;

#[cfg(test)]
pub(crate) mod tests;
