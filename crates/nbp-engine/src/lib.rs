//! nbp-engine
//!
//! Mission calculation and plan compounding for the Nobel trading plan.
//!
//! - `calculate_mission`: capital -> contracts, point targets, costs
//! - `generate_plan`: sequential compounding of missions over N rows
//! - `annotate`: read-path view of a stored row, recomputed from capital
//!
//! Deterministic, pure logic. No IO, no time, no database.

mod engine;
mod types;

pub use engine::{annotate, calculate_mission, generate_plan};
pub use types::*;
