//! Instrument drivers.

pub mod cg635;
pub mod differential;

pub use cg635::{Cg635, MAX_FREQUENCY_HZ};
pub use differential::DifferentialPlan;
