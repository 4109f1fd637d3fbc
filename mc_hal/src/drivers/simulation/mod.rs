//! Software simulation driver backend — no physical hardware required.

mod driver;
mod motor;

pub use driver::SimulatedDriver;

use crate::driver::StepperDriver;

/// Factory: six motors, the spec's max axis count (§3).
pub fn create_driver() -> Box<dyn StepperDriver> {
    Box::new(SimulatedDriver::new(6))
}
