//! HAL driver backends.
//!
//! - [`simulation`] - software simulation backend for development and testing.
//!
//! To add a real backend: implement [`crate::driver::StepperDriver`] in a
//! new submodule and register its factory in [`register_all_drivers`].

pub mod simulation;

use crate::driver::DriverRegistry;

/// Register all built-in driver backends.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    registry.register("simulation", simulation::create_driver);
}
