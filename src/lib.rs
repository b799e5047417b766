//! Triangular Life
//!
//! A two-state cellular automaton on a triangular tessellation, stepped with
//! a direct neighbour count, a precomputed rule table, or the rule table in
//! parallel over rows. All three produce the same generations.

pub mod config;
pub mod simulation;
pub mod triangle_life;
pub mod utils;
pub mod verify;

pub use config::Settings;
pub use simulation::{RunSummary, Simulation};
pub use triangle_life::{AnimationMatcher, Field, FieldError, StepAlgorithm};

use anyhow::Result;

/// Build the field the settings describe and run it to completion
pub fn run_simulation(settings: Settings) -> Result<RunSummary> {
    let mut simulation = Simulation::new(settings)?;
    Ok(simulation.run())
}
