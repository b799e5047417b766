//! Simulation runs driven by configuration

pub mod runner;

pub use runner::{RunSummary, Simulation, TransitionCounts};
