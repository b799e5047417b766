//! Configuration management for the triangular Life driver

pub mod settings;

pub use settings::{
    Settings, SimulationConfig, SeedingConfig, RegionConfig, OutputConfig, OutputFormat, CliOverrides
};
