//! Configuration settings for the triangular Life driver

use crate::triangle_life::StepAlgorithm;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub simulation: SimulationConfig,
    pub seeding: SeedingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub width: usize,
    pub height: usize,
    pub generations: u64,
    pub algorithm: StepAlgorithm,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedingConfig {
    pub density: f64,
    #[serde(default)]
    pub region: Option<RegionConfig>,
}

/// Rectangle to seed, as fractions of the field size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub show_grid: bool,
    pub show_transitions: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Text,
    Json,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig {
                width: 120,
                height: 60,
                generations: 100,
                algorithm: StepAlgorithm::ParallelTable,
                seed: None,
                threads: None,
            },
            seeding: SeedingConfig {
                density: 0.5,
                region: None,
            },
            output: OutputConfig {
                format: OutputFormat::Text,
                show_grid: false,
                show_transitions: false,
            },
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a YAML file
    pub fn to_file(&self, path: &PathBuf) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .context("Failed to serialize settings")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.simulation.width == 0 || self.simulation.height == 0 {
            anyhow::bail!(
                "Field dimensions must be positive, got {}x{}",
                self.simulation.width,
                self.simulation.height
            );
        }

        if self.simulation.threads == Some(0) {
            anyhow::bail!("Thread count must be positive");
        }

        if !(0.0..=1.0).contains(&self.seeding.density) {
            anyhow::bail!("Seeding density must lie in [0, 1], got {}", self.seeding.density);
        }

        if let Some(region) = &self.seeding.region {
            let parts = [region.x, region.y, region.width, region.height];
            if parts.iter().any(|v| !v.is_finite()) {
                anyhow::bail!("Seeding region must use finite fractions");
            }
            if region.width <= 0.0 || region.height <= 0.0 {
                anyhow::bail!("Seeding region must have a positive size");
            }
        }

        Ok(())
    }

    /// Merge settings with command line overrides
    pub fn merge_with_cli(&mut self, cli_overrides: &CliOverrides) {
        if let Some(width) = cli_overrides.width {
            self.simulation.width = width;
        }
        if let Some(height) = cli_overrides.height {
            self.simulation.height = height;
        }
        if let Some(generations) = cli_overrides.generations {
            self.simulation.generations = generations;
        }
        if let Some(algorithm) = cli_overrides.algorithm {
            self.simulation.algorithm = algorithm;
        }
        if let Some(seed) = cli_overrides.seed {
            self.simulation.seed = Some(seed);
        }
        if let Some(threads) = cli_overrides.threads {
            self.simulation.threads = Some(threads);
        }
        if cli_overrides.show_grid {
            self.output.show_grid = true;
        }
        if cli_overrides.show_transitions {
            self.output.show_transitions = true;
        }
        if let Some(format) = cli_overrides.format {
            self.output.format = format;
        }
    }
}

/// Command line overrides for settings
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub width: Option<usize>,
    pub height: Option<usize>,
    pub generations: Option<u64>,
    pub algorithm: Option<StepAlgorithm>,
    pub seed: Option<u64>,
    pub threads: Option<usize>,
    pub show_grid: bool,
    pub show_transitions: bool,
    pub format: Option<OutputFormat>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_file_round_trip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested/config.yaml");

        let mut settings = Settings::default();
        settings.simulation.seed = Some(17);
        settings.seeding.region = Some(RegionConfig { x: 0.25, y: 0.25, width: 0.5, height: 0.5 });
        settings.to_file(&path).unwrap();

        let loaded = Settings::from_file(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_optional_fields_default() {
        let yaml = "
simulation:
  width: 10
  height: 8
  generations: 3
  algorithm: direct
seeding:
  density: 0.3
output:
  format: json
  show_grid: true
  show_transitions: false
";
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.simulation.algorithm, StepAlgorithm::Direct);
        assert_eq!(settings.simulation.seed, None);
        assert_eq!(settings.seeding.region, None);
        assert_eq!(settings.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.simulation.height = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.seeding.density = 1.5;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.simulation.threads = Some(0);
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.seeding.region = Some(RegionConfig { x: f64::NAN, y: 0.0, width: 1.0, height: 1.0 });
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("bad.yaml");
        std::fs::write(&path, "simulation: [not, a, map]").unwrap();
        assert!(Settings::from_file(&path).is_err());
        assert!(Settings::from_file(&temp_dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut settings = Settings::default();
        settings.merge_with_cli(&CliOverrides {
            width: Some(30),
            generations: Some(7),
            algorithm: Some(StepAlgorithm::Table),
            seed: Some(3),
            show_grid: true,
            ..CliOverrides::default()
        });
        assert_eq!(settings.simulation.width, 30);
        assert_eq!(settings.simulation.height, 60);
        assert_eq!(settings.simulation.generations, 7);
        assert_eq!(settings.simulation.algorithm, StepAlgorithm::Table);
        assert_eq!(settings.simulation.seed, Some(3));
        assert!(settings.output.show_grid);
        assert!(!settings.output.show_transitions);
    }
}
