//! Command line driver for the triangular Life engine

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use triangle_life::{
    config::{CliOverrides, OutputFormat, RegionConfig, Settings},
    simulation::Simulation,
    triangle_life::StepAlgorithm,
    utils::{ColorOutput, FieldFormatter},
    verify::EquivalenceChecker,
};

#[derive(Parser)]
#[command(name = "triangle_life")]
#[command(about = "Two-state cellular automaton on a triangular tessellation")]
#[command(version = "0.1.0")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed a field and advance it
    Run {
        /// Configuration file path
        #[arg(short, long, default_value = "config/default.yaml")]
        config: PathBuf,

        /// Field width in cells (overrides config)
        #[arg(long)]
        width: Option<usize>,

        /// Field height in cells (overrides config)
        #[arg(long)]
        height: Option<usize>,

        /// Number of generations (overrides config)
        #[arg(short, long)]
        generations: Option<u64>,

        /// Stepping algorithm (overrides config)
        #[arg(short, long, value_enum)]
        algorithm: Option<StepAlgorithm>,

        /// Random seed (overrides config)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Worker threads for parallel stepping (overrides config)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Print the final field
        #[arg(long)]
        show_grid: bool,

        /// Print the transitions of the last step
        #[arg(long)]
        show_transitions: bool,

        /// Output format (overrides config)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Check that every stepping algorithm computes the same generations
    Verify {
        /// Configuration file path
        #[arg(short, long, default_value = "config/default.yaml")]
        config: PathBuf,

        /// Field width in cells (overrides config)
        #[arg(long)]
        width: Option<usize>,

        /// Field height in cells (overrides config)
        #[arg(long)]
        height: Option<usize>,

        /// Number of generations to compare (overrides config)
        #[arg(short, long)]
        generations: Option<u64>,

        /// Random seed (overrides config)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Worker threads for parallel stepping (overrides config)
        #[arg(short, long)]
        threads: Option<usize>,
    },

    /// Create example configuration files
    Setup {
        /// Directory to create files in
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,

        /// Force overwrite existing files
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config, width, height, generations, algorithm, seed, threads,
            show_grid, show_transitions, format,
        } => {
            let overrides = CliOverrides {
                width,
                height,
                generations,
                algorithm,
                seed,
                threads,
                show_grid,
                show_transitions,
                format,
            };
            run_command(&config, &overrides)
        }
        Commands::Verify { config, width, height, generations, seed, threads } => {
            let overrides = CliOverrides {
                width,
                height,
                generations,
                seed,
                threads,
                ..CliOverrides::default()
            };
            verify_command(&config, &overrides)
        }
        Commands::Setup { directory, force } => setup_command(directory, force),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Config file if present, defaults otherwise, then CLI overrides
fn load_settings(config_path: &Path, overrides: &CliOverrides) -> Result<Settings> {
    let mut settings = if config_path.exists() {
        Settings::from_file(&config_path.to_path_buf())
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        warn!(path = %config_path.display(), "config file not found, using defaults");
        Settings::default()
    };

    settings.merge_with_cli(overrides);
    settings.validate().context("Configuration validation failed")?;
    Ok(settings)
}

fn run_command(config_path: &Path, overrides: &CliOverrides) -> Result<()> {
    let settings = load_settings(config_path, overrides)?;
    let output = settings.output.clone();

    info!(
        width = settings.simulation.width,
        height = settings.simulation.height,
        generations = settings.simulation.generations,
        algorithm = %settings.simulation.algorithm,
        "starting run"
    );

    let mut simulation = Simulation::new(settings).context("Failed to set up simulation")?;
    let summary = simulation.run();

    match output.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&summary)
                .context("Failed to serialize run summary")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("{}", FieldFormatter::format_summary(&summary));
            if output.show_transitions {
                println!("{}", FieldFormatter::format_transitions(simulation.matcher()));
            }
            if output.show_grid {
                println!("{}", FieldFormatter::format_field_with_coords(simulation.field()));
            }
        }
    }

    Ok(())
}

fn verify_command(config_path: &Path, overrides: &CliOverrides) -> Result<()> {
    let settings = load_settings(config_path, overrides)?;
    let sim = &settings.simulation;

    println!("{}", ColorOutput::info(&format!(
        "🔍 Comparing {} generations on a {}x{} field...",
        sim.generations, sim.width, sim.height
    )));

    let mut rng = match sim.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let checker = EquivalenceChecker::new(sim.width, sim.height);
    let report = match sim.threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .context("Failed to build worker pool")?;
            pool.install(|| checker.check(&mut rng, sim.generations))
        }
        None => checker.check(&mut rng, sim.generations),
    }
    .context("Failed to create field")?;

    println!("{}", report);

    if report.is_equivalent() {
        println!("{}", ColorOutput::success("✅ All algorithms agree"));
        Ok(())
    } else {
        println!("{}", ColorOutput::error("❌ Algorithms diverged"));
        anyhow::bail!("{} divergence(s) found", report.divergences.len())
    }
}

fn setup_command(directory: PathBuf, force: bool) -> Result<()> {
    println!("{}", ColorOutput::info("🛠️  Setting up configuration files..."));

    let config_dir = directory.join("config");
    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create directory {}", config_dir.display()))?;

    let config_path = config_dir.join("default.yaml");
    if !config_path.exists() || force {
        Settings::default()
            .to_file(&config_path)
            .context("Failed to create default configuration")?;
        println!("Created: {}", config_path.display());
    } else {
        println!("Skipped: {} (already exists)", config_path.display());
    }

    let examples_dir = config_dir.join("examples");
    std::fs::create_dir_all(&examples_dir)?;

    // Small reproducible field, printed after a few steps
    let mut small_config = Settings::default();
    small_config.simulation.width = 40;
    small_config.simulation.height = 20;
    small_config.simulation.generations = 10;
    small_config.simulation.algorithm = StepAlgorithm::Table;
    small_config.simulation.seed = Some(1);
    small_config.output.show_grid = true;
    small_config.output.show_transitions = true;
    small_config.to_file(&examples_dir.join("small.yaml"))?;

    // Dense seed in the middle of a large field
    let mut large_config = Settings::default();
    large_config.simulation.width = 1024;
    large_config.simulation.height = 512;
    large_config.simulation.generations = 500;
    large_config.seeding.density = 0.35;
    large_config.seeding.region = Some(RegionConfig { x: 0.25, y: 0.25, width: 0.5, height: 0.5 });
    large_config.output.format = OutputFormat::Json;
    large_config.to_file(&examples_dir.join("large.yaml"))?;

    println!("Created example configurations in: {}", examples_dir.display());

    println!("\n{}", ColorOutput::success("✅ Setup complete!"));
    println!("\nNext steps:");
    println!("1. Edit configuration files in {}", config_dir.display());
    println!("2. Run: cargo run -- run --config config/default.yaml");
    println!("3. Run: cargo run -- verify --generations 200");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "triangle_life",
            "run",
            "--config", "test.yaml",
            "--generations", "5",
            "--algorithm", "parallel-table",
            "--format", "json",
        ]);
        assert!(cli.is_ok());

        let cli = Cli::try_parse_from(["triangle_life", "-v", "verify", "--seed", "3"]);
        assert!(matches!(cli, Ok(Cli { verbose: true, command: Commands::Verify { seed: Some(3), .. } })));

        let cli = Cli::try_parse_from(["triangle_life", "run", "--algorithm", "sideways"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_setup_command() {
        let temp_dir = tempdir().unwrap();
        let result = setup_command(temp_dir.path().to_path_buf(), false);

        assert!(result.is_ok());
        assert!(temp_dir.path().join("config/default.yaml").exists());

        let large = Settings::from_file(&temp_dir.path().join("config/examples/large.yaml")).unwrap();
        assert_eq!(large.output.format, OutputFormat::Json);
        assert!(large.seeding.region.is_some());
    }

    #[test]
    fn test_load_settings_applies_overrides() {
        let temp_dir = tempdir().unwrap();
        let overrides = CliOverrides { width: Some(12), seed: Some(2), ..CliOverrides::default() };

        let settings = load_settings(&temp_dir.path().join("missing.yaml"), &overrides).unwrap();
        assert_eq!(settings.simulation.width, 12);
        assert_eq!(settings.simulation.seed, Some(2));

        let bad = CliOverrides { threads: Some(0), ..CliOverrides::default() };
        assert!(load_settings(&temp_dir.path().join("missing.yaml"), &bad).is_err());
    }

    #[test]
    fn test_verify_command_small_field() {
        let temp_dir = tempdir().unwrap();
        let overrides = CliOverrides {
            width: Some(17),
            height: Some(9),
            generations: Some(20),
            seed: Some(8),
            threads: Some(2),
            ..CliOverrides::default()
        };
        assert!(verify_command(&temp_dir.path().join("none.yaml"), &overrides).is_ok());
    }
}
