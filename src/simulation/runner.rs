//! Settings-driven simulation runs

use crate::config::Settings;
use crate::triangle_life::{AnimationMatcher, Field, StepAlgorithm};
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// A field built from [`Settings`], ready to be advanced
pub struct Simulation {
    settings: Settings,
    field: Field,
    matcher: AnimationMatcher,
    pool: Option<rayon::ThreadPool>,
}

/// What happened during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub width: usize,
    pub height: usize,
    pub algorithm: StepAlgorithm,
    pub seed: Option<u64>,
    pub generations: u64,
    pub initial_population: usize,
    pub final_population: usize,
    pub min_population: usize,
    pub max_population: usize,
    pub last_transitions: TransitionCounts,
    pub elapsed_ms: u64,
}

/// Sizes of the matcher's lists for the last step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCounts {
    pub rotations: usize,
    pub fade_ins: usize,
    pub fade_outs: usize,
}

impl TransitionCounts {
    pub fn of(matcher: &AnimationMatcher) -> Self {
        Self {
            rotations: matcher.rotations().len(),
            fade_ins: matcher.fade_ins().len(),
            fade_outs: matcher.fade_outs().len(),
        }
    }
}

impl Simulation {
    /// Build the field described by the settings and seed it
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate().context("Invalid simulation settings")?;

        let sim = &settings.simulation;
        let mut rng = match sim.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut field = Field::with_rng(sim.width, sim.height, &mut rng)
            .context("Failed to create field")?;

        let seeding = &settings.seeding;
        match &seeding.region {
            Some(region) => field.set_random_region_fraction_with(
                region.x,
                region.y,
                region.width,
                region.height,
                seeding.density,
                &mut rng,
            ),
            None => field.set_random_region_with(
                0,
                0,
                sim.width as isize,
                sim.height as isize,
                seeding.density,
                &mut rng,
            ),
        }

        let pool = match sim.threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .context("Failed to build worker pool")?,
            ),
            None => None,
        };

        debug!(
            width = sim.width,
            height = sim.height,
            population = field.population(),
            "simulation ready"
        );

        Ok(Self {
            settings,
            field,
            matcher: AnimationMatcher::new(),
            pool,
        })
    }

    /// Advance the configured number of generations
    pub fn run(&mut self) -> RunSummary {
        let generations = self.settings.simulation.generations;
        let algorithm = self.settings.simulation.algorithm;
        let start_time = Instant::now();

        let initial_population = self.field.population();
        let mut min_population = initial_population;
        let mut max_population = initial_population;

        for _ in 0..generations {
            self.step(algorithm);
            let population = self.field.population();
            min_population = min_population.min(population);
            max_population = max_population.max(population);
        }

        if self.settings.output.show_transitions {
            self.matcher.prepare(&self.field);
        }

        let elapsed = start_time.elapsed();
        info!(
            generations,
            %algorithm,
            population = self.field.population(),
            elapsed_ms = elapsed.as_millis() as u64,
            "run finished"
        );

        RunSummary {
            width: self.field.width(),
            height: self.field.height(),
            algorithm,
            seed: self.settings.simulation.seed,
            generations: self.field.generation(),
            initial_population,
            final_population: self.field.population(),
            min_population,
            max_population,
            last_transitions: TransitionCounts::of(&self.matcher),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// Advance one generation, on the dedicated pool when one is configured
    pub fn step(&mut self, algorithm: StepAlgorithm) {
        match &self.pool {
            Some(pool) => {
                let field = &mut self.field;
                pool.install(|| field.advance(algorithm));
            }
            None => self.field.advance(algorithm),
        }
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn matcher(&self) -> &AnimationMatcher {
        &self.matcher
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegionConfig;

    fn small_settings() -> Settings {
        let mut settings = Settings::default();
        settings.simulation.width = 24;
        settings.simulation.height = 16;
        settings.simulation.generations = 12;
        settings.simulation.seed = Some(9);
        settings
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let first = Simulation::new(small_settings()).unwrap().run();
        let second = Simulation::new(small_settings()).unwrap().run();
        assert_eq!(first.generations, 12);
        assert_eq!(first.final_population, second.final_population);
        assert_eq!(first.initial_population, second.initial_population);
    }

    #[test]
    fn test_algorithms_give_same_run() {
        let populations: Vec<usize> = StepAlgorithm::ALL
            .iter()
            .map(|&algorithm| {
                let mut settings = small_settings();
                settings.simulation.algorithm = algorithm;
                let mut sim = Simulation::new(settings).unwrap();
                sim.run();
                sim.field().population()
            })
            .collect();
        assert!(populations.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_region_seeding() {
        let mut settings = small_settings();
        settings.seeding.density = 1.0;
        settings.seeding.region = Some(RegionConfig { x: 0.5, y: 0.5, width: 0.25, height: 0.25 });
        let sim = Simulation::new(settings).unwrap();
        // Columns 12..18, rows 8..12
        assert_eq!(sim.field().population(), 24);
        assert!(sim.field().get(12, 8));
        assert!(!sim.field().get(11, 8));
    }

    #[test]
    fn test_dedicated_pool() {
        let mut settings = small_settings();
        settings.simulation.threads = Some(2);
        let pooled = Simulation::new(settings).unwrap().run();
        let shared = Simulation::new(small_settings()).unwrap().run();
        assert_eq!(pooled.final_population, shared.final_population);
    }

    #[test]
    fn test_transition_counts() {
        let mut settings = small_settings();
        settings.output.show_transitions = true;
        let mut sim = Simulation::new(settings).unwrap();
        let summary = sim.run();
        assert_eq!(summary.last_transitions, TransitionCounts::of(sim.matcher()));

        let mut settings = small_settings();
        settings.simulation.generations = 0;
        settings.output.show_transitions = true;
        let summary = Simulation::new(settings).unwrap().run();
        assert_eq!(summary.last_transitions, TransitionCounts::default());
    }

    #[test]
    fn test_invalid_settings() {
        let mut settings = small_settings();
        settings.simulation.width = 0;
        assert!(Simulation::new(settings).is_err());
    }
}
