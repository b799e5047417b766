//! Cross-checking of the stepping algorithms

use crate::triangle_life::stepping::weighted_sum;
use crate::triangle_life::{BitBuffer, Field, FieldError, StepAlgorithm, WORD_BITS};
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Runs every [`StepAlgorithm`] from the same state and compares the results
pub struct EquivalenceChecker {
    width: usize,
    height: usize,
}

/// Outcome of an equivalence run
#[derive(Debug, Clone)]
pub struct EquivalenceReport {
    pub width: usize,
    pub height: usize,
    pub generations_checked: u64,
    pub divergences: Vec<Divergence>,
    pub initial_population: usize,
    pub final_population: usize,
    pub elapsed: Duration,
}

/// One generation where an algorithm disagreed with the direct computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    pub generation: u64,
    pub algorithm: StepAlgorithm,
    pub first_cell: (usize, usize),
    pub expected: bool,
    pub weighted_sum: u32,
    pub mismatched_cells: usize,
}

impl EquivalenceChecker {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Start from a random field and step it `generations` times, comparing
    /// every algorithm against [`StepAlgorithm::Direct`] each generation.
    ///
    /// The direct result is committed after each comparison, so a divergence
    /// in one generation does not cascade into the following ones.
    pub fn check<R: Rng + ?Sized>(&self, rng: &mut R, generations: u64) -> Result<EquivalenceReport, FieldError> {
        let field = Field::with_rng(self.width, self.height, rng)?;
        Ok(self.check_field(field, generations))
    }

    pub fn check_field(&self, mut reference: Field, generations: u64) -> EquivalenceReport {
        let start_time = Instant::now();
        let initial_population = reference.population();
        let mut divergences = Vec::new();

        for _ in 0..generations {
            let generation = reference.generation() + 1;
            reference.compute_next(StepAlgorithm::Direct);

            for algorithm in [StepAlgorithm::Table, StepAlgorithm::ParallelTable] {
                let mut candidate = reference.clone();
                candidate.compute_next(algorithm);
                if let Some(divergence) =
                    Self::compare(&reference, candidate.grid().back(), algorithm, generation)
                {
                    warn!(generation, %algorithm, cell = ?divergence.first_cell, "algorithm diverged");
                    divergences.push(divergence);
                }
            }

            reference.commit();
        }

        debug!(generations, divergences = divergences.len(), "equivalence check finished");
        EquivalenceReport {
            width: reference.width(),
            height: reference.height(),
            generations_checked: generations,
            divergences,
            initial_population,
            final_population: reference.population(),
            elapsed: start_time.elapsed(),
        }
    }

    /// Compare a candidate next generation against the reference's back buffer
    fn compare(
        reference: &Field,
        candidate: &BitBuffer,
        algorithm: StepAlgorithm,
        generation: u64,
    ) -> Option<Divergence> {
        let expected = reference.grid().back();
        let mut first = None;
        let mut mismatched_cells = 0;

        for w in 0..expected.word_count() {
            let diff = expected.word(w) ^ candidate.word(w);
            if diff == 0 {
                continue;
            }
            mismatched_cells += diff.count_ones() as usize;
            if first.is_none() {
                first = Some(w * WORD_BITS + diff.trailing_zeros() as usize);
            }
        }

        let index = first?;
        let grid = reference.grid();
        let (i, j) = grid.coords_of(index);
        Some(Divergence {
            generation,
            algorithm,
            first_cell: (i, j),
            expected: expected.test(index),
            weighted_sum: weighted_sum(grid, i, j),
            mismatched_cells,
        })
    }
}

impl EquivalenceReport {
    pub fn is_equivalent(&self) -> bool {
        self.divergences.is_empty()
    }
}

impl std::fmt::Display for Divergence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "generation {}: {} differs in {} cell(s), first at ({}, {}) which should be {} (weighted sum {})",
            self.generation,
            self.algorithm,
            self.mismatched_cells,
            self.first_cell.0,
            self.first_cell.1,
            if self.expected { "alive" } else { "dead" },
            self.weighted_sum
        )
    }
}

impl std::fmt::Display for EquivalenceReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Equivalence Result: {}",
            if self.is_equivalent() { "EQUIVALENT" } else { "DIVERGENT" }
        )?;
        writeln!(f, "Field: {}x{}", self.width, self.height)?;
        writeln!(f, "Generations checked: {}", self.generations_checked)?;
        writeln!(f, "Population: {} → {}", self.initial_population, self.final_population)?;
        writeln!(f, "Divergences: {}", self.divergences.len())?;
        for divergence in self.divergences.iter().take(5) {
            writeln!(f, "  {}", divergence)?;
        }
        if self.divergences.len() > 5 {
            writeln!(f, "  ... and {} more", self.divergences.len() - 5)?;
        }
        write!(f, "Check time: {:.3}s", self.elapsed.as_secs_f64())
    }
}
