//! The simulation field: a double-buffered grid plus its generation counter.

use super::bit_grid::{BitGrid, Buffer};
use super::rules::RuleTable;
use super::stepping::StepAlgorithm;
use super::FieldError;
use rand::Rng;
use tracing::{debug, trace};

/// A triangular Life field of fixed size.
///
/// `active` always holds the last committed generation. Stepping writes the
/// successor into the back buffer, then swaps and bumps [`Field::generation`].
#[derive(Debug, Clone)]
pub struct Field {
    grid: BitGrid,
    generation: u64,
    rules: &'static RuleTable,
}

impl Field {
    /// Create a randomly populated field using the thread-local random source
    pub fn new(width: usize, height: usize) -> Result<Self, FieldError> {
        Self::with_rng(width, height, &mut rand::thread_rng())
    }

    /// Create a randomly populated field from the given random source
    pub fn with_rng<R: Rng + ?Sized>(
        width: usize,
        height: usize,
        rng: &mut R,
    ) -> Result<Self, FieldError> {
        let mut field = Self::empty(width, height)?;
        field.grid.randomize(Buffer::Active, rng);
        field.grid.mirror_active();
        Ok(field)
    }

    /// Create a field with every cell dead
    pub fn empty(width: usize, height: usize) -> Result<Self, FieldError> {
        Ok(Self {
            grid: BitGrid::new(width, height)?,
            generation: 0,
            rules: RuleTable::global(),
        })
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn grid(&self) -> &BitGrid {
        &self.grid
    }

    /// Number of live cells in the current generation
    pub fn population(&self) -> usize {
        self.grid.population()
    }

    /// Re-randomize the current generation and restart the counter
    pub fn reset(&mut self) {
        self.reset_with(&mut rand::thread_rng());
    }

    pub fn reset_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.grid.randomize(Buffer::Active, rng);
        self.generation = 0;
    }

    /// Advance one generation, computing each cell's neighbourhood directly
    pub fn step(&mut self) {
        self.advance(StepAlgorithm::Direct);
    }

    /// Advance one generation through the transition table
    pub fn table_step(&mut self) {
        self.advance(StepAlgorithm::Table);
    }

    /// Advance one generation through the transition table, rows in parallel
    pub fn parallel_step(&mut self) {
        self.advance(StepAlgorithm::ParallelTable);
    }

    pub fn advance(&mut self, algorithm: StepAlgorithm) {
        self.compute_next(algorithm);
        self.commit();
        trace!(generation = self.generation, %algorithm, "advanced field");
    }

    /// Promote the back buffer to the current generation
    pub fn commit(&mut self) {
        self.grid.swap();
        self.generation += 1;
    }

    /// Fill the back buffer with the next generation without committing it
    pub fn compute_next(&mut self, algorithm: StepAlgorithm) {
        algorithm.compute_next(&mut self.grid, self.rules);
    }

    /// Read a cell of the current generation; outside the field is dead
    pub fn get(&self, i: isize, j: isize) -> bool {
        self.grid.get(i, j)
    }

    /// Bring a cell to life. Returns `false` if it lies outside the field.
    pub fn set_checked(&mut self, i: isize, j: isize) -> bool {
        self.grid.set_checked(i, j)
    }

    /// Kill a cell. Returns `false` if it lies outside the field.
    pub fn reset_checked(&mut self, i: isize, j: isize) -> bool {
        self.grid.reset_checked(i, j)
    }

    /// Toggle a cell. Returns `false` if it lies outside the field.
    pub fn flip(&mut self, i: isize, j: isize) -> bool {
        self.grid.flip(i, j)
    }

    /// Replace the current generation with random cells inside a rectangle
    pub fn set_random_region(&mut self, x: isize, y: isize, width: isize, height: isize, density: f64) {
        self.set_random_region_with(x, y, width, height, density, &mut rand::thread_rng());
    }

    /// Replace the current generation with random cells inside
    /// `[x, x + width) x [y, y + height)`, clipped to the field.
    ///
    /// NOTE: the whole field is cleared first, so everything outside the
    /// rectangle ends up dead. This acts as "load a new scene"; callers that
    /// want to keep the surroundings have to re-apply them.
    pub fn set_random_region_with<R: Rng + ?Sized>(
        &mut self,
        x: isize,
        y: isize,
        width: isize,
        height: isize,
        density: f64,
        rng: &mut R,
    ) {
        let density = if density.is_nan() { 0.0 } else { density.clamp(0.0, 1.0) };
        let columns = x.max(0)..x.saturating_add(width).min(self.width() as isize);
        let rows = y.max(0)..y.saturating_add(height).min(self.height() as isize);
        debug!(?columns, ?rows, density, "seeding random region");

        self.grid.fill(Buffer::Active, 0);
        for i in columns {
            for j in rows.clone() {
                if rng.gen::<f64>() < density {
                    self.grid.set_unchecked(Buffer::Active, i as usize, j as usize);
                }
            }
        }
    }

    /// [`Field::set_random_region`] with the rectangle given as fractions of
    /// the field size
    pub fn set_random_region_fraction(&mut self, x: f64, y: f64, width: f64, height: f64, density: f64) {
        self.set_random_region_fraction_with(x, y, width, height, density, &mut rand::thread_rng());
    }

    pub fn set_random_region_fraction_with<R: Rng + ?Sized>(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        density: f64,
        rng: &mut R,
    ) {
        let (w, h) = (self.width() as f64, self.height() as f64);
        self.set_random_region_with(
            (w * x) as isize,
            (h * y) as isize,
            (w * width) as isize,
            (h * height) as isize,
            density,
            rng,
        );
    }
}
