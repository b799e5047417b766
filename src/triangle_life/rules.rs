//! Weighted neighbourhood rule and its precomputed transition table.
//!
//! Each triangle has twelve weighted neighbours. Column offsets `di` run over
//! `-2..=2` and row offsets `dj` over `-1..=1`; which neighbours count and how
//! much depends on whether the triangle points up or down.
//!
//! The [`RuleTable`] packs the centre cell, its neighbourhood and the
//! orientation into a 16-bit context and stores one output bit per context:
//!
//! ```text
//! bit 15      orientation (0 = up, 1 = down)
//! bits 12..15 column i-2   (rows j-1, j, j+1 from low to high)
//! bits  9..12 column i-1
//! bits  6..9  column i
//! bits  3..6  column i+1
//! bits  0..3  column i+2
//! ```

use std::sync::OnceLock;
use tracing::debug;

/// Number of distinct contexts.
pub const CONTEXT_COUNT: usize = 1 << 16;

/// Mask of the neighbourhood part of a context.
pub const NEIGHBORHOOD_MASK: u32 = 0x7FFF;

/// Context bit carrying the orientation.
pub const ORIENTATION_BIT: u32 = 1 << 15;

/// A weighted neighbour at a column/row offset from the centre cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    pub di: isize,
    pub dj: isize,
    pub weight: u32,
}

const fn neighbor(di: isize, dj: isize, weight: u32) -> Neighbor {
    Neighbor { di, dj, weight }
}

/// Neighbours weighted the same for both orientations.
pub const SHARED_NEIGHBORS: [Neighbor; 8] = [
    neighbor(-1, 0, 12),
    neighbor(1, 0, 12),
    neighbor(-1, -1, 4),
    neighbor(1, -1, 4),
    neighbor(-2, 0, 4),
    neighbor(2, 0, 4),
    neighbor(-1, 1, 4),
    neighbor(1, 1, 4),
];

/// Base and wing neighbours of an up-pointing triangle.
pub const UP_NEIGHBORS: [Neighbor; 4] = [
    neighbor(0, 1, 12),
    neighbor(0, -1, 3),
    neighbor(-2, 1, 3),
    neighbor(2, 1, 3),
];

/// Base and wing neighbours of a down-pointing triangle.
pub const DOWN_NEIGHBORS: [Neighbor; 4] = [
    neighbor(0, -1, 12),
    neighbor(0, 1, 3),
    neighbor(-2, -1, 3),
    neighbor(2, -1, 3),
];

/// Which way a triangular cell points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Up,
    Down,
}

impl Orientation {
    /// Orientation of the cell at column `i`, row `j`
    #[inline]
    pub fn of(i: usize, j: usize) -> Self {
        if (i + j) & 1 == 0 {
            Orientation::Up
        } else {
            Orientation::Down
        }
    }

    /// Orientation encoded in bit 15 of a context
    #[inline]
    pub fn from_context(context: u32) -> Self {
        if context & ORIENTATION_BIT == 0 {
            Orientation::Up
        } else {
            Orientation::Down
        }
    }

    /// The orientation-specific base and wing neighbours
    pub fn neighbors(self) -> &'static [Neighbor; 4] {
        match self {
            Orientation::Up => &UP_NEIGHBORS,
            Orientation::Down => &DOWN_NEIGHBORS,
        }
    }

    /// All twelve weighted neighbours of a cell with this orientation
    pub fn all_neighbors(self) -> impl Iterator<Item = &'static Neighbor> {
        SHARED_NEIGHBORS.iter().chain(self.neighbors().iter())
    }
}

/// Survival and birth thresholds of the weighted sum rule.
///
/// A live cell survives with `13 < sum < 32`; a dead cell is born with
/// `21 < sum < 32`.
#[inline]
pub fn next_alive(alive: bool, sum: u32) -> bool {
    if alive {
        sum > 13 && sum < 32
    } else {
        sum > 21 && sum < 32
    }
}

/// Bit position of the neighbour at `(di, dj)` inside a context
#[inline]
pub const fn context_shift(di: isize, dj: isize) -> u32 {
    (14 + (dj - 1) - (di + 2) * 3) as u32
}

/// Immutable lookup from a 16-bit context to the centre cell's next state.
#[derive(Clone, PartialEq, Eq)]
pub struct RuleTable {
    bits: Box<[u8]>,
}

static GLOBAL: OnceLock<RuleTable> = OnceLock::new();

impl RuleTable {
    /// Enumerate every context and evaluate the rule for it
    pub fn build() -> Self {
        let mut bits = vec![0u8; CONTEXT_COUNT / 8].into_boxed_slice();
        for context in 0..CONTEXT_COUNT as u32 {
            if Self::evaluate(context) {
                bits[(context >> 3) as usize] |= 1 << (context & 7);
            }
        }
        let table = Self { bits };
        debug!(live_contexts = table.live_contexts(), "built transition table");
        table
    }

    /// Process-wide table, built on first use
    pub fn global() -> &'static RuleTable {
        GLOBAL.get_or_init(Self::build)
    }

    /// Evaluate the weighted rule for one context without the table
    pub fn evaluate(context: u32) -> bool {
        let bit = |n: &Neighbor| (context >> context_shift(n.di, n.dj)) & 1 != 0;
        let sum: u32 = Orientation::from_context(context)
            .all_neighbors()
            .filter(|n| bit(n))
            .map(|n| n.weight)
            .sum();
        let alive = (context >> context_shift(0, 0)) & 1 != 0;
        next_alive(alive, sum)
    }

    #[inline]
    pub fn lookup(&self, context: u32) -> bool {
        self.bits[(context >> 3) as usize] & (1 << (context & 7)) != 0
    }

    /// Raw table bytes, 8192 of them
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Number of contexts whose centre is alive in the next generation
    pub fn live_contexts(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }
}

impl std::fmt::Debug for RuleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleTable")
            .field("contexts", &CONTEXT_COUNT)
            .field("live_contexts", &self.live_contexts())
            .finish()
    }
}
