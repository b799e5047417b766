//! Next-generation computation.
//!
//! Three interchangeable algorithms fill the back buffer of a [`BitGrid`] from
//! its active buffer. They must agree bit for bit:
//!
//! - [`StepAlgorithm::Direct`] sums the weighted neighbours of every cell.
//! - [`StepAlgorithm::Table`] walks each row with a rolling 16-bit context and
//!   looks the result up in the [`RuleTable`].
//! - [`StepAlgorithm::ParallelTable`] runs the table walk for all rows on the
//!   rayon pool. Rows of one column share words in the column-major layout,
//!   so its writes go through atomic ORs.

use super::bit_grid::{extract_window, BitBuffer, BitGrid, Buffer, Word};
use super::rules::{next_alive, Orientation, RuleTable, NEIGHBORHOOD_MASK};
use clap::ValueEnum;
use itertools::iproduct;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Selects how the next generation is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StepAlgorithm {
    Direct,
    Table,
    ParallelTable,
}

impl StepAlgorithm {
    pub const ALL: [StepAlgorithm; 3] = [
        StepAlgorithm::Direct,
        StepAlgorithm::Table,
        StepAlgorithm::ParallelTable,
    ];

    /// Write the successor of the active buffer into the back buffer.
    ///
    /// The back buffer is cleared first; the buffers are not swapped.
    pub fn compute_next(self, grid: &mut BitGrid, table: &RuleTable) {
        grid.fill(Buffer::Back, 0);
        match self {
            StepAlgorithm::Direct => direct_step(grid),
            StepAlgorithm::Table => table_step(grid, table),
            StepAlgorithm::ParallelTable => parallel_table_step(grid, table),
        }
    }
}

impl fmt::Display for StepAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepAlgorithm::Direct => "direct",
            StepAlgorithm::Table => "table",
            StepAlgorithm::ParallelTable => "parallel_table",
        };
        f.write_str(name)
    }
}

/// Weighted sum of the live neighbours of cell `(i, j)` in the active buffer
pub fn weighted_sum(grid: &BitGrid, i: usize, j: usize) -> u32 {
    let (ci, cj) = (i as isize, j as isize);
    Orientation::of(i, j)
        .all_neighbors()
        .filter(|n| grid.get(ci + n.di, cj + n.dj))
        .map(|n| n.weight)
        .sum()
}

fn direct_step(grid: &mut BitGrid) {
    for (i, j) in iproduct!(0..grid.width(), 0..grid.height()) {
        let alive = grid.get(i as isize, j as isize);
        if next_alive(alive, weighted_sum(grid, i, j)) {
            grid.set_unchecked(Buffer::Back, i, j);
        }
    }
}

/// Which rows feed the context of row `j`, and where they land in each
/// 3-bit column group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RowWindow {
    first_row: usize,
    width: usize,
    shift: u32,
}

impl RowWindow {
    fn for_row(j: usize, height: usize) -> Self {
        if height == 1 {
            // Neither diagonal side exists
            RowWindow { first_row: 0, width: 1, shift: 1 }
        } else if j == 0 {
            RowWindow { first_row: 0, width: 2, shift: 1 }
        } else if j == height - 1 {
            RowWindow { first_row: j - 1, width: 2, shift: 0 }
        } else {
            RowWindow { first_row: j - 1, width: 3, shift: 0 }
        }
    }
}

/// Walk row `j` with a rolling context and report every column whose cell is
/// alive in the next generation.
fn table_row(
    active: &BitBuffer,
    width: usize,
    height: usize,
    table: &RuleTable,
    j: usize,
    mut emit: impl FnMut(usize),
) {
    let rows = RowWindow::for_row(j, height);
    let column = |i: isize| -> u32 {
        let bits: Word = extract_window(active, width, height, i, rows.first_row, rows.width);
        bits << rows.shift
    };

    // Columns -2 and -1 are outside the grid and stay zero
    let mut context = (column(0) << 3) | column(1);
    for i in 0..width {
        context = ((context << 3) | column(i as isize + 2)) & NEIGHBORHOOD_MASK;
        context |= (((i + j) & 1) as u32) << 15;
        if table.lookup(context) {
            emit(i);
        }
    }
}

fn table_step(grid: &mut BitGrid, table: &RuleTable) {
    let (width, height) = (grid.width(), grid.height());
    let (active, back) = grid.split_mut();
    for j in 0..height {
        table_row(active, width, height, table, j, |i| back.set(i * height + j));
    }
}

fn parallel_table_step(grid: &mut BitGrid, table: &RuleTable) {
    let (width, height) = (grid.width(), grid.height());
    let (active, back) = grid.split_mut();
    let back: &BitBuffer = back;
    (0..height).into_par_iter().for_each(|j| {
        table_row(active, width, height, table, j, |i| back.set_atomic(i * height + j));
    });
}
