//! Pairing of dying and newborn cells for transition animation.
//!
//! Between two generations a renderer can make a triangle appear to roll from
//! a cell that died onto a neighbouring cell that was born, instead of fading
//! one out and the other in. The pairing is greedy: newborn cells are visited
//! in linear-index order, and each takes the first still-unclaimed dying cell
//! from a fixed, orientation-specific candidate list. It is a local heuristic
//! and not an optimal assignment.

use super::bit_grid::{BitBuffer, BitGrid, Buffer};
use super::field::Field;
use super::rules::Orientation;
use serde::{Deserialize, Serialize};

/// A rotation of the triangle at (`column`, `row`) about one of its vertices.
///
/// Vertices are numbered
///
/// ```text
///        0               2 ______ 0
///       /\                 \    /
///      /  \                 \  /
///     /____\                 \/
///    2      1                 1
/// ```
///
/// `turns` counts 60 degree steps; positive values turn anticlockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionDescriptor {
    pub column: usize,
    pub row: usize,
    pub pivot: u8,
    pub turns: i8,
}

/// A dying cell position relative to a newborn cell, and the rotation that
/// carries it there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub d_column: isize,
    pub d_row: isize,
    pub pivot: u8,
    pub turns: i8,
}

const fn candidate(d_column: isize, d_row: isize, pivot: u8, turns: i8) -> Candidate {
    Candidate { d_column, d_row, pivot, turns }
}

/// Search order for a newborn up-pointing triangle.
pub const UP_CANDIDATES: [Candidate; 12] = [
    candidate(0, 1, 0, -1),
    candidate(1, 0, 2, -1),
    candidate(-1, 0, 1, -1),
    candidate(-1, -1, 1, 2),
    candidate(1, -1, 2, -2),
    candidate(-2, 0, 1, -2),
    candidate(2, 0, 2, 2),
    candidate(-1, 1, 0, 2),
    candidate(1, 1, 0, -2),
    candidate(0, -1, 1, -3),
    candidate(-2, 1, 0, -3),
    candidate(2, 1, 2, -3),
];

/// Search order for a newborn down-pointing triangle.
pub const DOWN_CANDIDATES: [Candidate; 12] = [
    candidate(-1, 0, 1, -1),
    candidate(1, 0, 0, -1),
    candidate(0, -1, 2, -1),
    candidate(-1, -1, 1, -2),
    candidate(1, -1, 1, 2),
    candidate(-2, 0, 0, 2),
    candidate(2, 0, 2, -2),
    candidate(-1, 1, 0, -2),
    candidate(1, 1, 2, 2),
    candidate(0, 1, 0, -3),
    candidate(-2, -1, 1, -3),
    candidate(2, -1, 2, -3),
];

pub fn candidates(orientation: Orientation) -> &'static [Candidate; 12] {
    match orientation {
        Orientation::Up => &UP_CANDIDATES,
        Orientation::Down => &DOWN_CANDIDATES,
    }
}

/// Transition lists for one generation change. The lists are cleared and
/// rebuilt by every call to [`AnimationMatcher::prepare`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationMatcher {
    rotations: Vec<TransitionDescriptor>,
    fade_ins: Vec<(usize, usize)>,
    fade_outs: Vec<(usize, usize)>,
}

impl AnimationMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match the field's previous generation against its current one.
    ///
    /// Meaningful right after a step, while the back buffer still holds the
    /// superseded generation. A field that has not been stepped since it was
    /// created or reset yields no transitions.
    pub fn prepare(&mut self, field: &Field) {
        if field.generation() == 0 {
            self.clear();
            return;
        }
        self.match_buffers(field.grid(), Buffer::Back, Buffer::Active);
    }

    /// Match two buffers of a grid, `previous` being the older generation
    pub fn match_buffers(&mut self, grid: &BitGrid, previous: Buffer, next: Buffer) {
        self.clear();
        let (previous, next) = (grid.buffer(previous), grid.buffer(next));
        let mut dying = BitBuffer::and_not(previous, next);
        let nascent = BitBuffer::and_not(next, previous);

        for index in nascent.ones() {
            let (i, j) = grid.coords_of(index);
            let hit = candidates(Orientation::of(i, j)).iter().find_map(|c| {
                let (ci, cj) = (i as isize + c.d_column, j as isize + c.d_row);
                if !grid.in_bounds(ci, cj) {
                    return None;
                }
                let source = grid.index_of(ci as usize, cj as usize);
                dying.test(source).then_some((source, c))
            });

            match hit {
                Some((source, c)) => {
                    dying.reset(source);
                    let (column, row) = grid.coords_of(source);
                    self.rotations.push(TransitionDescriptor {
                        column,
                        row,
                        pivot: c.pivot,
                        turns: c.turns,
                    });
                }
                None => self.fade_ins.push((i, j)),
            }
        }

        self.fade_outs
            .extend(dying.ones().map(|index| grid.coords_of(index)));
    }

    fn clear(&mut self) {
        self.rotations.clear();
        self.fade_ins.clear();
        self.fade_outs.clear();
    }

    /// Dying cells that roll onto a newborn neighbour
    pub fn rotations(&self) -> &[TransitionDescriptor] {
        &self.rotations
    }

    /// Newborn cells without a dying partner
    pub fn fade_ins(&self) -> &[(usize, usize)] {
        &self.fade_ins
    }

    /// Dying cells no newborn cell claimed
    pub fn fade_outs(&self) -> &[(usize, usize)] {
        &self.fade_outs
    }

    pub fn is_empty(&self) -> bool {
        self.rotations.is_empty() && self.fade_ins.is_empty() && self.fade_outs.is_empty()
    }
}
