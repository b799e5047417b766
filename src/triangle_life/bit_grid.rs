//! Packed, double-buffered cell storage for a triangular field.
//!
//! Cells are stored column-major: cell `(i, j)` (column `i`, row `j`) lives at
//! linear index `i * height + j`, packed 32 to a word. Two equally sized
//! buffers are kept; one is the committed generation (`active`) and the other
//! is scratch space for the next one (`back`). Swapping them only flips an
//! index.
//!
//! Words are `AtomicU32` so the parallel stepper can OR bits into a shared
//! back buffer from several workers. Every other path goes through `&mut` and
//! touches the words without synchronization.

use super::FieldError;
use rand::Rng;
use std::sync::atomic::{AtomicU32, Ordering};

/// Storage word of a [`BitBuffer`].
pub type Word = u32;

/// Number of cells packed into one [`Word`].
pub const WORD_BITS: usize = Word::BITS as usize;

/// Selects one of the two buffers of a [`BitGrid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Buffer {
    /// The last committed generation.
    Active,
    /// Scratch space the next generation is written into.
    Back,
}

/// A fixed-size packed bit vector.
#[derive(Debug)]
pub struct BitBuffer {
    words: Box<[AtomicU32]>,
}

impl BitBuffer {
    /// Create a buffer of `word_count` zeroed words
    pub fn zeroed(word_count: usize) -> Self {
        Self {
            words: (0..word_count).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    /// Build `a AND NOT b` word by word
    pub fn and_not(a: &BitBuffer, b: &BitBuffer) -> Self {
        debug_assert_eq!(a.word_count(), b.word_count());
        Self {
            words: (0..a.word_count())
                .map(|w| AtomicU32::new(a.word(w) & !b.word(w)))
                .collect(),
        }
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    #[inline]
    pub fn word(&self, word: usize) -> Word {
        self.words[word].load(Ordering::Relaxed)
    }

    /// Test the bit at a linear index
    #[inline]
    pub fn test(&self, index: usize) -> bool {
        (self.word(index / WORD_BITS) >> (index % WORD_BITS)) & 1 != 0
    }

    #[inline]
    pub fn set(&mut self, index: usize) {
        *self.words[index / WORD_BITS].get_mut() |= 1 << (index % WORD_BITS);
    }

    #[inline]
    pub fn reset(&mut self, index: usize) {
        *self.words[index / WORD_BITS].get_mut() &= !(1 << (index % WORD_BITS));
    }

    #[inline]
    pub fn toggle(&mut self, index: usize) {
        *self.words[index / WORD_BITS].get_mut() ^= 1 << (index % WORD_BITS);
    }

    /// Atomically OR a single bit into its word.
    ///
    /// Safe to call from several threads at once, including for bits that
    /// share a word.
    #[inline]
    pub fn set_atomic(&self, index: usize) {
        self.words[index / WORD_BITS].fetch_or(1 << (index % WORD_BITS), Ordering::Relaxed);
    }

    /// Atomically clear a single bit (AND with the complement of its mask).
    #[inline]
    pub fn reset_atomic(&self, index: usize) {
        self.words[index / WORD_BITS].fetch_and(!(1 << (index % WORD_BITS)), Ordering::Relaxed);
    }

    /// Overwrite every word with `value`
    pub fn fill(&mut self, value: Word) {
        for word in self.words.iter_mut() {
            *word.get_mut() = value;
        }
    }

    /// Read `width` consecutive bits starting at linear index `start`.
    ///
    /// Bit 0 of the result is the bit at `start`. When the run crosses a word
    /// boundary the tail is taken from the following word.
    #[inline]
    pub fn read_bits(&self, start: usize, width: usize) -> Word {
        debug_assert!(width > 0 && width < WORD_BITS);
        let word = start / WORD_BITS;
        let offset = start % WORD_BITS;
        let mask: Word = (1 << width) - 1;
        let low = self.word(word) >> offset;
        if offset + width <= WORD_BITS {
            low & mask
        } else {
            (low | (self.word(word + 1) << (WORD_BITS - offset))) & mask
        }
    }

    /// Replace the contents with random words
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for word in self.words.iter_mut() {
            *word.get_mut() = rng.gen();
        }
    }

    /// Clear every bit at or past `cell_count`
    pub fn clear_from(&mut self, cell_count: usize) {
        let first_full = cell_count.div_ceil(WORD_BITS);
        let offset = cell_count % WORD_BITS;
        if offset != 0 {
            *self.words[cell_count / WORD_BITS].get_mut() &= (1 << offset) - 1;
        }
        for word in self.words.iter_mut().skip(first_full) {
            *word.get_mut() = 0;
        }
    }

    pub fn copy_from(&mut self, other: &BitBuffer) {
        debug_assert_eq!(self.word_count(), other.word_count());
        for (w, word) in self.words.iter_mut().enumerate() {
            *word.get_mut() = other.word(w);
        }
    }

    /// Plain copy of the words, for comparisons and diagnostics
    pub fn snapshot(&self) -> Vec<Word> {
        (0..self.word_count()).map(|w| self.word(w)).collect()
    }

    pub fn count_ones(&self) -> usize {
        (0..self.word_count())
            .map(|w| self.word(w).count_ones() as usize)
            .sum()
    }

    /// Linear indices of the set bits, in ascending order
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.word_count()).flat_map(move |w| {
            let mut bits = self.word(w);
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(w * WORD_BITS + bit)
            })
        })
    }
}

impl Clone for BitBuffer {
    fn clone(&self) -> Self {
        Self {
            words: (0..self.word_count())
                .map(|w| AtomicU32::new(self.word(w)))
                .collect(),
        }
    }
}

impl PartialEq for BitBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.word_count() == other.word_count()
            && (0..self.word_count()).all(|w| self.word(w) == other.word(w))
    }
}

impl Eq for BitBuffer {}

/// A `width` x `height` grid of cells held in two packed buffers.
#[derive(Debug, Clone)]
pub struct BitGrid {
    width: usize,
    height: usize,
    buffers: [BitBuffer; 2],
    active: usize,
}

impl BitGrid {
    /// Create an all-dead grid
    pub fn new(width: usize, height: usize) -> Result<Self, FieldError> {
        if width == 0 || height == 0 {
            return Err(FieldError::InvalidDimensions { width, height });
        }
        let cells = width
            .checked_mul(height)
            .filter(|&cells| cells <= isize::MAX as usize)
            .ok_or(FieldError::TooLarge { width, height })?;

        let word_count = cells.div_ceil(WORD_BITS);
        Ok(Self {
            width,
            height,
            buffers: [BitBuffer::zeroed(word_count), BitBuffer::zeroed(word_count)],
            active: 0,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    pub fn word_count(&self) -> usize {
        self.buffers[0].word_count()
    }

    /// Convert column/row coordinates to a linear index
    #[inline]
    pub fn index_of(&self, i: usize, j: usize) -> usize {
        i * self.height + j
    }

    /// Convert a linear index back to `(column, row)`
    #[inline]
    pub fn coords_of(&self, index: usize) -> (usize, usize) {
        (index / self.height, index % self.height)
    }

    #[inline]
    pub fn in_bounds(&self, i: isize, j: isize) -> bool {
        i >= 0 && (i as usize) < self.width && j >= 0 && (j as usize) < self.height
    }

    pub fn buffer(&self, which: Buffer) -> &BitBuffer {
        match which {
            Buffer::Active => &self.buffers[self.active],
            Buffer::Back => &self.buffers[self.active ^ 1],
        }
    }

    fn buffer_mut(&mut self, which: Buffer) -> &mut BitBuffer {
        let slot = match which {
            Buffer::Active => self.active,
            Buffer::Back => self.active ^ 1,
        };
        &mut self.buffers[slot]
    }

    pub fn active(&self) -> &BitBuffer {
        self.buffer(Buffer::Active)
    }

    pub fn back(&self) -> &BitBuffer {
        self.buffer(Buffer::Back)
    }

    /// Borrow the active buffer for reading and the back buffer for writing
    pub fn split_mut(&mut self) -> (&BitBuffer, &mut BitBuffer) {
        let [first, second] = &mut self.buffers;
        if self.active == 0 {
            (&*first, second)
        } else {
            (&*second, first)
        }
    }

    /// Read a cell of the active buffer. Anything outside the grid is dead.
    #[inline]
    pub fn get(&self, i: isize, j: isize) -> bool {
        self.get_in(Buffer::Active, i, j)
    }

    #[inline]
    pub fn get_in(&self, which: Buffer, i: isize, j: isize) -> bool {
        self.in_bounds(i, j) && self.buffer(which).test(self.index_of(i as usize, j as usize))
    }

    /// Set a cell the caller already knows is inside the grid
    #[inline]
    pub fn set_unchecked(&mut self, which: Buffer, i: usize, j: usize) {
        debug_assert!(i < self.width && j < self.height);
        let index = self.index_of(i, j);
        self.buffer_mut(which).set(index);
    }

    #[inline]
    pub fn reset_unchecked(&mut self, which: Buffer, i: usize, j: usize) {
        debug_assert!(i < self.width && j < self.height);
        let index = self.index_of(i, j);
        self.buffer_mut(which).reset(index);
    }

    /// Bring a cell of the active buffer to life. Returns `false` and leaves
    /// the grid untouched when the coordinates are outside it.
    pub fn set_checked(&mut self, i: isize, j: isize) -> bool {
        if !self.in_bounds(i, j) {
            return false;
        }
        self.set_unchecked(Buffer::Active, i as usize, j as usize);
        true
    }

    pub fn reset_checked(&mut self, i: isize, j: isize) -> bool {
        if !self.in_bounds(i, j) {
            return false;
        }
        self.reset_unchecked(Buffer::Active, i as usize, j as usize);
        true
    }

    pub fn flip(&mut self, i: isize, j: isize) -> bool {
        if !self.in_bounds(i, j) {
            return false;
        }
        let index = self.index_of(i as usize, j as usize);
        self.buffer_mut(Buffer::Active).toggle(index);
        true
    }

    /// Set a cell through a shared reference; see [`BitBuffer::set_atomic`]
    #[inline]
    pub fn set_atomic(&self, which: Buffer, i: usize, j: usize) {
        debug_assert!(i < self.width && j < self.height);
        self.buffer(which).set_atomic(self.index_of(i, j));
    }

    #[inline]
    pub fn reset_atomic(&self, which: Buffer, i: usize, j: usize) {
        debug_assert!(i < self.width && j < self.height);
        self.buffer(which).reset_atomic(self.index_of(i, j));
    }

    /// Read `width` consecutive cells of column `i`, starting at row `j`.
    ///
    /// Columns outside the grid read as 0. Rows `j..j + width` must lie inside
    /// the grid.
    #[inline]
    pub fn extract_window(&self, which: Buffer, i: isize, j: usize, width: usize) -> Word {
        extract_window(self.buffer(which), self.width, self.height, i, j, width)
    }

    /// Exchange the roles of the two buffers
    pub fn swap(&mut self) {
        self.active ^= 1;
    }

    pub fn fill(&mut self, which: Buffer, value: Word) {
        let cells = self.cell_count();
        let buffer = self.buffer_mut(which);
        buffer.fill(value);
        buffer.clear_from(cells);
    }

    /// Fill a buffer with uniformly random cells
    pub fn randomize<R: Rng + ?Sized>(&mut self, which: Buffer, rng: &mut R) {
        let cells = self.cell_count();
        let buffer = self.buffer_mut(which);
        buffer.randomize(rng);
        buffer.clear_from(cells);
    }

    /// Copy the active buffer over the back buffer
    pub fn mirror_active(&mut self) {
        let (active, back) = self.split_mut();
        back.copy_from(active);
    }

    /// Number of live cells in the active buffer
    pub fn population(&self) -> usize {
        self.active().count_ones()
    }
}

/// Window read shared by [`BitGrid::extract_window`] and the steppers, which
/// hold a bare buffer reference while the back buffer is borrowed mutably.
#[inline]
pub(crate) fn extract_window(
    buffer: &BitBuffer,
    width: usize,
    height: usize,
    i: isize,
    j: usize,
    window: usize,
) -> Word {
    if i < 0 || i as usize >= width {
        return 0;
    }
    debug_assert!(j + window <= height);
    buffer.read_bits(j + i as usize * height, window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rayon::prelude::*;

    #[test]
    fn test_grid_creation() {
        let grid = BitGrid::new(5, 7).unwrap();
        assert_eq!(grid.width(), 5);
        assert_eq!(grid.height(), 7);
        assert_eq!(grid.cell_count(), 35);
        assert_eq!(grid.word_count(), 2);
        assert_eq!(grid.population(), 0);

        let exact = BitGrid::new(4, 8).unwrap();
        assert_eq!(exact.word_count(), 1);
    }

    #[test]
    fn test_invalid_dimensions() {
        assert_eq!(
            BitGrid::new(0, 4).unwrap_err(),
            FieldError::InvalidDimensions { width: 0, height: 4 }
        );
        assert!(BitGrid::new(3, 0).is_err());
        assert!(matches!(
            BitGrid::new(usize::MAX, 2),
            Err(FieldError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_index_is_column_major() {
        let grid = BitGrid::new(4, 10).unwrap();
        assert_eq!(grid.index_of(0, 0), 0);
        assert_eq!(grid.index_of(0, 9), 9);
        assert_eq!(grid.index_of(1, 0), 10);
        assert_eq!(grid.index_of(3, 9), 39);
        assert_eq!(grid.coords_of(23), (2, 3));
    }

    #[test]
    fn test_out_of_range_reads_are_dead() {
        let mut grid = BitGrid::new(3, 3).unwrap();
        grid.fill(Buffer::Active, Word::MAX);
        assert!(grid.get(0, 0));
        assert!(grid.get(2, 2));
        assert!(!grid.get(-1, 0));
        assert!(!grid.get(0, -1));
        assert!(!grid.get(3, 0));
        assert!(!grid.get(0, 3));
    }

    #[test]
    fn test_checked_edits() {
        let mut grid = BitGrid::new(4, 4).unwrap();

        assert!(grid.set_checked(1, 2));
        assert!(grid.get(1, 2));
        assert!(grid.reset_checked(1, 2));
        assert!(!grid.get(1, 2));

        assert!(grid.flip(3, 3));
        assert!(grid.get(3, 3));
        assert!(grid.flip(3, 3));
        assert!(!grid.get(3, 3));

        // Rejected edits leave every word untouched
        assert!(!grid.set_checked(4, 0));
        assert!(!grid.set_checked(-1, 0));
        assert!(!grid.reset_checked(0, 4));
        assert!(!grid.flip(0, -3));
        assert_eq!(grid.population(), 0);
        assert!(grid.active().snapshot().iter().all(|&w| w == 0));
    }

    #[test]
    fn test_unchecked_targets_buffer() {
        let mut grid = BitGrid::new(3, 3).unwrap();
        grid.set_unchecked(Buffer::Back, 1, 1);
        assert!(!grid.get(1, 1));
        assert!(grid.get_in(Buffer::Back, 1, 1));

        grid.reset_unchecked(Buffer::Back, 1, 1);
        assert!(!grid.get_in(Buffer::Back, 1, 1));
    }

    #[test]
    fn test_atomic_writes_from_many_threads() {
        // Every row of a column shares words with its neighbours
        let grid = BitGrid::new(7, 13).unwrap();
        (0..grid.height()).into_par_iter().for_each(|j| {
            for i in 0..grid.width() {
                grid.set_atomic(Buffer::Back, i, j);
            }
        });
        assert_eq!(grid.back().count_ones(), grid.cell_count());

        (0..grid.height()).into_par_iter().for_each(|j| {
            for i in (0..grid.width()).step_by(2) {
                grid.reset_atomic(Buffer::Back, i, j);
            }
        });
        assert_eq!(grid.back().count_ones(), 3 * 13);
    }

    #[test]
    fn test_extract_window_straddles_words() {
        let mut grid = BitGrid::new(2, 40).unwrap();
        // Column 0, rows 30 and 32 sit in different words
        grid.set_checked(0, 30);
        grid.set_checked(0, 32);

        assert_eq!(grid.extract_window(Buffer::Active, 0, 30, 3), 0b101);
        assert_eq!(grid.extract_window(Buffer::Active, 0, 31, 2), 0b10);
        assert_eq!(grid.extract_window(Buffer::Active, 0, 29, 2), 0b10);
        assert_eq!(grid.extract_window(Buffer::Active, 0, 32, 1), 0b1);

        // Column 1 starts at index 40, rows 22..=24 span bits 62..=64
        grid.set_checked(1, 22);
        grid.set_checked(1, 23);
        grid.set_checked(1, 24);
        assert_eq!(grid.extract_window(Buffer::Active, 1, 22, 3), 0b111);
        assert_eq!(grid.extract_window(Buffer::Active, 1, 23, 2), 0b11);
    }

    #[test]
    fn test_extract_window_outside_columns() {
        let mut grid = BitGrid::new(2, 4).unwrap();
        grid.fill(Buffer::Active, Word::MAX);
        assert_eq!(grid.extract_window(Buffer::Active, -1, 0, 3), 0);
        assert_eq!(grid.extract_window(Buffer::Active, 2, 1, 3), 0);
        assert_eq!(grid.extract_window(Buffer::Active, 1, 1, 3), 0b111);
    }

    #[test]
    fn test_swap_is_an_involution() {
        let mut grid = BitGrid::new(6, 6).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        grid.randomize(Buffer::Active, &mut rng);
        let active = grid.active().snapshot();
        let back = grid.back().snapshot();

        grid.swap();
        assert_eq!(grid.active().snapshot(), back);
        assert_eq!(grid.back().snapshot(), active);

        grid.swap();
        assert_eq!(grid.active().snapshot(), active);
        assert_eq!(grid.back().snapshot(), back);
    }

    #[test]
    fn test_padding_stays_clear() {
        let mut grid = BitGrid::new(5, 7).unwrap();
        grid.fill(Buffer::Active, Word::MAX);
        assert_eq!(grid.population(), 35);

        let mut rng = StdRng::seed_from_u64(11);
        grid.randomize(Buffer::Back, &mut rng);
        assert!(grid.back().ones().all(|index| index < 35));
    }

    #[test]
    fn test_mirror_and_ones() {
        let mut grid = BitGrid::new(3, 20).unwrap();
        grid.set_checked(0, 1);
        grid.set_checked(1, 15);
        grid.set_checked(2, 19);
        grid.mirror_active();

        assert_eq!(grid.active(), grid.back());
        let ones: Vec<usize> = grid.back().ones().collect();
        assert_eq!(ones, vec![1, 35, 59]);
    }

    #[test]
    fn test_and_not() {
        let mut a = BitBuffer::zeroed(2);
        let mut b = BitBuffer::zeroed(2);
        a.set(3);
        a.set(40);
        b.set(40);
        b.set(5);
        let diff = BitBuffer::and_not(&a, &b);
        assert_eq!(diff.ones().collect::<Vec<_>>(), vec![3]);
    }
}
