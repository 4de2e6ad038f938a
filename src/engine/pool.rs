use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use super::ImageRef;
use crate::error::Error;

/// Shuffled candidate set that reshuffles itself once every entry was drawn.
///
/// Reshuffling only reorders; the set of images never changes after
/// construction, so a constructed pool can always produce another image.
#[derive(Debug)]
pub struct ImagePool {
    items: Vec<ImageRef>,
    cursor: usize,
    cycle: u64,
    rng: StdRng,
}

impl ImagePool {
    /// Build a pool from `files`, shuffled with `rng`.
    ///
    /// # Errors
    /// Returns [`Error::EmptyPool`] if `files` is empty.
    pub fn new(files: Vec<ImageRef>, mut rng: StdRng) -> Result<Self, Error> {
        if files.is_empty() {
            return Err(Error::EmptyPool);
        }
        let mut items = files;
        items.shuffle(&mut rng);
        Ok(Self {
            items,
            cursor: 0,
            cycle: 0,
            rng,
        })
    }

    /// Hand out the next image, reshuffling first when the current
    /// permutation is exhausted.
    pub fn draw(&mut self) -> ImageRef {
        if self.is_exhausted() {
            self.reshuffle();
        }
        let out = self.items[self.cursor].clone();
        self.cursor += 1;
        out
    }

    fn reshuffle(&mut self) {
        self.items.shuffle(&mut self.rng);
        self.cursor = 0;
        self.cycle += 1;
        debug!(cycle = self.cycle, len = self.items.len(), "pool exhausted; reshuffled");
    }

    /// Whether the next draw triggers a reshuffle.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.items.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always `false` for a constructed pool.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Draws left before the next reshuffle.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.items.len() - self.cursor
    }

    /// Number of reshuffles performed since construction.
    #[must_use]
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Current permutation, in draw order.
    #[must_use]
    pub fn as_slice(&self) -> &[ImageRef] {
        &self.items
    }
}
