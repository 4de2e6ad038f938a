//! Bounded log of shown images with a traversal cursor.
//!
//! ```text
//!   entries: [B, C, D]     capacity = 3
//!                  ^ cursor (what is on screen)
//!
//!   push(E)   => [C, D, E], cursor on E   (B evicted)
//!   move_back => cursor on D
//! ```
//!
//! The cursor tracks what is displayed. It only jumps to the newest entry on
//! `push`; traversal moves it one step at a time and never past either end.

use std::collections::VecDeque;

use tracing::trace;

use super::ImageRef;
use crate::error::Error;

#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<ImageRef>,
    capacity: usize,
    cursor: usize,
}

impl History {
    /// # Errors
    /// Returns [`Error::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, Error> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity);
        }
        Ok(Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            cursor: 0,
        })
    }

    /// Append `item`, evicting the oldest entry when full, and point the
    /// cursor at it.
    pub fn push(&mut self, item: ImageRef) {
        if self.entries.len() == self.capacity
            && let Some(evicted) = self.entries.pop_front()
        {
            trace!(path = %evicted, "history full; evicted oldest entry");
        }
        self.entries.push_back(item);
        self.cursor = self.entries.len() - 1;
    }

    /// # Errors
    /// Returns [`Error::EmptyHistory`] before the first push.
    pub fn current(&self) -> Result<&ImageRef, Error> {
        self.entries.get(self.cursor).ok_or(Error::EmptyHistory)
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.cursor > 0
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Step one entry towards the oldest.
    ///
    /// # Errors
    /// Returns [`Error::NoPreviousEntry`] when already at the oldest entry.
    pub fn move_back(&mut self) -> Result<&ImageRef, Error> {
        if !self.has_previous() {
            return Err(Error::NoPreviousEntry);
        }
        self.cursor -= 1;
        self.current()
    }

    /// Step one entry towards the newest.
    ///
    /// # Errors
    /// Returns [`Error::NoNextEntry`] when already at the newest entry.
    pub fn move_forward(&mut self) -> Result<&ImageRef, Error> {
        if !self.has_next() {
            return Err(Error::NoNextEntry);
        }
        self.cursor += 1;
        self.current()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Index of the displayed entry, oldest = 0. Meaningless while empty.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &ImageRef> {
        self.entries.iter()
    }
}
