//! Sliding-window text chunker.
//!
//! Splits document text into overlapping windows of `size` characters.
//! Each window after the first starts `overlap` characters before the end
//! of the previous one, so a term straddling a boundary is always whole in
//! at least one chunk.
//!
//! Offsets are half-open and count characters (Unicode scalar values), so
//! `text[start..end]` in character space reproduces the span exactly.
//!
//! # Algorithm
//!
//! 1. Start at offset 0.
//! 2. Emit `[start, min(len, start + size))`.
//! 3. If that window reaches the end of the text, stop. The final window
//!    may be shorter than `size` (and even shorter than `overlap`).
//! 4. Otherwise continue from `end - overlap`.
//!
//! # Example
//!
//! ```rust
//! use sred_harness::chunk::chunk_text;
//!
//! let text = "a".repeat(2500);
//! let offsets: Vec<(usize, usize)> = chunk_text(&text, 1000, 150)
//!     .unwrap()
//!     .map(|span| (span.start, span.end))
//!     .collect();
//! assert_eq!(offsets, vec![(0, 1000), (850, 1850), (1700, 2500)]);
//! ```

use std::iter::FusedIterator;

use crate::error::{Error, Result};

/// One window produced by [`chunk_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    /// Character offset of the first character (inclusive).
    pub start: usize,
    /// Character offset one past the last character.
    pub end: usize,
    /// The text between `start` and `end`.
    pub text: &'a str,
}

/// Ordered, finite iterator over the windows of one text.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    /// Byte offset of every character, plus `text.len()` as a sentinel.
    boundaries: Vec<usize>,
    size: usize,
    overlap: usize,
    next_start: Option<usize>,
}

/// Split `text` into overlapping windows.
///
/// Fails with [`Error::Validation`] when `size` is zero or `overlap` is not
/// smaller than `size`; the window could never advance otherwise.
/// Empty text yields no windows.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Chunks<'_>> {
    if size == 0 {
        return Err(Error::Validation("chunk size must be > 0".to_string()));
    }
    if overlap >= size {
        return Err(Error::Validation(format!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, size
        )));
    }

    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let next_start = if text.is_empty() { None } else { Some(0) };

    Ok(Chunks {
        text,
        boundaries,
        size,
        overlap,
        next_start,
    })
}

impl Chunks<'_> {
    fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Span<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_start?;
        let len = self.char_len();
        let end = len.min(start + self.size);

        self.next_start = if end == len {
            None
        } else {
            Some(end - self.overlap)
        };

        Some(Span {
            start,
            end,
            text: &self.text[self.boundaries[start]..self.boundaries[end]],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next_start {
            None => (0, Some(0)),
            Some(start) => {
                let remaining = self.char_len() - start;
                let stride = self.size - self.overlap;
                let windows = if remaining <= self.size {
                    1
                } else {
                    1 + (remaining - self.size).div_ceil(stride)
                };
                (windows, Some(windows))
            }
        }
    }
}

impl ExactSizeIterator for Chunks<'_> {}

impl FusedIterator for Chunks<'_> {}
