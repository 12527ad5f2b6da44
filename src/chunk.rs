//! Overlapping fixed-size text chunker and segment cleaner.
//!
//! Splits page text into [`Segment`]s of a target character length where
//! consecutive segments share exactly `overlap` characters. The final
//! segment of a page may be shorter than the target. Each segment carries
//! provenance: its page number, character offset within the page, and a
//! global ordinal across the document, which later serves as the
//! tie-breaker for equal similarity scores.
//!
//! The cleaner collapses embedded tab characters to single spaces and
//! nothing else; the behavior is pure and idempotent.

use crate::error::PipelineError;
use crate::extract::PageText;

/// A contiguous slice of document text with provenance metadata.
/// Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,
    /// Zero-based page the segment was cut from.
    pub page: usize,
    /// Character offset of the segment start within its page.
    pub offset: usize,
    /// Global ordinal across the whole document, in reading order.
    pub index: usize,
}

/// Lazy, restartable iterator of overlapping windows over one text.
///
/// Yields `(char_offset, text)` pairs in document order. The iterator is
/// cheap to construct via [`segments`], so restarting is a matter of
/// building a fresh one (or cloning before consumption).
#[derive(Debug, Clone)]
pub struct SegmentIter<'a> {
    text: &'a str,
    /// Byte offset of every char boundary, plus the end of the text.
    boundaries: Vec<usize>,
    size: usize,
    step: usize,
    /// Next window start, in characters.
    start: usize,
    done: bool,
}

impl<'a> Iterator for SegmentIter<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.boundaries.len() - 1;
        if self.done || self.start >= total {
            return None;
        }
        let end = (self.start + self.size).min(total);
        let slice = &self.text[self.boundaries[self.start]..self.boundaries[end]];
        let at = self.start;
        if end == total {
            self.done = true;
        } else {
            self.start += self.step;
        }
        Some((at, slice))
    }
}

/// Build an overlapping-window iterator over `text`.
///
/// `size` and `overlap` are measured in characters. Fails with
/// [`PipelineError::InvalidParameter`] when `overlap >= size` or when
/// `size` is zero. Empty text yields an empty iterator.
pub fn segments(text: &str, size: usize, overlap: usize) -> Result<SegmentIter<'_>, PipelineError> {
    if size == 0 {
        return Err(PipelineError::InvalidParameter(
            "chunk size must be > 0".to_string(),
        ));
    }
    if overlap >= size {
        return Err(PipelineError::InvalidParameter(format!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, size
        )));
    }

    let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(text.len());

    Ok(SegmentIter {
        text,
        boundaries,
        size,
        step: size - overlap,
        start: 0,
        done: false,
    })
}

/// Chunk every page of a document into cleaned [`Segment`]s with global
/// ordinals assigned in reading order.
pub fn chunk_pages(
    pages: &[PageText],
    size: usize,
    overlap: usize,
) -> Result<Vec<Segment>, PipelineError> {
    let mut out = Vec::new();
    let mut index = 0;

    for page in pages {
        for (offset, text) in segments(&page.text, size, overlap)? {
            out.push(Segment {
                text: clean(text),
                page: page.page,
                offset,
                index,
            });
            index += 1;
        }
    }

    Ok(out)
}

/// Collapse each tab character to a single space. No other normalization.
pub fn clean(text: &str) -> String {
    text.replace('\t', " ")
}
