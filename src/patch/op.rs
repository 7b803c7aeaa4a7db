// Patch operations: the closed set of transformations a table entry can
// apply to its byte range.
//
// Every operation is a pure function of (input, offset, range, format). It
// never mutates the input; emitted bytes borrow from the input or from the
// operation's own literal where possible.

use std::borrow::Cow;
use std::fmt;

use super::range::Range;
use crate::format::ConvertFormat;

// ---------------------------------------------------------------------------
// Word size
// ---------------------------------------------------------------------------

/// Width of the words an endian swap reverses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WordSize {
    Two,
    Four,
    Eight,
}

impl WordSize {
    #[inline]
    pub const fn bytes(self) -> usize {
        match self {
            Self::Two => 2,
            Self::Four => 4,
            Self::Eight => 8,
        }
    }
}

// ---------------------------------------------------------------------------
// Step result
// ---------------------------------------------------------------------------

/// How much of its range an operation consumed on one invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// Offset was outside the range; nothing emitted.
    Skip,
    /// Range not fully consumed; call again at `new_offset`.
    Partial,
    /// Range fully consumed.
    Complete,
}

/// Output of a single operation invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step<'a> {
    pub data: Cow<'a, [u8]>,
    pub new_offset: usize,
    pub completion: Completion,
}

impl<'a> Step<'a> {
    fn skip(offset: usize) -> Self {
        Self {
            data: Cow::Borrowed(&[]),
            new_offset: offset,
            completion: Completion::Skip,
        }
    }

    fn complete(data: Cow<'a, [u8]>, new_offset: usize) -> Self {
        Self {
            data,
            new_offset,
            completion: Completion::Complete,
        }
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A byte-range transformation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PatchOp {
    /// Pass input bytes through unchanged.
    Copy,
    /// Replace the range with fixed bytes. A zero-length range inserts; a
    /// range longer than the bytes deletes the difference.
    Literal(Vec<u8>),
    /// Reverse byte order within each word of the range.
    EndianSwap(WordSize),
}

impl PatchOp {
    /// Apply the operation at `offset` within `range`.
    ///
    /// Offsets before `range.start` or after `range.end` produce a `Skip`.
    /// An offset equal to `range.end` is in bounds, so zero-length ranges
    /// still fire.
    pub fn apply<'a>(
        &'a self,
        input: &'a [u8],
        offset: usize,
        range: Range,
        _format: ConvertFormat,
    ) -> Step<'a> {
        if offset < range.start || offset > range.end {
            return Step::skip(offset);
        }

        match self {
            Self::Copy => {
                let end = range.end.min(input.len());
                let data = input.get(offset..end).unwrap_or(&[]);
                Step::complete(Cow::Borrowed(data), range.end)
            }
            Self::Literal(bytes) => {
                let data = bytes.get(offset - range.start..).unwrap_or(&[]);
                Step::complete(Cow::Borrowed(data), range.end)
            }
            Self::EndianSwap(word) => swap_words(input, offset, range, word.bytes()),
        }
    }

    /// Inverse operation for a reversed table. Copy and swaps are their own
    /// inverse; a literal becomes a zero-filled literal over the bytes it
    /// emitted, sized to what it consumed.
    pub fn reverse(&self, range: Range) -> (Range, PatchOp) {
        match self {
            Self::Literal(bytes) => (
                Range::with_len(range.start, bytes.len()),
                Self::Literal(vec![0u8; range.len()]),
            ),
            other => (range, other.clone()),
        }
    }

    /// `emitted - consumed` over the whole range.
    pub fn size_delta(&self, range: Range) -> isize {
        match self {
            Self::Literal(bytes) => bytes.len() as isize - range.len() as isize,
            Self::Copy | Self::EndianSwap(_) => 0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Literal(_) => "literal",
            Self::EndianSwap(_) => "endian-swap",
        }
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy => f.write_str("copy"),
            Self::Literal(bytes) => write!(f, "literal({} bytes)", bytes.len()),
            Self::EndianSwap(word) => write!(f, "endian-swap({})", word.bytes()),
        }
    }
}

/// Swap whole words from `offset`. Chunk boundaries are anchored at
/// `range.start`, so a resumed call lands on the same grid.
fn swap_words(input: &[u8], offset: usize, range: Range, word: usize) -> Step<'_> {
    let avail_end = range.end.min(input.len());
    if offset >= avail_end {
        return Step::complete(Cow::Borrowed(&[]), range.end);
    }

    let mut out = Vec::with_capacity(avail_end - offset);
    let mut pos = offset;

    // Misaligned lead-in: copy up to the next boundary.
    let misalign = (pos - range.start) % word;
    if misalign != 0 {
        let boundary = (pos + word - misalign).min(avail_end);
        out.extend_from_slice(&input[pos..boundary]);
        pos = boundary;
    }

    let whole = (avail_end - pos) / word;
    if whole == 0 {
        // Trailing fragment shorter than a word.
        out.extend_from_slice(&input[pos..avail_end]);
        return Step::complete(Cow::Owned(out), range.end);
    }

    let aligned_end = pos + whole * word;
    for chunk in input[pos..aligned_end].chunks_exact(word) {
        out.extend(chunk.iter().rev());
    }

    if aligned_end == range.end {
        Step::complete(Cow::Owned(out), range.end)
    } else {
        Step {
            data: Cow::Owned(out),
            new_offset: aligned_end,
            completion: Completion::Partial,
        }
    }
}
