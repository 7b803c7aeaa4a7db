// Patch tables: ordered (range -> operation) entries describing a full
// conversion of one save layout into another.
//
// A table is built fresh per conversion, finalized once (gap fill plus
// coverage check) and then walked read-only by the engine.

use std::fmt;

use super::op::{PatchOp, Step};
use super::range::Range;
use crate::format::ConvertFormat;

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// One range of the input bound to the operation that converts it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PatchEntry {
    pub range: Range,
    pub op: PatchOp,
}

impl PatchEntry {
    pub fn new(range: impl Into<Range>, op: PatchOp) -> Self {
        Self {
            range: range.into(),
            op,
        }
    }

    pub fn copy(range: impl Into<Range>) -> Self {
        Self::new(range, PatchOp::Copy)
    }

    pub fn literal(range: impl Into<Range>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(range, PatchOp::Literal(bytes.into()))
    }

    /// Emit `bytes` at `offset` without consuming input.
    pub fn insert(offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        Self::literal(Range::at(offset), bytes)
    }

    /// Consume `len` input bytes at `offset` without emitting anything.
    pub fn delete(offset: usize, len: usize) -> Self {
        Self::literal(Range::with_len(offset, len), Vec::new())
    }

    #[inline]
    pub fn apply<'a>(&'a self, input: &'a [u8], offset: usize, format: ConvertFormat) -> Step<'a> {
        self.op.apply(input, offset, self.range, format)
    }

    /// The entry that undoes this one, positioned at the same start. Callers
    /// translating a whole table shift the result into the target layout.
    pub fn reverse(&self) -> Self {
        let (range, op) = self.op.reverse(self.range);
        Self { range, op }
    }

    #[inline]
    pub fn size_delta(&self) -> isize {
        self.op.size_delta(self.range)
    }
}

impl fmt::Display for PatchEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.range, self.op)
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatchTable {
    entries: Vec<PatchEntry>,
}

impl PatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<PatchEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: PatchEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[PatchEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<PatchEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PatchEntry> {
        self.entries.iter()
    }

    /// Stable sort by `(start, end)`. Entries with equal ranges keep their
    /// insertion order, so back-to-back insertions at one offset stay ordered.
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.range.cmp(&b.range));
    }

    /// Sort, then cover every offset in `[0, max_offset)` that no entry owns
    /// with a clone of `template`.
    ///
    /// Overlapping entries are rejected. Zero-length entries that sit on a
    /// neighbour's boundary are not overlaps.
    pub fn fill_gaps(mut self, template: &PatchOp, max_offset: usize) -> Result<Self, PatchError> {
        if self.entries.is_empty() {
            return Ok(Self::from_entries(vec![PatchEntry::new(
                Range::new(0, max_offset),
                template.clone(),
            )]));
        }

        self.sort();
        let mut filled = Vec::with_capacity(self.entries.len() * 2 + 1);
        let mut covered = 0usize;
        let mut previous = Range::default();

        for entry in self.entries {
            if previous.contains(entry.range.start) {
                return Err(PatchError::Overlap {
                    previous,
                    current: entry.range,
                });
            }
            if entry.range.start > covered {
                filled.push(PatchEntry::new(
                    Range::new(covered, entry.range.start),
                    template.clone(),
                ));
            }
            covered = entry.range.end;
            previous = entry.range;
            filled.push(entry);
        }

        if covered < max_offset {
            filled.push(PatchEntry::new(Range::new(covered, max_offset), template.clone()));
        }

        Ok(Self::from_entries(filled))
    }

    /// Check that the entries, in table order, tile `[0, input_len)` with
    /// no gaps or overlaps. Every violation is collected into one error.
    pub fn validate_coverage(&self, input_len: usize) -> Result<(), PatchError> {
        let mut discontinuities = Vec::new();

        let Some(first) = self.entries.first() else {
            if input_len > 0 {
                discontinuities.push(format!("table is empty but input has {input_len:#x} bytes"));
                return Err(PatchError::RangeNotCovered { discontinuities });
            }
            return Ok(());
        };

        if first.range.start != 0 {
            discontinuities.push(format!(
                "first entry must start at 0x0, starts at {:#x}",
                first.range.start
            ));
        }
        for pair in self.entries.windows(2) {
            let (prev, curr) = (pair[0].range, pair[1].range);
            if prev.end != curr.start {
                discontinuities.push(format!(
                    "entry {prev} ends at {:#x} but next entry {curr} starts at {:#x}",
                    prev.end, curr.start
                ));
            }
        }
        if let Some(last) = self.entries.last()
            && last.range.end < input_len
        {
            discontinuities.push(format!(
                "last entry must end at or after {input_len:#x}, ends at {:#x}",
                last.range.end
            ));
        }

        if discontinuities.is_empty() {
            Ok(())
        } else {
            Err(PatchError::RangeNotCovered { discontinuities })
        }
    }

    /// Gap fill then coverage check: the table is ready for the engine.
    pub fn finalize(
        self,
        template: &PatchOp,
        max_offset: usize,
        input_len: usize,
    ) -> Result<Self, PatchError> {
        let table = self.fill_gaps(template, max_offset)?;
        table.validate_coverage(input_len)?;
        Ok(table)
    }

    /// Sum of every entry's size delta.
    pub fn net_delta(&self) -> isize {
        self.entries.iter().map(PatchEntry::size_delta).sum()
    }

    /// Fail with `DeltaMismatch` unless the net delta equals `expected`.
    pub fn expect_delta(
        &self,
        game: &'static str,
        format: ConvertFormat,
        expected: isize,
    ) -> Result<(), PatchError> {
        let actual = self.net_delta();
        if actual == expected {
            Ok(())
        } else {
            Err(PatchError::DeltaMismatch {
                game,
                format,
                expected,
                actual,
            })
        }
    }

    /// Derive the table for the opposite direction.
    ///
    /// Each entry is reversed in original order, then shifted by the net
    /// delta of every entry before it in layout order so that it lands on
    /// the target-layout offset. The result is not re-sorted.
    pub fn reverse(&self) -> Self {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by(|&a, &b| self.entries[a].range.cmp(&self.entries[b].range));

        let mut shift = vec![0isize; self.entries.len()];
        let mut running = 0isize;
        for &i in &order {
            shift[i] = running;
            running += self.entries[i].size_delta();
        }

        let entries = self
            .entries
            .iter()
            .zip(shift)
            .map(|(entry, delta)| {
                let mut reversed = entry.reverse();
                reversed.range.translate_in_place(delta);
                reversed
            })
            .collect();
        Self { entries }
    }

    /// Index of the entry owning `offset`, searching from `search_start`.
    ///
    /// An entry starting exactly at `offset` wins. Otherwise the entry just
    /// before the insertion point is used when it is not before
    /// `search_start` and still reaches `offset`; this is how a partially
    /// consumed range is resumed.
    pub fn find(&self, offset: usize, search_start: usize) -> Option<usize> {
        let tail = self.entries.get(search_start..)?;
        let lower = search_start + tail.partition_point(|e| e.range.start < offset);

        if self.entries.get(lower).is_some_and(|e| e.range.start == offset) {
            return Some(lower);
        }
        if lower > search_start && self.entries[lower - 1].range.end >= offset {
            return Some(lower - 1);
        }
        None
    }
}

impl FromIterator<PatchEntry> for PatchTable {
    fn from_iter<I: IntoIterator<Item = PatchEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<PatchEntry> for PatchTable {
    fn extend<I: IntoIterator<Item = PatchEntry>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl<'a> IntoIterator for &'a PatchTable {
    type Item = &'a PatchEntry;
    type IntoIter = std::slice::Iter<'a, PatchEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A patch table that cannot be used as written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    #[error("patch table does not cover the input:\n  {}", .discontinuities.join("\n  "))]
    RangeNotCovered { discontinuities: Vec<String> },

    #[error("patch entries overlap: {previous} and {current}")]
    Overlap { previous: Range, current: Range },

    #[error("{game} {format}: expected a size delta of {expected} bytes, table produces {actual}")]
    DeltaMismatch {
        game: &'static str,
        format: ConvertFormat,
        expected: isize,
        actual: isize,
    },

    #[error("{game} does not support {format} conversion")]
    UnsupportedFormat {
        game: &'static str,
        format: ConvertFormat,
    },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
