// Half-open byte ranges `[start, end)` over a save buffer.

use std::fmt;

/// A half-open interval of byte offsets.
///
/// Ordering is lexicographic on `(start, end)`, which is the order patch
/// tables are sorted and walked in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    /// Build a range, swapping the bounds if they are given reversed.
    pub const fn new(start: usize, end: usize) -> Self {
        if end < start {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    /// A zero-length range at `offset`. Used for pure insertions.
    pub const fn at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// `[start, start + len)`.
    pub const fn with_len(start: usize, len: usize) -> Self {
        Self {
            start,
            end: start + len,
        }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub const fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Shift both bounds by `delta`, saturating at zero.
    pub fn translate(self, delta: isize) -> Self {
        let mut shifted = self;
        shifted.translate_in_place(delta);
        shifted
    }

    pub fn translate_in_place(&mut self, delta: isize) {
        self.start = shift(self.start, delta);
        self.end = shift(self.end, delta);
    }
}

fn shift(offset: usize, delta: isize) -> usize {
    if delta >= 0 {
        offset.saturating_add(delta.unsigned_abs())
    } else {
        offset.saturating_sub(delta.unsigned_abs())
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.start, self.end)
    }
}

impl From<std::ops::Range<usize>> for Range {
    fn from(r: std::ops::Range<usize>) -> Self {
        Self::new(r.start, r.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_bounds_are_normalized() {
        let r = Range::new(0x30, 0x10);
        assert_eq!(r, Range::new(0x10, 0x30));
        assert_eq!(r.len(), 0x20);
    }

    #[test]
    fn empty_and_contains() {
        let ins = Range::at(8);
        assert!(ins.is_empty());
        assert!(!ins.contains(8));

        let r = Range::with_len(4, 4);
        assert!(r.contains(4));
        assert!(r.contains(7));
        assert!(!r.contains(8));
    }

    #[test]
    fn translate_saturates_at_zero() {
        let r = Range::new(4, 12);
        assert_eq!(r.translate(16), Range::new(20, 28));
        assert_eq!(r.translate(-6), Range::new(0, 6));

        let mut m = Range::new(0x38A8, 0x38B8);
        m.translate_in_place(-0x10);
        assert_eq!(m, Range::new(0x3898, 0x38A8));
    }

    #[test]
    fn ordering_is_start_then_end() {
        let mut v = vec![Range::new(4, 8), Range::at(4), Range::new(0, 4)];
        v.sort();
        assert_eq!(v, vec![Range::new(0, 4), Range::at(4), Range::new(4, 8)]);
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(Range::new(0x0C, 0x10).to_string(), "[0xc, 0x10)");
    }
}
