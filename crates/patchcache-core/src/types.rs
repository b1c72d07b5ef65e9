//! Shape helper types.

use serde::{Deserialize, Serialize};

/// A `(height, width)` pair used for kernel size, stride and padding.
///
/// Converts from a single `usize` (square) or a `(usize, usize)` tuple, and
/// deserializes from either `3` or `[3, 5]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "PairRepr", into = "PairRepr")]
pub struct Pair {
    /// Vertical component.
    pub h: usize,
    /// Horizontal component.
    pub w: usize,
}

impl Pair {
    /// Create a pair from explicit components.
    pub const fn new(h: usize, w: usize) -> Self {
        Self { h, w }
    }

    /// Create a square pair.
    pub const fn square(n: usize) -> Self {
        Self { h: n, w: n }
    }

    /// Product of both components.
    pub fn area(self) -> usize {
        self.h * self.w
    }

    /// True if either component is zero.
    pub fn has_zero(self) -> bool {
        self.h == 0 || self.w == 0
    }
}

impl From<usize> for Pair {
    fn from(n: usize) -> Self {
        Pair::square(n)
    }
}

impl From<(usize, usize)> for Pair {
    fn from((h, w): (usize, usize)) -> Self {
        Pair::new(h, w)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PairRepr {
    Square(usize),
    Rect(usize, usize),
}

impl From<PairRepr> for Pair {
    fn from(repr: PairRepr) -> Self {
        match repr {
            PairRepr::Square(n) => Pair::square(n),
            PairRepr::Rect(h, w) => Pair::new(h, w),
        }
    }
}

impl From<Pair> for PairRepr {
    fn from(pair: Pair) -> Self {
        if pair.h == pair.w {
            PairRepr::Square(pair.h)
        } else {
            PairRepr::Rect(pair.h, pair.w)
        }
    }
}
