//! Rank algebra: the input/output arity of a term.
//!
//! A `Rank` is the 4-tuple `(forward_out, reverse_out, forward_in, reverse_in)`.
//! Reverse components are carried through every operation but this pipeline
//! only ever produces them as zero.
//!
//! Partial operations return `None` ("no rank") on mismatch. Callers in the
//! orchestrator turn `None` into a fatal [`BuildError`](crate::error::BuildError).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Input/output arity of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rank {
    pub forward_out: usize,
    pub reverse_out: usize,
    pub forward_in: usize,
    pub reverse_in: usize,
}

impl Rank {
    /// Creates a rank from its four components.
    #[inline]
    pub const fn new(forward_out: usize, reverse_out: usize, forward_in: usize, reverse_in: usize) -> Self {
        Self {
            forward_out,
            reverse_out,
            forward_in,
            reverse_in,
        }
    }

    /// The rank of a term with no ports.
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Forward-only rank with `inputs` inputs and `outputs` outputs.
    #[inline]
    pub const fn forward(inputs: usize, outputs: usize) -> Self {
        Self::new(outputs, 0, inputs, 0)
    }

    /// Sequential composition: `a` feeds `b`.
    ///
    /// Requires `a.forward_out == b.forward_in` and, symmetrically,
    /// `b.reverse_out == a.reverse_in`.
    pub fn compose(a: Rank, b: Rank) -> Option<Rank> {
        if a.forward_out != b.forward_in || a.reverse_in != b.reverse_out {
            return None;
        }
        Some(Rank::new(b.forward_out, a.reverse_out, a.forward_in, b.reverse_in))
    }

    /// Sum of two equal ranks; returns a copy.
    pub fn add(a: Rank, b: Rank) -> Option<Rank> {
        (a == b).then_some(a)
    }

    /// Parallel juxtaposition: elementwise sum. Always defined.
    pub fn product(a: Rank, b: Rank) -> Rank {
        Rank::new(
            a.forward_out + b.forward_out,
            a.reverse_out + b.reverse_out,
            a.forward_in + b.forward_in,
            a.reverse_in + b.reverse_in,
        )
    }

    /// Folds `n` forward input/output pairs into a loop.
    ///
    /// Requires `n <= min(forward_in, forward_out)`.
    pub fn contract(a: Rank, n: usize) -> Option<Rank> {
        if n > a.forward_in.min(a.forward_out) {
            return None;
        }
        Some(Rank::new(a.forward_out - n, a.reverse_out, a.forward_in - n, a.reverse_in))
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --> {}", self.forward_in, self.forward_out)?;
        if self.reverse_in != 0 || self.reverse_out != 0 {
            write!(f, " (reverse {} <-- {})", self.reverse_in, self.reverse_out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_requires_matching_join() {
        let a = Rank::forward(2, 3);
        let b = Rank::forward(3, 1);
        assert_eq!(Rank::compose(a, b), Some(Rank::forward(2, 1)));
        assert_eq!(Rank::compose(b, a), None);
    }

    #[test]
    fn compose_checks_reverse_components() {
        let a = Rank::new(1, 0, 1, 1);
        let b = Rank::new(1, 0, 1, 0);
        assert_eq!(Rank::compose(a, b), None);
        let c = Rank::new(1, 1, 1, 0);
        assert_eq!(Rank::compose(a, c), Some(Rank::new(1, 0, 1, 0)));
    }

    #[test]
    fn add_only_for_equal_ranks() {
        let a = Rank::forward(1, 2);
        assert_eq!(Rank::add(a, a), Some(a));
        assert_eq!(Rank::add(a, Rank::forward(2, 1)), None);
    }

    #[test]
    fn product_is_elementwise_sum() {
        let p = Rank::product(Rank::forward(1, 2), Rank::new(3, 1, 0, 4));
        assert_eq!(p, Rank::new(5, 1, 1, 4));
        assert_eq!(Rank::product(p, Rank::zero()), p);
    }

    #[test]
    fn contract_is_bounds_checked() {
        let a = Rank::forward(3, 2);
        assert_eq!(Rank::contract(a, 2), Some(Rank::forward(1, 0)));
        assert_eq!(Rank::contract(a, 0), Some(a));
        assert_eq!(Rank::contract(a, 3), None);
    }

    #[test]
    fn display_shows_boundary() {
        assert_eq!(Rank::forward(2, 1).to_string(), "2 --> 1");
        assert_eq!(Rank::new(1, 2, 1, 3).to_string(), "1 --> 1 (reverse 3 <-- 2)");
    }
}
