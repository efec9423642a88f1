//! Numeric sequence generation.
//!
//! A [`RangeParameters`] triple describes a walk from `start` toward `end`. The
//! direction of travel is decided only by comparing the two bounds; the sign of
//! `step` is ignored and its magnitude is floored at [`MIN_STEP_MAGNITUDE`] so every
//! walk terminates.
//!
//! ```rust
//! use rangesync::sequence::RangeParameters;
//!
//! let params = RangeParameters::new(10.0, 1.0, -3.0);
//! let values: Vec<f64> = params.sequence().collect();
//! assert_eq!(values, vec![10.0, 7.0, 4.0, 1.0]);
//! ```
//!
//! The running value is accumulated in the loop, exactly like a hand-written
//! `for (i = start; i <= end; i += step)`. Fractional steps therefore carry the usual
//! floating-point drift; a range such as `(0, 1, 0.1)` may stop one element short of
//! the bound. Terms are never re-derived from their index to hide that drift.

use serde::{Deserialize, Serialize};

/// Smallest step magnitude the generator will ever advance by.
pub const MIN_STEP_MAGNITUDE: f64 = 1e-4;

/// Normalize a caller-supplied step into the magnitude actually used for traversal.
///
/// ```rust
/// use rangesync::sequence::{normalize_step, MIN_STEP_MAGNITUDE};
///
/// assert_eq!(normalize_step(-2.5), 2.5);
/// assert_eq!(normalize_step(0.0), MIN_STEP_MAGNITUDE);
/// ```
pub fn normalize_step(step: f64) -> f64 {
    // f64::max ignores a NaN operand, so a NaN step also lands on the minimum.
    MIN_STEP_MAGNITUDE.max(step.abs())
}

/// Direction of traversal, inferred from the bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `start <= end`; values grow toward `end`.
    Ascending,
    /// `start > end`; values shrink toward `end`.
    Descending,
}

/// The `(start, end, step)` triple that defines a sequence.
///
/// `step` is stored exactly as the user entered it. Use [`RangeParameters::effective_step`]
/// for the normalized magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeParameters {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl RangeParameters {
    pub fn new(start: f64, end: f64, step: f64) -> Self {
        Self { start, end, step }
    }

    /// Normalized step magnitude (see [`normalize_step`]).
    pub fn effective_step(&self) -> f64 {
        normalize_step(self.step)
    }

    pub fn direction(&self) -> Direction {
        if self.start <= self.end {
            Direction::Ascending
        } else {
            Direction::Descending
        }
    }

    /// A fresh iterator over the sequence.
    ///
    /// Every call starts over from `start`, so the same parameters can be walked
    /// as many times as needed.
    pub fn sequence(&self) -> Sequence {
        Sequence::new(self)
    }

    /// The first `limit` values of the sequence, for chart-style previews.
    ///
    /// ```rust
    /// use rangesync::sequence::RangeParameters;
    ///
    /// let preview = RangeParameters::new(1.0, 1_000.0, 1.0).preview(3);
    /// assert_eq!(preview, vec![1.0, 2.0, 3.0]);
    /// ```
    pub fn preview(&self, limit: usize) -> Vec<f64> {
        self.sequence().take(limit).collect()
    }

    /// Closed-form estimate of the element count, computed without walking the
    /// sequence.
    ///
    /// The estimate is `floor(|end - start| / effective_step) + 1`, saturating at
    /// `u64::MAX`. It can differ from the real count by one when fractional steps
    /// drift. Non-finite bounds estimate to zero.
    pub fn estimated_count(&self) -> u64 {
        if !self.start.is_finite() || !self.end.is_finite() {
            return 0;
        }
        let spans = ((self.end - self.start).abs() / self.effective_step()).floor();
        if spans >= u64::MAX as f64 {
            u64::MAX
        } else {
            (spans as u64).saturating_add(1)
        }
    }

    /// Whether [`estimated_count`](Self::estimated_count) exceeds `threshold`.
    ///
    /// This is an advisory check only. Nothing in the engine refuses a large range.
    pub fn is_oversized(&self, threshold: u64) -> bool {
        self.estimated_count() > threshold
    }
}

/// Lazy iterator over the values described by a [`RangeParameters`].
#[derive(Debug, Clone)]
pub struct Sequence {
    next: Option<f64>,
    end: f64,
    step: f64,
    direction: Direction,
}

impl Sequence {
    fn new(params: &RangeParameters) -> Self {
        let finite = params.start.is_finite() && params.end.is_finite();
        Self {
            next: if finite { Some(params.start) } else { None },
            end: params.end,
            step: params.effective_step(),
            direction: params.direction(),
        }
    }

    fn in_bounds(&self, value: f64) -> bool {
        match self.direction {
            Direction::Ascending => value <= self.end,
            Direction::Descending => value >= self.end,
        }
    }
}

impl Iterator for Sequence {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let value = self.next.take()?;
        if !self.in_bounds(value) {
            return None;
        }
        let advanced = match self.direction {
            Direction::Ascending => value + self.step,
            Direction::Descending => value - self.step,
        };
        // A step below the value's precision would leave the walk stuck in place.
        if advanced != value {
            self.next = Some(advanced);
        }
        Some(value)
    }
}

impl std::iter::FusedIterator for Sequence {}
