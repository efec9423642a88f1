//! Descriptive statistics over a range sequence.
//!
//! [`RangeStats`] is always recomputed from scratch from its [`RangeParameters`]; it is
//! never updated incrementally. Variance is the **population** variance (divisor
//! `count`).
//!
//! ```rust
//! use rangesync::statistics::calculate_range_stats;
//!
//! let stats = calculate_range_stats(1.0, 100.0, 1.0);
//! assert_eq!(stats.count, 100);
//! assert_eq!(stats.sum, 5050.0);
//! assert_eq!(stats.average, 50.5);
//! assert_eq!(stats.min, Some(1.0));
//! assert_eq!(stats.max, Some(100.0));
//! ```

use crate::rangesync::sequence::RangeParameters;
use serde::{Deserialize, Deserializer, Serialize};

/// Read an `f64` that may have been written as `null`.
///
/// `serde_json` writes NaN and the infinities as `null`; reading them back as NaN keeps
/// one non-finite number from making a whole stored document unreadable.
pub(crate) fn nullable_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Statistics derived from one range.
///
/// `step` holds the normalized magnitude that was actually used. When the sequence
/// is empty `average` and `std_dev` are `0.0` and `min`/`max` are `None` (JSON `null`)
/// rather than NaN or infinities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeStats {
    #[serde(deserialize_with = "nullable_f64")]
    pub start: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub end: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub step: f64,
    pub count: u64,
    #[serde(deserialize_with = "nullable_f64")]
    pub sum: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub average: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    #[serde(deserialize_with = "nullable_f64")]
    pub std_dev: f64,
}

impl RangeStats {
    /// Compute statistics for `params`.
    ///
    /// The sequence is streamed twice (once for sum/min/max, once for the squared
    /// deviations) instead of being collected, so memory stays constant regardless
    /// of the range size.
    pub fn from_params(params: &RangeParameters) -> Self {
        let mut count: u64 = 0;
        let mut sum = 0.0;
        let mut min: Option<f64> = None;
        let mut max: Option<f64> = None;

        for value in params.sequence() {
            count += 1;
            sum += value;
            min = Some(min.map_or(value, |m| if value < m { value } else { m }));
            max = Some(max.map_or(value, |m| if value > m { value } else { m }));
        }

        let (average, variance) = if count > 0 {
            let average = sum / count as f64;
            let squared: f64 = params
                .sequence()
                .map(|value| (value - average).powi(2))
                .sum();
            (average, squared / count as f64)
        } else {
            (0.0, 0.0)
        };

        Self {
            start: params.start,
            end: params.end,
            step: params.effective_step(),
            count,
            sum,
            average,
            min,
            max,
            std_dev: variance.sqrt(),
        }
    }

    /// Population variance, recovered from the standard deviation.
    pub fn variance(&self) -> f64 {
        self.std_dev * self.std_dev
    }

    /// The parameters these statistics were computed from, with the normalized step.
    pub fn params(&self) -> RangeParameters {
        RangeParameters::new(self.start, self.end, self.step)
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Convenience wrapper around [`RangeStats::from_params`].
pub fn calculate_range_stats(start: f64, end: f64, step: f64) -> RangeStats {
    RangeStats::from_params(&RangeParameters::new(start, end, step))
}
