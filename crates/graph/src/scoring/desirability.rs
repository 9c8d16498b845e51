//! Desirability mapping used to colour scores

use super::measures::round_to;
use crate::errors::GraphError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Thresholds of a desirability mapping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DesirabilityBounds {
    pub mid: f64,
    pub upper: f64,
    /// Lower scores are better
    #[serde(default)]
    pub inverse: bool,
}

impl DesirabilityBounds {
    pub fn apply(&self, value: f64) -> f64 {
        desirability(value, self.mid, self.upper, self.inverse)
    }
}

/// Parses `mid,upper` or `mid,upper,inverse`
impl FromStr for DesirabilityBounds {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GraphError::InvalidOptions(format!("invalid desirability bounds {:?}", s));
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let (mid, upper, inverse) = match parts.as_slice() {
            [mid, upper] => (mid, upper, false),
            [mid, upper, "inverse"] => (mid, upper, true),
            _ => return Err(invalid()),
        };
        let mid: f64 = mid.parse().map_err(|_| invalid())?;
        let upper: f64 = upper.parse().map_err(|_| invalid())?;
        if !mid.is_finite() || !upper.is_finite() {
            return Err(invalid());
        }
        Ok(Self { mid, upper, inverse })
    }
}

/// Map a score onto (0, 1] relative to a midpoint and an upper threshold
///
/// The value is normalized to `(value - mid) / (upper - mid)` (mirrored when
/// `inverse`, for scores where lower is better) and passed through a
/// logistic curve. Values at or below the midpoint land in (0, 0.5], values
/// between the thresholds in (0.5, 1), values past the upper threshold at
/// 1.0. Rounded to 2 decimals.
pub fn desirability(value: f64, mid: f64, upper: f64, inverse: bool) -> f64 {
    let span = upper - mid;
    let offset = if inverse { upper - value } else { value - mid };
    let normalized = if span == 0.0 {
        // Degenerate thresholds: only the side of the midpoint matters
        if (inverse && value <= mid) || (!inverse && value >= mid) {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        }
    } else {
        offset / span
    };

    let logistic = 1.0 / (1.0 + (-2.0 * (normalized - 0.5)).exp());
    let mapped = if normalized <= 0.0 {
        0.5 * logistic
    } else if normalized < 1.0 {
        0.5 + 0.5 * logistic
    } else {
        1.0
    };
    round_to(mapped, 2)
}
