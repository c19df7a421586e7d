//! Composite aggregation: weighted sums of normalized sub-indicators.
//!
//! Every term is in [0,1] and every weight table sums to 1.0, so each
//! composite is in [0,1]. A missing sub-indicator contributes nothing to
//! the sum and is listed on the composite as a data gap.

use serde::Serialize;

use crate::config::{CompositeWeights, WeightedIndicator};
use crate::indicators::{CompositeKind, Indicator, NormalizedIndicatorSet};

/// One composite value plus the sub-indicators it had to go without.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeScore {
    pub value: f64,
    /// Sub-indicators missing for this city. Non-empty means a data gap.
    pub missing: Vec<Indicator>,
}

impl CompositeScore {
    /// A composite with no gaps. The value is clamped into [0,1].
    pub fn complete(value: f64) -> Self {
        Self {
            value: unit(value),
            missing: Vec::new(),
        }
    }

    pub fn has_data_gap(&self) -> bool {
        !self.missing.is_empty()
    }

    pub(crate) fn set_value(&mut self, value: f64) {
        self.value = unit(value);
    }
}

/// Clamp into [0,1]; NaN becomes 0.
pub(crate) fn unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Weighted sum of one composite's sub-indicators.
///
/// Weights are expected to be validated already (see
/// [`CompositeWeights::validate`]).
pub fn aggregate(table: &[WeightedIndicator], normalized: &NormalizedIndicatorSet) -> CompositeScore {
    let mut value = 0.0;
    let mut missing = Vec::new();
    for term in table {
        match normalized.get(term.indicator) {
            Some(v) => value += term.weight * v,
            None => missing.push(term.indicator),
        }
    }
    CompositeScore {
        value: unit(value),
        missing,
    }
}

/// The four composites of one city.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Composites {
    pub hazard: CompositeScore,
    pub exposure: CompositeScore,
    pub vulnerability: CompositeScore,
    pub adaptive_capacity: CompositeScore,
}

impl Composites {
    pub fn aggregate_all(weights: &CompositeWeights, normalized: &NormalizedIndicatorSet) -> Self {
        Self {
            hazard: aggregate(&weights.hazard, normalized),
            exposure: aggregate(&weights.exposure, normalized),
            vulnerability: aggregate(&weights.vulnerability, normalized),
            adaptive_capacity: aggregate(&weights.adaptive_capacity, normalized),
        }
    }

    pub fn get(&self, kind: CompositeKind) -> &CompositeScore {
        match kind {
            CompositeKind::Hazard => &self.hazard,
            CompositeKind::Exposure => &self.exposure,
            CompositeKind::Vulnerability => &self.vulnerability,
            CompositeKind::AdaptiveCapacity => &self.adaptive_capacity,
        }
    }

    pub(crate) fn get_mut(&mut self, kind: CompositeKind) -> &mut CompositeScore {
        match kind {
            CompositeKind::Hazard => &mut self.hazard,
            CompositeKind::Exposure => &mut self.exposure,
            CompositeKind::Vulnerability => &mut self.vulnerability,
            CompositeKind::AdaptiveCapacity => &mut self.adaptive_capacity,
        }
    }

    pub fn has_data_gap(&self) -> bool {
        CompositeKind::ALL.iter().any(|&k| self.get(k).has_data_gap())
    }
}
