//! Engine configuration: composite weights, percentile cut points,
//! priority weights and the data-gap policy.
//!
//! Every weight table must sum to exactly 1.0 (within [`WEIGHT_TOLERANCE`]).
//! A bad table fails the run; weights are never renormalized.
//!
//! ```
//! use climrisk_logic::config::EngineConfig;
//!
//! let config = EngineConfig::default();
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::indicators::{CompositeKind, Indicator};

/// Allowed deviation of a weight sum from 1.0.
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

/// One term of a composite's weighted sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedIndicator {
    pub indicator: Indicator,
    pub weight: f64,
}

const fn w(indicator: Indicator, weight: f64) -> WeightedIndicator {
    WeightedIndicator { indicator, weight }
}

/// Weight tables for the four composites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeWeights {
    pub hazard: Vec<WeightedIndicator>,
    pub exposure: Vec<WeightedIndicator>,
    pub vulnerability: Vec<WeightedIndicator>,
    pub adaptive_capacity: Vec<WeightedIndicator>,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            hazard: vec![
                w(Indicator::Heat, 0.60),
                w(Indicator::Dry, 0.25),
                w(Indicator::Pluvial, 0.10),
                w(Indicator::Dust, 0.05),
            ],
            exposure: vec![
                w(Indicator::Population, 0.60),
                w(Indicator::Gdp, 0.25),
                w(Indicator::Viirs, 0.15),
            ],
            vulnerability: vec![
                w(Indicator::IncomeInv, 0.40),
                w(Indicator::VegAccess, 0.30),
                w(Indicator::Fragmentation, 0.20),
                w(Indicator::BioTrend, 0.10),
            ],
            adaptive_capacity: vec![
                w(Indicator::GdpPc, 0.50),
                w(Indicator::Greenspace, 0.30),
                w(Indicator::Services, 0.20),
            ],
        }
    }
}

impl CompositeWeights {
    pub fn for_kind(&self, kind: CompositeKind) -> &[WeightedIndicator] {
        match kind {
            CompositeKind::Hazard => &self.hazard,
            CompositeKind::Exposure => &self.exposure,
            CompositeKind::Vulnerability => &self.vulnerability,
            CompositeKind::AdaptiveCapacity => &self.adaptive_capacity,
        }
    }

    /// Check every table: members of the right group, no duplicates,
    /// finite non-negative weights, sum of 1.0.
    pub fn validate(&self) -> Result<(), EngineError> {
        for kind in CompositeKind::ALL {
            validate_table(kind, self.for_kind(kind))?;
        }
        Ok(())
    }
}

fn validate_table(kind: CompositeKind, table: &[WeightedIndicator]) -> Result<(), EngineError> {
    let invalid = |reason: String| EngineError::InvalidWeightConfiguration {
        composite: kind.name().to_string(),
        reason,
    };

    if table.is_empty() {
        return Err(invalid("no indicators declared".into()));
    }
    for (i, term) in table.iter().enumerate() {
        if term.indicator.composite() != kind {
            return Err(invalid(format!(
                "{} belongs to {}",
                term.indicator,
                term.indicator.composite().name()
            )));
        }
        if table[..i].iter().any(|t| t.indicator == term.indicator) {
            return Err(invalid(format!("{} listed twice", term.indicator)));
        }
        if !term.weight.is_finite() || term.weight < 0.0 {
            return Err(invalid(format!(
                "{} has weight {}",
                term.indicator, term.weight
            )));
        }
    }

    let sum: f64 = table.iter().map(|t| t.weight).sum();
    if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(invalid(format!("weights sum to {sum}, expected 1.0")));
    }
    Ok(())
}

/// Blend weights for the prioritizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityWeights {
    pub risk: f64,
    pub ac_gap: f64,
    pub population: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            risk: 0.5,
            ac_gap: 0.3,
            population: 0.2,
        }
    }
}

impl PriorityWeights {
    pub fn sum(&self) -> f64 {
        self.risk + self.ac_gap + self.population
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |reason: String| EngineError::InvalidWeightConfiguration {
            composite: "priority".into(),
            reason,
        };
        for (name, v) in [
            ("risk", self.risk),
            ("ac_gap", self.ac_gap),
            ("population", self.population),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(invalid(format!("{name} has weight {v}")));
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(invalid(format!("weights sum to {sum}, expected 1.0")));
        }
        Ok(())
    }
}

/// What the prioritizer does with cities whose composites carry data gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataGapPolicy {
    /// Rank them and flag the entry as low confidence.
    #[default]
    Annotate,
    /// Leave them out of the ranking.
    Suppress,
}

/// Full engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Raw value at this quantile normalizes to 0.
    pub percentile_lower: f64,
    /// Raw value at this quantile normalizes to 1.
    pub percentile_upper: f64,
    pub weights: CompositeWeights,
    pub priority: PriorityWeights,
    pub data_gap_policy: DataGapPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            percentile_lower: 0.10,
            percentile_upper: 0.90,
            weights: CompositeWeights::default(),
            priority: PriorityWeights::default(),
            data_gap_policy: DataGapPolicy::Annotate,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        validate_percentiles(self.percentile_lower, self.percentile_upper)?;
        self.weights.validate()?;
        self.priority.validate()
    }
}

pub(crate) fn validate_percentiles(lower: f64, upper: f64) -> Result<(), EngineError> {
    if !(0.0..=1.0).contains(&lower) || !(0.0..=1.0).contains(&upper) || lower >= upper {
        return Err(EngineError::InvalidPercentileBounds { lower, upper });
    }
    Ok(())
}
