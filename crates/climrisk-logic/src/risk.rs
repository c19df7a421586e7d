//! Risk combination law and category labels.
//!
//! Risk is multiplicative: a city with zero hazard, zero exposure or zero
//! vulnerability has zero realized risk. Adaptability discounts adaptive
//! capacity by risk, so high risk suppresses effective capacity.

use serde::{Deserialize, Serialize};

/// Risk = H × E × V. In [0,1] whenever the inputs are.
pub fn combine_risk(hazard: f64, exposure: f64, vulnerability: f64) -> f64 {
    hazard * exposure * vulnerability
}

/// Adaptability = AC / (1 + Risk). Equals AC at zero risk, strictly
/// decreasing in risk for AC > 0.
pub fn adaptability(adaptive_capacity: f64, risk: f64) -> f64 {
    adaptive_capacity / (1.0 + risk)
}

/// Canonical risk buckets used by every report surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    /// Risk < 0.2
    Low,
    /// 0.2 ≤ Risk < 0.4
    Medium,
    /// 0.4 ≤ Risk < 0.6
    High,
    /// Risk ≥ 0.6
    VeryHigh,
}

impl RiskCategory {
    pub fn from_risk(risk: f64) -> Self {
        if risk < 0.2 {
            Self::Low
        } else if risk < 0.4 {
            Self::Medium
        } else if risk < 0.6 {
            Self::High
        } else {
            Self::VeryHigh
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::Medium => "Medium Risk",
            Self::High => "High Risk",
            Self::VeryHigh => "Very High Risk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AdaptabilityLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl AdaptabilityLevel {
    pub fn from_score(score: f64) -> Self {
        if score > 0.7 {
            Self::VeryHigh
        } else if score > 0.5 {
            Self::High
        } else if score > 0.3 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::VeryHigh => "Very High",
        }
    }
}
