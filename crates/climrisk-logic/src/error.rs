//! Error taxonomy for the engine.
//!
//! Fatal conditions ([`EngineError`]) abort the run. Recoverable ones
//! ([`AuditEvent`]) are handled locally (data-gap flag, neutral fallback)
//! and recorded in the report's audit log.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::corrections::CorrectionTarget;
use crate::indicators::Indicator;

/// Conditions that abort an assessment run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A composite's weight table does not sum to 1.0 or names foreign indicators.
    #[error("invalid weight configuration for {composite}: {reason}")]
    InvalidWeightConfiguration { composite: String, reason: String },

    /// A correction rule (or a whole correction pass) hit an already-corrected profile.
    #[error("correction {rule} already applied to {city}")]
    DoubleCorrectionApplied { city: String, rule: String },

    /// The correction table failed validation.
    #[error("invalid correction table: {0}")]
    InvalidCorrectionTable(String),

    /// Percentile cut points outside `0 <= lower < upper <= 1`.
    #[error("invalid percentile bounds: lower={lower}, upper={upper}")]
    InvalidPercentileBounds { lower: f64, upper: f64 },

    /// No cities to assess.
    #[error("assessment roster is empty")]
    EmptyRoster,

    #[error(transparent)]
    Parse(#[from] serde_json::Error),
}

/// Recoverable conditions recorded during a run, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Raw value absent (or non-finite) for a city; the composite carries a data gap.
    MissingIndicator { city: String, indicator: Indicator },
    /// p_lower == p_upper; every city received the neutral 0.5.
    DegenerateNormalization { indicator: Indicator, value: f64 },
    /// No city has a value for this indicator.
    NoObservations { indicator: Indicator },
    /// A regional correction changed a composite.
    CorrectionApplied {
        city: String,
        rule: String,
        target: CorrectionTarget,
        before: f64,
        after: f64,
    },
    /// A correction rule names a city that is not in the roster.
    CorrectionCityNotInRoster { rule: String, city: String },
}

impl AuditEvent {
    /// City this event concerns, if it is city-specific.
    pub fn city(&self) -> Option<&str> {
        match self {
            AuditEvent::MissingIndicator { city, .. }
            | AuditEvent::CorrectionApplied { city, .. }
            | AuditEvent::CorrectionCityNotInRoster { city, .. } => Some(city),
            AuditEvent::DegenerateNormalization { .. } | AuditEvent::NoObservations { .. } => None,
        }
    }
}
