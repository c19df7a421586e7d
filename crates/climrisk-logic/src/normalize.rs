//! Percentile normalization. Rescales each raw indicator across the roster
//! into a bounded [0,1] score.
//!
//! Normalization runs in two phases:
//! 1. [`FrozenBounds::freeze`] reads every city's value for every indicator
//!    and fixes the lower/upper percentile bounds.
//! 2. [`FrozenBounds::normalize`] maps one city's raw values through those
//!    bounds. Bounds never change after phase 1, so per-city work is
//!    order-independent and reproducible.
//!
//! Scaling rules for a raw value `x` with bounds `lo`/`hi`:
//! - `lo == hi` (no spread, including a single observation): 0.5 for every
//!   city, recorded as [`AuditEvent::DegenerateNormalization`].
//! - otherwise `clip((x - lo) / (hi - lo), 0, 1)`, flipped to `1 - z` for
//!   inverted indicators.
//! - missing values are never filled; they are reported as
//!   [`AuditEvent::MissingIndicator`] and left out of the normalized set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::validate_percentiles;
use crate::error::{AuditEvent, EngineError};
use crate::indicators::{Indicator, NormalizedIndicatorSet, Orientation, RawIndicatorSet};
use crate::stats::{quantile_sorted, sorted_finite};

/// Neutral score for an indicator with no spread across the roster.
pub const DEGENERATE_SCORE: f64 = 0.5;

/// Percentile bounds of one indicator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorBounds {
    pub lower: f64,
    pub upper: f64,
    /// Number of cities that had a value.
    pub observations: usize,
}

impl IndicatorBounds {
    pub fn is_degenerate(&self) -> bool {
        self.upper <= self.lower
    }

    /// Map a raw value to [0,1].
    pub fn scale(&self, x: f64, orientation: Orientation) -> f64 {
        if self.is_degenerate() {
            return DEGENERATE_SCORE;
        }
        let z = ((x - self.lower) / (self.upper - self.lower)).clamp(0.0, 1.0);
        match orientation {
            Orientation::Direct => z,
            Orientation::Inverted => 1.0 - z,
        }
    }
}

/// Bounds for every observed indicator, fixed over the whole roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenBounds {
    pub percentile_lower: f64,
    pub percentile_upper: f64,
    bounds: BTreeMap<Indicator, IndicatorBounds>,
}

impl FrozenBounds {
    /// Phase 1: compute bounds from the full roster.
    ///
    /// Returns the bounds plus audit events for indicators with no spread or
    /// no observations at all.
    pub fn freeze<'a, I>(
        roster: I,
        percentile_lower: f64,
        percentile_upper: f64,
    ) -> Result<(Self, Vec<AuditEvent>), EngineError>
    where
        I: IntoIterator<Item = &'a RawIndicatorSet>,
    {
        validate_percentiles(percentile_lower, percentile_upper)?;

        let roster: Vec<&RawIndicatorSet> = roster.into_iter().collect();
        let mut bounds = BTreeMap::new();
        let mut audit = Vec::new();

        for indicator in Indicator::ALL {
            let sorted = sorted_finite(roster.iter().filter_map(|raw| raw.get(indicator)));
            let (Some(lower), Some(upper)) = (
                quantile_sorted(&sorted, percentile_lower),
                quantile_sorted(&sorted, percentile_upper),
            ) else {
                log::warn!("No observations for indicator {}", indicator);
                audit.push(AuditEvent::NoObservations { indicator });
                continue;
            };

            let b = IndicatorBounds {
                lower,
                upper,
                observations: sorted.len(),
            };
            if b.is_degenerate() {
                log::warn!(
                    "Degenerate normalization for {}: all percentiles at {:.4}, using {}",
                    indicator,
                    lower,
                    DEGENERATE_SCORE
                );
                audit.push(AuditEvent::DegenerateNormalization {
                    indicator,
                    value: lower,
                });
            }
            bounds.insert(indicator, b);
        }

        Ok((
            Self {
                percentile_lower,
                percentile_upper,
                bounds,
            },
            audit,
        ))
    }

    pub fn get(&self, indicator: Indicator) -> Option<&IndicatorBounds> {
        self.bounds.get(&indicator)
    }

    /// Phase 2: normalize one city's raw values.
    pub fn normalize(
        &self,
        city: &str,
        raw: &RawIndicatorSet,
    ) -> (NormalizedIndicatorSet, Vec<AuditEvent>) {
        let mut normalized = NormalizedIndicatorSet::default();
        let mut audit = Vec::new();

        for indicator in Indicator::ALL {
            match (raw.get(indicator), self.bounds.get(&indicator)) {
                (Some(x), Some(b)) => {
                    normalized.insert(indicator, b.scale(x, indicator.orientation()));
                }
                _ => {
                    log::debug!("{}: missing indicator {}", city, indicator);
                    audit.push(AuditEvent::MissingIndicator {
                        city: city.to_string(),
                        indicator,
                    });
                }
            }
        }

        (normalized, audit)
    }
}
