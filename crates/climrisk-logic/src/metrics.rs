//! City profiles and per-city risk metrics.
//!
//! [`ClimateRiskMetrics`] keeps Risk and Adaptability consistent with its
//! composites: they are private and recomputed on every write to a
//! composite, so `risk == hazard · exposure · vulnerability` holds for the
//! record's whole lifetime, including after a regional correction.

use serde::Serialize;

use crate::composites::{CompositeScore, Composites};
use crate::config::CompositeWeights;
use crate::corrections::{AppliedCorrection, CorrectionTarget};
use crate::indicators::{CompositeKind, Indicator, NormalizedIndicatorSet, RawIndicatorSet};
use crate::normalize::FrozenBounds;
use crate::risk::{adaptability, combine_risk, AdaptabilityLevel, RiskCategory};
use crate::water::WaterScarcityScore;
use crate::AuditEvent;

/// A city's normalized indicators. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityClimateProfile {
    city: String,
    population: Option<f64>,
    indicators: NormalizedIndicatorSet,
}

impl CityClimateProfile {
    /// Normalize one city through frozen bounds.
    pub fn build(
        city: &str,
        raw: &RawIndicatorSet,
        bounds: &FrozenBounds,
    ) -> (Self, Vec<AuditEvent>) {
        let (indicators, audit) = bounds.normalize(city, raw);
        (
            Self {
                city: city.to_string(),
                population: raw.get(Indicator::Population),
                indicators,
            },
            audit,
        )
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    /// Raw resident population, kept for the prioritizer's log scaling.
    pub fn population(&self) -> Option<f64> {
        self.population
    }

    pub fn indicators(&self) -> &NormalizedIndicatorSet {
        &self.indicators
    }
}

/// Risk metrics of one city.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimateRiskMetrics {
    city: String,
    population: Option<f64>,
    indicators: NormalizedIndicatorSet,
    composites: Composites,
    risk: f64,
    adaptability: f64,
    water_scarcity: Option<WaterScarcityScore>,
    priority: Option<f64>,
    correction_version: Option<String>,
    corrections: Vec<AppliedCorrection>,
}

impl ClimateRiskMetrics {
    /// Aggregate a profile's composites and derive Risk/Adaptability.
    pub fn from_profile(profile: &CityClimateProfile, weights: &CompositeWeights) -> Self {
        let composites = Composites::aggregate_all(weights, &profile.indicators);
        Self::assemble(
            profile.city.clone(),
            profile.population,
            profile.indicators.clone(),
            composites,
        )
    }

    /// Build directly from composite values, e.g. for scenario analysis.
    /// Values are clamped into [0,1].
    pub fn from_composites(
        city: &str,
        population: Option<f64>,
        hazard: f64,
        exposure: f64,
        vulnerability: f64,
        adaptive_capacity: f64,
    ) -> Self {
        let composites = Composites {
            hazard: CompositeScore::complete(hazard),
            exposure: CompositeScore::complete(exposure),
            vulnerability: CompositeScore::complete(vulnerability),
            adaptive_capacity: CompositeScore::complete(adaptive_capacity),
        };
        Self::assemble(
            city.to_string(),
            population,
            NormalizedIndicatorSet::default(),
            composites,
        )
    }

    fn assemble(
        city: String,
        population: Option<f64>,
        indicators: NormalizedIndicatorSet,
        composites: Composites,
    ) -> Self {
        let mut m = Self {
            city,
            population,
            indicators,
            composites,
            risk: 0.0,
            adaptability: 0.0,
            water_scarcity: None,
            priority: None,
            correction_version: None,
            corrections: Vec::new(),
        };
        m.recompute();
        m
    }

    fn recompute(&mut self) {
        self.risk = combine_risk(
            self.composites.hazard.value,
            self.composites.exposure.value,
            self.composites.vulnerability.value,
        );
        self.adaptability = adaptability(self.composites.adaptive_capacity.value, self.risk);
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn population(&self) -> Option<f64> {
        self.population
    }

    /// Normalized sub-indicators the composites were built from.
    pub fn indicators(&self) -> &NormalizedIndicatorSet {
        &self.indicators
    }

    pub fn composites(&self) -> &Composites {
        &self.composites
    }

    pub fn composite(&self, kind: CompositeKind) -> &CompositeScore {
        self.composites.get(kind)
    }

    pub fn hazard(&self) -> f64 {
        self.composites.hazard.value
    }

    pub fn exposure(&self) -> f64 {
        self.composites.exposure.value
    }

    pub fn vulnerability(&self) -> f64 {
        self.composites.vulnerability.value
    }

    pub fn adaptive_capacity(&self) -> f64 {
        self.composites.adaptive_capacity.value
    }

    pub fn risk(&self) -> f64 {
        self.risk
    }

    pub fn adaptability(&self) -> f64 {
        self.adaptability
    }

    pub fn risk_category(&self) -> RiskCategory {
        RiskCategory::from_risk(self.risk)
    }

    pub fn adaptability_level(&self) -> AdaptabilityLevel {
        AdaptabilityLevel::from_score(self.adaptability)
    }

    pub fn water_scarcity(&self) -> Option<&WaterScarcityScore> {
        self.water_scarcity.as_ref()
    }

    /// `None` until prioritized, or when suppressed from the ranking.
    pub fn priority(&self) -> Option<f64> {
        self.priority
    }

    /// Version of the correction table applied to this record, if any.
    pub fn correction_version(&self) -> Option<&str> {
        self.correction_version.as_deref()
    }

    pub fn corrections(&self) -> &[AppliedCorrection] {
        &self.corrections
    }

    /// Any composite is missing sub-indicators, or population is unknown.
    pub fn is_low_confidence(&self) -> bool {
        self.composites.has_data_gap() || self.population.is_none()
    }

    pub(crate) fn set_water_scarcity(&mut self, score: WaterScarcityScore) {
        self.water_scarcity = Some(score);
    }

    pub(crate) fn set_priority(&mut self, priority: f64) {
        self.priority = Some(priority);
    }

    pub(crate) fn mark_corrected(&mut self, version: &str) {
        self.correction_version = Some(version.to_string());
    }

    pub(crate) fn has_correction(&self, rule_id: &str) -> bool {
        self.corrections.iter().any(|c| c.rule_id == rule_id)
    }

    /// Add `delta` to a composite, clip, recompute dependents.
    /// Returns the (before, after) composite values.
    pub(crate) fn shift_composite(&mut self, target: CorrectionTarget, delta: f64) -> (f64, f64) {
        let score = self.composites.get_mut(target.composite());
        let before = score.value;
        score.set_value(before + delta);
        let after = score.value;
        self.recompute();
        (before, after)
    }

    pub(crate) fn record_correction(&mut self, applied: AppliedCorrection) {
        self.corrections.push(applied);
    }
}
