//! End-to-end assessment run.
//!
//! Order of operations:
//!
//! 1. Validate the configuration (and correction table, if any)
//! 2. Freeze percentile bounds over the whole roster
//! 3. Normalize each city and aggregate its composites
//! 4. Attach water-scarcity sub-scores
//! 5. Apply the regional correction table once
//! 6. Rank for intervention
//! 7. Summarize
//!
//! Nothing is computed if step 1 fails.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::corrections::{apply_table, CorrectionTable};
use crate::error::{AuditEvent, EngineError};
use crate::indicators::RawIndicatorSet;
use crate::metrics::{CityClimateProfile, ClimateRiskMetrics};
use crate::normalize::FrozenBounds;
use crate::priority::{rank_priorities, PriorityRanking};
use crate::risk::RiskCategory;
use crate::stats::Distribution;
use crate::water::{self, assess_water_scarcity, WaterScarcitySource, WaterScarcitySummary};

/// Cities listed in the water-scarcity summary's top list.
pub const WATER_SUMMARY_TOP_N: usize = 5;

/// One city's raw data as handed over by the ingestion side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CityInput {
    pub indicators: RawIndicatorSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water: Option<WaterScarcitySource>,
}

/// The roster, keyed by city name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentInput {
    pub cities: BTreeMap<String, CityInput>,
}

impl AssessmentInput {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builder-style insert of a city without water data.
    pub fn with_city(mut self, city: &str, indicators: RawIndicatorSet) -> Self {
        self.cities.insert(
            city.to_string(),
            CityInput {
                indicators,
                water: None,
            },
        );
        self
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

/// Roster-wide distribution of the headline scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentSummary {
    pub city_count: usize,
    pub low_confidence_count: usize,
    pub adaptive_capacity: Distribution,
    pub risk: Distribution,
    /// `None` when every city was suppressed from the ranking.
    pub priority: Option<Distribution>,
    pub risk_categories: BTreeMap<RiskCategory, usize>,
}

impl AssessmentSummary {
    fn of(
        metrics: &BTreeMap<String, ClimateRiskMetrics>,
        ranking: &PriorityRanking,
    ) -> Result<Self, EngineError> {
        let ac: Vec<f64> = metrics.values().map(|m| m.adaptive_capacity()).collect();
        let risk: Vec<f64> = metrics.values().map(|m| m.risk()).collect();
        let priority: Vec<f64> = ranking.pairs().map(|(_, p)| p).collect();

        let mut risk_categories = BTreeMap::new();
        for m in metrics.values() {
            *risk_categories.entry(m.risk_category()).or_insert(0) += 1;
        }

        Ok(Self {
            city_count: metrics.len(),
            low_confidence_count: metrics.values().filter(|m| m.is_low_confidence()).count(),
            adaptive_capacity: Distribution::of(&ac).ok_or(EngineError::EmptyRoster)?,
            risk: Distribution::of(&risk).ok_or(EngineError::EmptyRoster)?,
            priority: Distribution::of(&priority),
            risk_categories,
        })
    }
}

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentReport {
    pub metrics: BTreeMap<String, ClimateRiskMetrics>,
    pub ranking: PriorityRanking,
    pub bounds: FrozenBounds,
    /// Recoverable conditions in emission order.
    pub audit: Vec<AuditEvent>,
    pub summary: AssessmentSummary,
    pub water_summary: Option<WaterScarcitySummary>,
    pub correction_version: Option<String>,
}

impl AssessmentReport {
    pub fn get(&self, city: &str) -> Option<&ClimateRiskMetrics> {
        self.metrics.get(city)
    }

    pub fn low_confidence_cities(&self) -> impl Iterator<Item = &str> + '_ {
        self.metrics
            .values()
            .filter(|m| m.is_low_confidence())
            .map(|m| m.city())
    }

    /// Audit events concerning one city.
    pub fn audit_for<'a>(&'a self, city: &'a str) -> impl Iterator<Item = &'a AuditEvent> {
        self.audit.iter().filter(move |e| e.city() == Some(city))
    }

    pub fn to_json_pretty(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Run the full pipeline over a roster.
pub fn run_assessment(
    input: &AssessmentInput,
    config: &EngineConfig,
    corrections: Option<&CorrectionTable>,
) -> Result<AssessmentReport, EngineError> {
    config.validate()?;
    if let Some(table) = corrections {
        table.validate()?;
    }
    if input.is_empty() {
        return Err(EngineError::EmptyRoster);
    }
    log::info!("Assessing {} cities", input.len());

    let (bounds, mut audit) = FrozenBounds::freeze(
        input.cities.values().map(|c| &c.indicators),
        config.percentile_lower,
        config.percentile_upper,
    )?;

    let mut metrics = BTreeMap::new();
    for (city, data) in &input.cities {
        let (profile, events) = CityClimateProfile::build(city, &data.indicators, &bounds);
        audit.extend(events);
        let mut m = ClimateRiskMetrics::from_profile(&profile, &config.weights);
        if let Some(source) = &data.water {
            m.set_water_scarcity(assess_water_scarcity(&source.inputs()));
        }
        metrics.insert(city.clone(), m);
    }

    if let Some(table) = corrections {
        audit.extend(apply_table(&mut metrics, table)?);
    }

    let ranking = rank_priorities(metrics.values(), &config.priority, config.data_gap_policy);
    for entry in ranking.entries() {
        if let Some(m) = metrics.get_mut(&entry.city) {
            m.set_priority(entry.priority);
        }
    }

    let summary = AssessmentSummary::of(&metrics, &ranking)?;
    let water_summary = water::summarize(
        metrics
            .iter()
            .filter_map(|(city, m)| m.water_scarcity().map(|s| (city.as_str(), s))),
        WATER_SUMMARY_TOP_N,
    );

    log::info!(
        "Assessment complete: {} cities, {} low confidence",
        summary.city_count,
        summary.low_confidence_count
    );

    Ok(AssessmentReport {
        metrics,
        ranking,
        bounds,
        audit,
        summary,
        water_summary,
        correction_version: corrections.map(|t| t.version.clone()),
    })
}
