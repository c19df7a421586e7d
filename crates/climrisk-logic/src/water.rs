//! Water-scarcity sub-score.
//!
//! Reported next to the H/E/V/AC pipeline and never folded into Risk
//! automatically. Cities where basin-scale water stress should raise risk get
//! an explicit entry in the regional correction table instead.
//!
//! ```text
//! supply_risk = 0.60·supply_indicators + 0.40·surface_water_change
//! demand_risk = 0.70·cropland_demand   + 0.30·population_pressure
//! score       = 0.60·supply_risk       + 0.40·demand_risk
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::composites::unit;
use crate::stats::{mean, quantile};

/// Water-scarcity inputs, each already scaled to [0,1] (higher = worse).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterScarcityInputs {
    /// Hydroclimate supply stress (aridity, deficit, drought).
    pub supply_indicators: f64,
    /// Surface-water loss.
    pub surface_water_change: f64,
    /// Irrigation demand from cropland.
    pub cropland_demand: f64,
    /// Demand from population density.
    pub population_pressure: f64,
}

/// Raw hydroclimate observations for one city.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HydroclimateObservations {
    /// Aridity index P/PET (lower = drier).
    pub aridity_index: f64,
    /// Climatic water deficit (mm/year).
    pub climatic_water_deficit_mm: f64,
    /// Fraction of months in severe drought.
    pub drought_frequency: f64,
    /// Surface-water change in percentage points (negative = loss).
    pub surface_water_change_pct: f64,
    /// Cropland fraction of the surrounding area (0–1).
    pub cropland_fraction: f64,
    /// Population density (people/km²).
    pub population_density: f64,
}

/// Deficit at which the climatic-water-deficit term saturates.
const CWD_SATURATION_MM: f64 = 1000.0;
/// Surface-water loss (percentage points) at which the change term saturates.
const SURFACE_WATER_SATURATION_PCT: f64 = 100.0;
/// Density (people/km²) at which population pressure saturates.
const DENSITY_SATURATION: f64 = 300.0;

impl HydroclimateObservations {
    pub fn to_inputs(&self) -> WaterScarcityInputs {
        let supply_terms = [
            unit(1.0 - self.aridity_index),
            unit(self.climatic_water_deficit_mm / CWD_SATURATION_MM),
            unit(self.drought_frequency),
        ];
        WaterScarcityInputs {
            supply_indicators: mean(&supply_terms).unwrap_or(0.0),
            surface_water_change: unit(-self.surface_water_change_pct / SURFACE_WATER_SATURATION_PCT),
            cropland_demand: unit(self.cropland_fraction),
            population_pressure: unit(self.population_density / DENSITY_SATURATION),
        }
    }
}

/// Either pre-scaled inputs or raw observations, as supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WaterScarcitySource {
    Inputs(WaterScarcityInputs),
    Observations(HydroclimateObservations),
}

impl WaterScarcitySource {
    pub fn inputs(&self) -> WaterScarcityInputs {
        match self {
            WaterScarcitySource::Inputs(i) => *i,
            WaterScarcitySource::Observations(o) => o.to_inputs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WaterScarcityLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl WaterScarcityLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.7 {
            Self::Critical
        } else if score >= 0.5 {
            Self::High
        } else if score >= 0.3 {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterScarcityScore {
    pub supply_risk: f64,
    pub demand_risk: f64,
    pub score: f64,
    pub level: WaterScarcityLevel,
}

/// Compute the sub-score. Inputs outside [0,1] are clipped first.
pub fn assess_water_scarcity(inputs: &WaterScarcityInputs) -> WaterScarcityScore {
    let supply_risk =
        0.60 * unit(inputs.supply_indicators) + 0.40 * unit(inputs.surface_water_change);
    let demand_risk =
        0.70 * unit(inputs.cropland_demand) + 0.30 * unit(inputs.population_pressure);
    let score = unit(0.60 * supply_risk + 0.40 * demand_risk);
    WaterScarcityScore {
        supply_risk,
        demand_risk,
        score,
        level: WaterScarcityLevel::from_score(score),
    }
}

/// Roster-level overview of water-scarcity scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterScarcitySummary {
    pub total_cities: usize,
    pub mean_score: f64,
    pub median_score: f64,
    pub min_score: f64,
    pub max_score: f64,
    pub level_counts: BTreeMap<WaterScarcityLevel, usize>,
    pub most_stressed: String,
    pub least_stressed: String,
    /// Highest scores first, ties by city name.
    pub top: Vec<(String, f64, WaterScarcityLevel)>,
}

/// Summarize scores. `None` when there are no scores.
pub fn summarize<'a, I>(scores: I, top_n: usize) -> Option<WaterScarcitySummary>
where
    I: IntoIterator<Item = (&'a str, &'a WaterScarcityScore)>,
{
    let mut ordered: Vec<(&str, &WaterScarcityScore)> = scores.into_iter().collect();
    if ordered.is_empty() {
        return None;
    }
    ordered.sort_by(|a, b| b.1.score.total_cmp(&a.1.score).then_with(|| a.0.cmp(b.0)));

    let values: Vec<f64> = ordered.iter().map(|(_, s)| s.score).collect();
    let mut level_counts = BTreeMap::new();
    for (_, s) in &ordered {
        *level_counts.entry(s.level).or_insert(0) += 1;
    }

    let (most, most_score) = ordered[0];
    let (least, least_score) = ordered[ordered.len() - 1];
    Some(WaterScarcitySummary {
        total_cities: ordered.len(),
        mean_score: mean(&values)?,
        median_score: quantile(&values, 0.5)?,
        min_score: least_score.score,
        max_score: most_score.score,
        level_counts,
        most_stressed: most.to_string(),
        least_stressed: least.to_string(),
        top: ordered
            .iter()
            .take(top_n)
            .map(|(c, s)| (c.to_string(), s.score, s.level))
            .collect(),
    })
}
