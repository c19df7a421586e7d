//! Intervention prioritization.
//!
//! Priority blends percentile ranks rather than raw values:
//!
//! ```text
//! priority = 0.5·rank(Risk) + 0.3·rank(1 − AC) + 0.2·rank(ln population)
//! ```
//!
//! Cities with unknown population rank lowest on the population term and
//! are flagged low confidence.

use serde::{Deserialize, Serialize};

use crate::config::{DataGapPolicy, PriorityWeights};
use crate::metrics::ClimateRiskMetrics;
use crate::stats::{percentile_ranks, quantile};

/// Action bucket from the roster's priority quantiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PriorityLabel {
    Low,
    Medium,
    High,
    Urgent,
}

impl PriorityLabel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Urgent => "Urgent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityEntry {
    pub city: String,
    pub priority: f64,
    pub risk_rank: f64,
    pub ac_gap_rank: f64,
    pub population_rank: f64,
    /// Built from composites with data gaps or an unknown population.
    pub low_confidence: bool,
    pub label: PriorityLabel,
}

/// Cities ordered by descending priority, ties by city name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriorityRanking {
    entries: Vec<PriorityEntry>,
}

impl PriorityRanking {
    pub fn entries(&self) -> &[PriorityEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, city: &str) -> Option<&PriorityEntry> {
        self.entries.iter().find(|e| e.city == city)
    }

    /// Zero-based rank position of a city.
    pub fn position(&self, city: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.city == city)
    }

    /// (city, priority) pairs in ranking order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|e| (e.city.as_str(), e.priority))
    }
}

fn ln_population(population: Option<f64>) -> f64 {
    match population {
        Some(p) if p.is_finite() && p > 0.0 => p.ln(),
        _ => f64::NEG_INFINITY,
    }
}

/// Label thresholds from the 20th/50th/80th percentiles of the scores.
fn bucket(priority: f64, q20: f64, q50: f64, q80: f64) -> PriorityLabel {
    if priority >= q80 {
        PriorityLabel::Urgent
    } else if priority >= q50 {
        PriorityLabel::High
    } else if priority >= q20 {
        PriorityLabel::Medium
    } else {
        PriorityLabel::Low
    }
}

/// Rank a roster for intervention.
///
/// Under [`DataGapPolicy::Suppress`] low-confidence cities are dropped
/// before ranking, so they do not influence the other cities' ranks.
pub fn rank_priorities<'a, I>(
    roster: I,
    weights: &PriorityWeights,
    policy: DataGapPolicy,
) -> PriorityRanking
where
    I: IntoIterator<Item = &'a ClimateRiskMetrics>,
{
    let cities: Vec<&ClimateRiskMetrics> = roster
        .into_iter()
        .filter(|m| policy == DataGapPolicy::Annotate || !m.is_low_confidence())
        .collect();
    if cities.is_empty() {
        return PriorityRanking::default();
    }

    let risk: Vec<f64> = cities.iter().map(|m| m.risk()).collect();
    let ac_gap: Vec<f64> = cities.iter().map(|m| 1.0 - m.adaptive_capacity()).collect();
    let log_pop: Vec<f64> = cities.iter().map(|m| ln_population(m.population())).collect();

    let risk_rank = percentile_ranks(&risk);
    let ac_gap_rank = percentile_ranks(&ac_gap);
    let population_rank = percentile_ranks(&log_pop);

    let scores: Vec<f64> = (0..cities.len())
        .map(|i| {
            weights.risk * risk_rank[i]
                + weights.ac_gap * ac_gap_rank[i]
                + weights.population * population_rank[i]
        })
        .collect();

    let q20 = quantile(&scores, 0.2).unwrap_or(0.0);
    let q50 = quantile(&scores, 0.5).unwrap_or(0.0);
    let q80 = quantile(&scores, 0.8).unwrap_or(0.0);

    let mut entries: Vec<PriorityEntry> = cities
        .iter()
        .enumerate()
        .map(|(i, m)| PriorityEntry {
            city: m.city().to_string(),
            priority: scores[i],
            risk_rank: risk_rank[i],
            ac_gap_rank: ac_gap_rank[i],
            population_rank: population_rank[i],
            low_confidence: m.is_low_confidence(),
            label: bucket(scores[i], q20, q50, q80),
        })
        .collect();

    entries.sort_by(|a, b| {
        b.priority
            .total_cmp(&a.priority)
            .then_with(|| a.city.cmp(&b.city))
    });

    PriorityRanking { entries }
}
