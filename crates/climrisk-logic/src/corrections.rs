//! Regional corrections: documented, city-specific additive adjustments.
//!
//! Covers hazards with no satellite indicator, such as basin-scale water
//! scarcity. A versioned table lists each adjustment with its city, target
//! composite, delta and justification.
//!
//! A correction pass tags every profile it visits with the table version.
//! A second pass over a tagged profile, or a rule applied twice to the same
//! profile, fails with [`EngineError::DoubleCorrectionApplied`].
//!
//! ```
//! use climrisk_logic::corrections::CorrectionTable;
//!
//! let table = CorrectionTable::from_json(r#"{
//!     "version": "2024.1",
//!     "rules": [{
//!         "id": "nukus-aral-water-stress",
//!         "city": "Nukus",
//!         "target": "vulnerability",
//!         "delta": 0.35,
//!         "justification": "Aral Sea basin water scarcity"
//!     }]
//! }"#).unwrap();
//! assert_eq!(table.rules_for("Nukus").count(), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{AuditEvent, EngineError};
use crate::indicators::CompositeKind;
use crate::metrics::ClimateRiskMetrics;

/// Composite a correction may raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionTarget {
    Hazard,
    Vulnerability,
}

impl CorrectionTarget {
    pub fn composite(self) -> CompositeKind {
        match self {
            CorrectionTarget::Hazard => CompositeKind::Hazard,
            CorrectionTarget::Vulnerability => CompositeKind::Vulnerability,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalCorrectionRule {
    /// Stable identifier, unique within a table.
    pub id: String,
    pub city: String,
    pub target: CorrectionTarget,
    /// Added to the target composite before re-clipping to [0,1].
    pub delta: f64,
    pub justification: String,
}

/// Record of one applied rule, kept on the corrected metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedCorrection {
    pub rule_id: String,
    pub target: CorrectionTarget,
    pub delta: f64,
    pub before: f64,
    pub after: f64,
    pub justification: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionTable {
    pub version: String,
    pub rules: Vec<RegionalCorrectionRule>,
}

impl CorrectionTable {
    /// Parse and validate a table.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.version.trim().is_empty() {
            return Err(EngineError::InvalidCorrectionTable(
                "table version is empty".into(),
            ));
        }
        let mut ids = BTreeSet::new();
        for rule in &self.rules {
            let bad = |what: &str| {
                EngineError::InvalidCorrectionTable(format!("rule {:?}: {}", rule.id, what))
            };
            if rule.id.trim().is_empty() {
                return Err(bad("empty id"));
            }
            if !ids.insert(rule.id.as_str()) {
                return Err(bad("duplicate id"));
            }
            if rule.city.trim().is_empty() {
                return Err(bad("empty city"));
            }
            if rule.justification.trim().is_empty() {
                return Err(bad("missing justification"));
            }
            if !rule.delta.is_finite() || rule.delta <= 0.0 || rule.delta > 1.0 {
                return Err(bad(&format!("delta {} not in (0, 1]", rule.delta)));
            }
        }
        Ok(())
    }

    pub fn rules_for<'a>(&'a self, city: &'a str) -> impl Iterator<Item = &'a RegionalCorrectionRule> {
        self.rules.iter().filter(move |r| r.city == city)
    }
}

/// Apply a single rule to one city's metrics.
///
/// Fails if the rule was already applied, or if a table pass has already
/// tagged the record.
pub fn apply_rule(
    metrics: &mut ClimateRiskMetrics,
    rule: &RegionalCorrectionRule,
) -> Result<AppliedCorrection, EngineError> {
    check_rule(metrics, rule)?;
    if let Some(version) = metrics.correction_version() {
        return Err(EngineError::DoubleCorrectionApplied {
            city: rule.city.clone(),
            rule: format!("table {}", version),
        });
    }
    Ok(shift(metrics, rule))
}

fn check_rule(metrics: &ClimateRiskMetrics, rule: &RegionalCorrectionRule) -> Result<(), EngineError> {
    if rule.city != metrics.city() {
        return Err(EngineError::InvalidCorrectionTable(format!(
            "rule {:?} targets {}, not {}",
            rule.id,
            rule.city,
            metrics.city()
        )));
    }
    if metrics.has_correction(&rule.id) {
        return Err(EngineError::DoubleCorrectionApplied {
            city: rule.city.clone(),
            rule: rule.id.clone(),
        });
    }
    Ok(())
}

fn shift(metrics: &mut ClimateRiskMetrics, rule: &RegionalCorrectionRule) -> AppliedCorrection {
    let (before, after) = metrics.shift_composite(rule.target, rule.delta);
    let applied = AppliedCorrection {
        rule_id: rule.id.clone(),
        target: rule.target,
        delta: rule.delta,
        before,
        after,
        justification: rule.justification.clone(),
    };
    log::debug!(
        "{}: {} {:?} {:.3} -> {:.3}",
        rule.city,
        rule.id,
        rule.target,
        before,
        after
    );
    metrics.record_correction(applied.clone());
    applied
}

/// Apply a whole table to a roster, exactly once.
///
/// Nothing is modified if any profile was already corrected, either by an
/// earlier table pass or by one of this table's rules. Rules for cities
/// absent from the roster are skipped and audited.
pub fn apply_table(
    roster: &mut BTreeMap<String, ClimateRiskMetrics>,
    table: &CorrectionTable,
) -> Result<Vec<AuditEvent>, EngineError> {
    table.validate()?;

    if let Some((city, m)) = roster.iter().find(|(_, m)| m.correction_version().is_some()) {
        return Err(EngineError::DoubleCorrectionApplied {
            city: city.clone(),
            rule: format!("table {}", m.correction_version().unwrap_or_default()),
        });
    }

    let mut audit = Vec::new();
    for rule in &table.rules {
        match roster.get(&rule.city) {
            Some(metrics) => check_rule(metrics, rule)?,
            None => {
                log::warn!(
                    "Correction rule {} names {}, which is not in the roster",
                    rule.id,
                    rule.city
                );
                audit.push(AuditEvent::CorrectionCityNotInRoster {
                    rule: rule.id.clone(),
                    city: rule.city.clone(),
                });
            }
        }
    }

    for (city, metrics) in roster.iter_mut() {
        for rule in table.rules_for(city) {
            let applied = shift(metrics, rule);
            audit.push(AuditEvent::CorrectionApplied {
                city: city.clone(),
                rule: applied.rule_id,
                target: applied.target,
                before: applied.before,
                after: applied.after,
            });
        }
        metrics.mark_corrected(&table.version);
    }

    log::info!(
        "Applied correction table {} ({} rules)",
        table.version,
        table.rules.len()
    );
    Ok(audit)
}
