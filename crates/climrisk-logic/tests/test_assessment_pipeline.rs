//! Integration tests for the full assessment pipeline.
//!
//! Exercises: RawIndicatorSet → FrozenBounds → CityClimateProfile
//! → ClimateRiskMetrics → RegionalCorrection → PriorityRanking
//!
//! All tests are pure logic over in-memory rosters and the bundled data files.

use climrisk_logic::assessment::{run_assessment, AssessmentInput, AssessmentReport};
use climrisk_logic::config::{DataGapPolicy, EngineConfig};
use climrisk_logic::corrections::{apply_table, CorrectionTable, CorrectionTarget};
use climrisk_logic::indicators::{CompositeKind, Indicator, RawIndicatorSet};
use climrisk_logic::metrics::ClimateRiskMetrics;
use climrisk_logic::normalize::FrozenBounds;
use climrisk_logic::priority::rank_priorities;
use climrisk_logic::water::WaterScarcityLevel;
use climrisk_logic::{AuditEvent, EngineError};

const SAMPLE_ROSTER: &str = include_str!("../../../data/sample_roster.json");
const SAMPLE_CORRECTIONS: &str = include_str!("../../../data/regional_corrections.json");

// ── Helpers ────────────────────────────────────────────────────────────

fn sample_input() -> AssessmentInput {
    AssessmentInput::from_json(SAMPLE_ROSTER).unwrap()
}

fn sample_table() -> CorrectionTable {
    CorrectionTable::from_json(SAMPLE_CORRECTIONS).unwrap()
}

fn run_sample(corrected: bool) -> AssessmentReport {
    let table = sample_table();
    run_assessment(
        &sample_input(),
        &EngineConfig::default(),
        corrected.then_some(&table),
    )
    .unwrap()
}

/// Every indicator set to `base + step * i` for the i-th indicator.
fn synthetic_city(base: f64, step: f64) -> RawIndicatorSet {
    let mut raw = RawIndicatorSet::new();
    for (i, ind) in Indicator::ALL.into_iter().enumerate() {
        raw.set(ind, Some(base + step * i as f64));
    }
    raw
}

fn synthetic_roster(n: usize) -> AssessmentInput {
    (0..n).fold(AssessmentInput::default(), |input, i| {
        input.with_city(
            &format!("City{:02}", i),
            synthetic_city(10.0 + i as f64, 1.0 + (i % 3) as f64),
        )
    })
}

fn assert_metrics_consistent(m: &ClimateRiskMetrics) {
    for v in [
        m.hazard(),
        m.exposure(),
        m.vulnerability(),
        m.adaptive_capacity(),
        m.risk(),
        m.adaptability(),
    ] {
        assert!((0.0..=1.0).contains(&v), "{}: {} out of [0,1]", m.city(), v);
    }
    assert!(
        (m.risk() - m.hazard() * m.exposure() * m.vulnerability()).abs() < 1e-9,
        "{}: risk identity broken",
        m.city()
    );
    assert!((m.adaptability() - m.adaptive_capacity() / (1.0 + m.risk())).abs() < 1e-9);
}

// ── Pipeline coherence ─────────────────────────────────────────────────

#[test]
fn sample_roster_runs() {
    let report = run_sample(true);
    assert_eq!(report.metrics.len(), 14);
    assert_eq!(report.ranking.len(), 14);
    for m in report.metrics.values() {
        assert_metrics_consistent(m);
        assert!(m.priority().is_some());
        assert!(m.water_scarcity().is_some());
    }
}

#[test]
fn deterministic_output() {
    let a = run_sample(true);
    let b = run_sample(true);
    assert_eq!(a, b);
    assert_eq!(a.to_json_pretty().unwrap(), b.to_json_pretty().unwrap());
}

#[test]
fn roster_order_does_not_matter() {
    let config = EngineConfig::default();
    let report = run_sample(true);

    // Bounds over a reversed and rotated roster match the report's.
    let input = sample_input();
    let mut raw: Vec<&RawIndicatorSet> = input.cities.values().rev().map(|c| &c.indicators).collect();
    raw.rotate_left(5);
    let (bounds, _) =
        FrozenBounds::freeze(raw, config.percentile_lower, config.percentile_upper).unwrap();
    assert_eq!(bounds, report.bounds);

    // Ranking the same metrics in a shuffled order gives the same ranking.
    let mut shuffled: Vec<&ClimateRiskMetrics> = report.metrics.values().rev().collect();
    shuffled.rotate_left(3);
    shuffled.swap(0, 7);
    let ranking = rank_priorities(shuffled, &config.priority, config.data_gap_policy);
    assert_eq!(ranking, report.ranking);
}

#[test]
fn synthetic_roster_invariants() {
    for n in [1, 2, 5, 17] {
        let report = run_assessment(&synthetic_roster(n), &EngineConfig::default(), None).unwrap();
        assert_eq!(report.metrics.len(), n);
        for m in report.metrics.values() {
            assert_metrics_consistent(m);
        }
    }
}

#[test]
fn single_city_roster_is_neutral() {
    let report = run_assessment(&synthetic_roster(1), &EngineConfig::default(), None).unwrap();
    let m = report.get("City00").unwrap();
    for (_, v) in m.indicators().iter() {
        assert_eq!(v, 0.5);
    }
    let degenerate = report
        .audit
        .iter()
        .filter(|e| matches!(e, AuditEvent::DegenerateNormalization { .. }))
        .count();
    assert_eq!(degenerate, Indicator::ALL.len());
    assert!((report.ranking.entries()[0].priority - 0.5).abs() < 1e-12);
}

// ── Data gaps ──────────────────────────────────────────────────────────

#[test]
fn sample_data_gap_is_flagged() {
    let report = run_sample(true);
    let nurafshon = report.get("Nurafshon").unwrap();
    assert!(nurafshon.is_low_confidence());
    assert_eq!(
        nurafshon.composite(CompositeKind::Vulnerability).missing,
        vec![Indicator::BioTrend]
    );
    assert!(!nurafshon.composite(CompositeKind::Hazard).has_data_gap());
    assert_eq!(
        report.low_confidence_cities().collect::<Vec<_>>(),
        vec!["Nurafshon"]
    );
    assert!(report.audit_for("Nurafshon").any(|e| *e
        == AuditEvent::MissingIndicator {
            city: "Nurafshon".into(),
            indicator: Indicator::BioTrend,
        }));
    assert!(report.ranking.get("Nurafshon").unwrap().low_confidence);
}

#[test]
fn suppress_policy_drops_gapped_cities_from_ranking() {
    let config = EngineConfig {
        data_gap_policy: DataGapPolicy::Suppress,
        ..EngineConfig::default()
    };
    let report = run_assessment(&sample_input(), &config, Some(&sample_table())).unwrap();
    assert_eq!(report.ranking.len(), 13);
    assert!(report.ranking.get("Nurafshon").is_none());
    assert_eq!(report.get("Nurafshon").unwrap().priority(), None);
    // Still assessed and reported.
    assert_eq!(report.metrics.len(), 14);
}

#[test]
fn indicator_missing_everywhere_is_audited_once() {
    let mut input = synthetic_roster(4);
    for data in input.cities.values_mut() {
        data.indicators.set(Indicator::Dust, None);
    }
    let report = run_assessment(&input, &EngineConfig::default(), None).unwrap();
    let no_obs: Vec<&AuditEvent> = report
        .audit
        .iter()
        .filter(|e| matches!(e, AuditEvent::NoObservations { .. }))
        .collect();
    assert_eq!(
        no_obs,
        vec![&AuditEvent::NoObservations {
            indicator: Indicator::Dust
        }]
    );
    assert!(report.bounds.get(Indicator::Dust).is_none());
    for m in report.metrics.values() {
        assert_eq!(m.composite(CompositeKind::Hazard).missing, vec![Indicator::Dust]);
    }
}

// ── Regional corrections ───────────────────────────────────────────────

#[test]
fn sample_corrections_are_applied_and_traced() {
    let table = sample_table();
    let report = run_sample(true);
    assert_eq!(report.correction_version.as_deref(), Some("2024.1"));

    let applied = report
        .audit
        .iter()
        .filter(|e| matches!(e, AuditEvent::CorrectionApplied { .. }))
        .count();
    assert_eq!(applied, table.rules.len());

    let nukus = report.get("Nukus").unwrap();
    assert_eq!(nukus.corrections().len(), 2);
    assert!(nukus
        .corrections()
        .iter()
        .any(|c| c.target == CorrectionTarget::Hazard && c.rule_id == "nukus-aralkum-dust"));
    for m in report.metrics.values() {
        assert_eq!(m.correction_version(), Some("2024.1"));
    }
}

#[test]
fn corrections_raise_risk_only_where_declared() {
    let raw = run_sample(false);
    let corrected = run_sample(true);

    assert!(corrected.get("Nukus").unwrap().risk() > raw.get("Nukus").unwrap().risk());
    assert!(corrected.get("Navoiy").unwrap().hazard() > raw.get("Navoiy").unwrap().hazard());
    for city in ["Tashkent", "Samarkand", "Fergana", "Termez"] {
        assert_eq!(
            corrected.get(city).unwrap().composites(),
            raw.get(city).unwrap().composites()
        );
    }
    assert!(raw.get("Nukus").unwrap().corrections().is_empty());
}

#[test]
fn second_correction_pass_is_fatal() {
    let table = sample_table();
    let mut report = run_sample(true);
    let before = report.metrics.clone();
    match apply_table(&mut report.metrics, &table) {
        Err(EngineError::DoubleCorrectionApplied { .. }) => {}
        other => panic!("expected DoubleCorrectionApplied, got {:?}", other),
    }
    assert_eq!(report.metrics, before);
}

#[test]
fn correction_for_unknown_city_is_audited() {
    let table = CorrectionTable::from_json(
        r#"{"version": "t", "rules": [{"id": "ghost", "city": "Moynaq",
            "target": "hazard", "delta": 0.2, "justification": "not assessed"}]}"#,
    )
    .unwrap();
    let report = run_assessment(&sample_input(), &EngineConfig::default(), Some(&table)).unwrap();
    assert!(report.audit.contains(&AuditEvent::CorrectionCityNotInRoster {
        rule: "ghost".into(),
        city: "Moynaq".into(),
    }));
}

// ── Prioritization ─────────────────────────────────────────────────────

#[test]
fn aral_city_tops_sample_ranking() {
    let report = run_sample(true);
    assert_eq!(report.ranking.position("Nukus"), Some(0));
    let top = &report.ranking.entries()[0];
    assert_eq!(top.city, "Nukus");

    let scores: Vec<f64> = report.ranking.pairs().map(|(_, p)| p).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn ranking_agrees_with_metrics() {
    let report = run_sample(true);
    for entry in report.ranking.entries() {
        assert_eq!(report.get(&entry.city).unwrap().priority(), Some(entry.priority));
    }
}

#[test]
fn end_to_end_scenario() {
    let a = ClimateRiskMetrics::from_composites("A", Some(800_000.0), 0.488, 0.839, 0.742, 0.30);
    let b = ClimateRiskMetrics::from_composites("B", Some(800_000.0), 0.650, 0.372, 0.106, 0.696);

    assert!((a.risk() - 0.304).abs() < 1e-3);
    assert!((b.risk() - 0.0256).abs() < 1e-4);
    assert!((a.adaptability() - 0.230).abs() < 1e-3);
    assert!((b.adaptability() - 0.679).abs() < 1e-3);

    let ranking = rank_priorities([&a, &b], &Default::default(), DataGapPolicy::Annotate);
    assert_eq!(ranking.position("A"), Some(0));
}

// ── Summaries ──────────────────────────────────────────────────────────

#[test]
fn distribution_summary_covers_roster() {
    let report = run_sample(true);
    let s = &report.summary;
    assert_eq!(s.city_count, 14);
    assert_eq!(s.low_confidence_count, 1);
    assert_eq!(s.risk_categories.values().sum::<usize>(), 14);
    assert!(s.risk.q25 <= s.risk.median && s.risk.median <= s.risk.q75);
    assert!(s.adaptive_capacity.iqr() >= 0.0);
    assert!(s.priority.is_some());
}

#[test]
fn water_summary_from_hydroclimate_observations() {
    let report = run_sample(true);
    let water = report.water_summary.as_ref().unwrap();
    assert_eq!(water.total_cities, 14);
    // Nukus and Urgench share Aral-basin observations; name breaks the tie.
    assert_eq!(water.most_stressed, "Nukus");
    assert_eq!(water.top[1].0, "Urgench");
    assert_eq!(water.level_counts.get(&WaterScarcityLevel::Moderate), Some(&14));
    assert!(water.min_score <= water.median_score && water.median_score <= water.max_score);
}

// ── Configuration ──────────────────────────────────────────────────────

#[test]
fn invalid_weights_abort_run() {
    let config = EngineConfig::from_json(
        r#"{"weights": {"exposure": [
            {"indicator": "population", "weight": 0.6},
            {"indicator": "gdp", "weight": 0.3}
        ]}}"#,
    )
    .unwrap();
    assert!(matches!(
        run_assessment(&sample_input(), &config, None),
        Err(EngineError::InvalidWeightConfiguration { .. })
    ));
}

#[test]
fn invalid_percentiles_abort_run() {
    let config = EngineConfig {
        percentile_lower: 0.9,
        percentile_upper: 0.1,
        ..EngineConfig::default()
    };
    assert!(matches!(
        run_assessment(&sample_input(), &config, None),
        Err(EngineError::InvalidPercentileBounds { .. })
    ));
}

#[test]
fn wider_percentiles_change_bounds_not_shape() {
    let config = EngineConfig {
        percentile_lower: 0.0,
        percentile_upper: 1.0,
        ..EngineConfig::default()
    };
    let report = run_assessment(&sample_input(), &config, None).unwrap();
    let heat = report.bounds.get(Indicator::Heat).unwrap();
    assert_eq!(heat.lower, 39.1);
    assert_eq!(heat.upper, 46.2);
    for m in report.metrics.values() {
        assert_metrics_consistent(m);
    }
}
