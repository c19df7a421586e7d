//! Property-based tests for the engine invariants.
//!
//! Random rosters (with random gaps) go through the full pipeline; every
//! record must stay bounded and keep Risk = H·E·V, before and after a
//! correction pass.

use climrisk_logic::assessment::{run_assessment, AssessmentInput};
use climrisk_logic::config::EngineConfig;
use climrisk_logic::corrections::{CorrectionTable, CorrectionTarget, RegionalCorrectionRule};
use climrisk_logic::indicators::{Indicator, RawIndicatorSet};
use climrisk_logic::normalize::FrozenBounds;
use climrisk_logic::risk::adaptability;
use climrisk_logic::stats::percentile_ranks;
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn raw_set() -> impl Strategy<Value = RawIndicatorSet> {
    prop::collection::vec(prop::option::weighted(0.9, -1.0e4f64..1.0e4), Indicator::ALL.len())
        .prop_map(|values| {
            let mut raw = RawIndicatorSet::new();
            for (ind, v) in Indicator::ALL.into_iter().zip(values) {
                raw.set(ind, v);
            }
            raw
        })
}

fn roster() -> impl Strategy<Value = AssessmentInput> {
    prop::collection::vec(raw_set(), 1..20).prop_map(|cities| {
        cities
            .into_iter()
            .enumerate()
            .fold(AssessmentInput::default(), |input, (i, raw)| {
                input.with_city(&format!("C{:02}", i), raw)
            })
    })
}

fn target() -> impl Strategy<Value = CorrectionTarget> {
    prop_oneof![
        Just(CorrectionTarget::Hazard),
        Just(CorrectionTarget::Vulnerability)
    ]
}

// =============================================================================
// Pipeline Properties
// =============================================================================

proptest! {
    /// Every composite and derived score stays in [0,1]; Risk = H·E·V.
    #[test]
    fn prop_metrics_bounded_and_multiplicative(input in roster()) {
        let report = run_assessment(&input, &EngineConfig::default(), None).unwrap();
        prop_assert_eq!(report.metrics.len(), input.len());
        for m in report.metrics.values() {
            for v in [m.hazard(), m.exposure(), m.vulnerability(), m.adaptive_capacity(), m.risk(), m.adaptability()] {
                prop_assert!((0.0..=1.0).contains(&v));
            }
            prop_assert!((m.risk() - m.hazard() * m.exposure() * m.vulnerability()).abs() < 1e-9);
            for (_, v) in m.indicators().iter() {
                prop_assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    /// The identity survives a correction pass.
    #[test]
    fn prop_identity_after_correction(
        input in roster(),
        target in target(),
        delta in 0.01f64..=1.0,
    ) {
        let table = CorrectionTable {
            version: "prop".into(),
            rules: vec![RegionalCorrectionRule {
                id: "r".into(),
                city: "C00".into(),
                target,
                delta,
                justification: "property test".into(),
            }],
        };
        let plain = run_assessment(&input, &EngineConfig::default(), None).unwrap();
        let corrected = run_assessment(&input, &EngineConfig::default(), Some(&table)).unwrap();

        let before = plain.get("C00").unwrap();
        let after = corrected.get("C00").unwrap();
        prop_assert!((after.risk() - after.hazard() * after.exposure() * after.vulnerability()).abs() < 1e-9);
        prop_assert!(after.risk() >= before.risk());
        prop_assert!(after.adaptability() <= before.adaptability());
        prop_assert!(after.vulnerability() <= 1.0 && after.hazard() <= 1.0);
        prop_assert_eq!(after.corrections().len(), 1);
    }

    /// Ranking covers every city once, in descending priority.
    #[test]
    fn prop_ranking_sorted_and_complete(input in roster()) {
        let report = run_assessment(&input, &EngineConfig::default(), None).unwrap();
        prop_assert_eq!(report.ranking.len(), input.len());
        let entries = report.ranking.entries();
        for w in entries.windows(2) {
            prop_assert!(
                w[0].priority > w[1].priority
                    || (w[0].priority == w[1].priority && w[0].city < w[1].city)
            );
        }
        for e in entries {
            prop_assert!((0.0..=1.0 + 1e-12).contains(&e.priority));
        }
    }
}

// =============================================================================
// Normalization Properties
// =============================================================================

proptest! {
    /// No spread means every city normalizes to exactly 0.5.
    #[test]
    fn prop_degenerate_spread_is_neutral(x in -1.0e6f64..1.0e6, n in 1usize..15) {
        let roster: Vec<RawIndicatorSet> =
            (0..n).map(|_| RawIndicatorSet::new().with(Indicator::Heat, x)).collect();
        let (bounds, _) = FrozenBounds::freeze(&roster, 0.1, 0.9).unwrap();
        for raw in &roster {
            let (normalized, _) = bounds.normalize("c", raw);
            prop_assert_eq!(normalized.get(Indicator::Heat), Some(0.5));
        }
    }

    /// Inverted indicators mirror direct ones.
    #[test]
    fn prop_inverted_mirrors_direct(values in prop::collection::vec(-100.0f64..100.0, 2..12)) {
        let roster: Vec<RawIndicatorSet> = values
            .iter()
            .map(|&v| RawIndicatorSet::new().with(Indicator::Heat, v).with(Indicator::IncomeInv, v))
            .collect();
        let (bounds, _) = FrozenBounds::freeze(&roster, 0.1, 0.9).unwrap();
        for raw in &roster {
            let (n, _) = bounds.normalize("c", raw);
            let direct = n.get(Indicator::Heat).unwrap();
            let inverted = n.get(Indicator::IncomeInv).unwrap();
            if bounds.get(Indicator::Heat).unwrap().is_degenerate() {
                prop_assert_eq!(direct, inverted);
            } else {
                prop_assert!((direct + inverted - 1.0).abs() < 1e-12);
            }
        }
    }
}

// =============================================================================
// Combination Law Properties
// =============================================================================

proptest! {
    /// Adaptability(Risk = 0) = AC exactly.
    #[test]
    fn prop_adaptability_at_zero_risk(ac in 0.0f64..=1.0) {
        prop_assert_eq!(adaptability(ac, 0.0), ac);
    }

    /// For fixed AC > 0, Adaptability strictly decreases in Risk.
    #[test]
    fn prop_adaptability_decreasing(ac in 0.01f64..=1.0, r in 0.0f64..0.5, d in 1.0e-3f64..0.5) {
        prop_assert!(adaptability(ac, r + d) < adaptability(ac, r));
    }

    /// Percentile ranks live in [0,1] and respect order.
    #[test]
    fn prop_percentile_ranks_ordered(values in prop::collection::vec(-1.0e3f64..1.0e3, 1..30)) {
        let ranks = percentile_ranks(&values);
        prop_assert_eq!(ranks.len(), values.len());
        for i in 0..values.len() {
            prop_assert!((0.0..=1.0).contains(&ranks[i]));
            for j in 0..values.len() {
                if values[i] < values[j] {
                    prop_assert!(ranks[i] < ranks[j]);
                }
            }
        }
    }
}
