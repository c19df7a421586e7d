//! climrisk Headless Assessment Harness
//!
//! Runs the engine over a city roster and validates its invariants against
//! the live output. Runs entirely in-process with no I/O beyond the input files.
//!
//! Usage:
//!   cargo run -p climrisk-simtest
//!   cargo run -p climrisk-simtest -- --verbose
//!   cargo run -p climrisk-simtest -- --roster my_cities.json --output report.json

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use climrisk_logic::assessment::{run_assessment, AssessmentInput, AssessmentReport};
use climrisk_logic::config::{CompositeWeights, DataGapPolicy, EngineConfig, PriorityWeights};
use climrisk_logic::corrections::{
    apply_rule, apply_table, CorrectionTable, CorrectionTarget, RegionalCorrectionRule,
};
use climrisk_logic::indicators::{CompositeKind, Indicator, RawIndicatorSet};
use climrisk_logic::metrics::ClimateRiskMetrics;
use climrisk_logic::normalize::FrozenBounds;
use climrisk_logic::priority::rank_priorities;
use climrisk_logic::EngineError;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ── Bundled data (same files the integration tests use) ─────────────────
const SAMPLE_ROSTER: &str = include_str!("../../../data/sample_roster.json");
const SAMPLE_CORRECTIONS: &str = include_str!("../../../data/regional_corrections.json");

const TOLERANCE: f64 = 1e-9;

#[derive(Parser, Debug)]
#[command(name = "climrisk-simtest", about = "Run a climate risk assessment and validate its invariants")]
struct Cli {
    /// Print every check, not only failures
    #[arg(long)]
    verbose: bool,

    /// City roster JSON (defaults to the bundled sample roster)
    #[arg(long)]
    roster: Option<PathBuf>,

    /// Regional correction table JSON (defaults to the bundled table)
    #[arg(long)]
    corrections: Option<PathBuf>,

    /// Skip the regional correction pass
    #[arg(long, conflicts_with = "corrections")]
    no_corrections: bool,

    /// Engine configuration JSON; missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the full assessment report as JSON
    #[arg(long)]
    output: Option<PathBuf>,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(name: &str, passed: bool, detail: String) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail,
    }
}

/// Inputs resolved from the command line.
struct Inputs {
    roster: AssessmentInput,
    corrections: Option<CorrectionTable>,
    config: EngineConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    println!("=== climrisk Assessment Harness ===\n");

    let inputs = match load_inputs(&cli) {
        Ok(i) => i,
        Err(e) => {
            log::error!("Failed to load inputs: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let report = match run_assessment(&inputs.roster, &inputs.config, inputs.corrections.as_ref())
    {
        Ok(r) => r,
        Err(e) => {
            log::error!("Assessment aborted: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut results = Vec::new();

    // 1. Configuration
    results.extend(validate_configuration(&inputs.config, cli.verbose));

    // 2. Normalization
    results.extend(validate_normalization(&report, cli.verbose));

    // 3. Composites and risk on the live report
    results.extend(validate_metrics(&report, cli.verbose));

    // 4. Combination law scenarios
    results.extend(validate_combination_law(cli.verbose));

    // 5. Regional corrections
    results.extend(validate_corrections(&report, inputs.corrections.as_ref(), cli.verbose));

    // 6. Prioritization
    results.extend(validate_priority(&report, &inputs.config, cli.verbose));

    // 7. Water scarcity
    results.extend(validate_water(&report, cli.verbose));

    print_report(&report, cli.verbose);

    if let Some(path) = &cli.output {
        results.push(write_report(&report, path));
    }

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || cli.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("climrisk=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn write_report(report: &AssessmentReport, path: &Path) -> TestResult {
    let written = report
        .to_json_pretty()
        .map_err(|e| e.to_string())
        .and_then(|json| std::fs::write(path, json).map_err(|e| e.to_string()));
    match written {
        Ok(()) => {
            log::info!("Wrote report to {}", path.display());
            check("report_written", true, path.display().to_string())
        }
        Err(e) => {
            log::error!("Could not write {}: {}", path.display(), e);
            check("report_written", false, format!("{}: {}", path.display(), e))
        }
    }
}

#[derive(Debug, Error)]
enum LoadError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

fn read(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_inputs(cli: &Cli) -> Result<Inputs, LoadError> {
    let roster = match &cli.roster {
        Some(path) => AssessmentInput::from_json(&read(path)?)?,
        None => AssessmentInput::from_json(SAMPLE_ROSTER)?,
    };
    let corrections = if cli.no_corrections {
        None
    } else {
        Some(match &cli.corrections {
            Some(path) => CorrectionTable::from_json(&read(path)?)?,
            None => CorrectionTable::from_json(SAMPLE_CORRECTIONS)?,
        })
    };
    let config = match &cli.config {
        Some(path) => EngineConfig::from_json(&read(path)?)?,
        None => EngineConfig::default(),
    };
    log::info!(
        "Loaded {} cities, {} correction rules",
        roster.len(),
        corrections.as_ref().map_or(0, |t| t.rules.len())
    );
    Ok(Inputs {
        roster,
        corrections,
        config,
    })
}

// ── 1. Configuration ────────────────────────────────────────────────────

fn validate_configuration(config: &EngineConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Configuration ---");
    let mut results = Vec::new();

    for kind in CompositeKind::ALL {
        let sum: f64 = config.weights.for_kind(kind).iter().map(|t| t.weight).sum();
        results.push(check(
            &format!("weights_sum_{}", kind.name()),
            (sum - 1.0).abs() < TOLERANCE,
            format!("{} weights sum to {:.12}", kind.name(), sum),
        ));
    }

    let p = config.priority.sum();
    results.push(check(
        "priority_weights_sum",
        (p - 1.0).abs() < TOLERANCE,
        format!("priority weights sum to {:.12}", p),
    ));

    let defaults = PriorityWeights::default();
    results.push(check(
        "priority_default_weights",
        defaults.risk == 0.5 && defaults.ac_gap == 0.3 && defaults.population == 0.2,
        format!(
            "defaults risk={} ac_gap={} population={}",
            defaults.risk, defaults.ac_gap, defaults.population
        ),
    ));

    // A broken table must be rejected before anything is computed.
    let mut broken = CompositeWeights::default();
    broken.hazard[0].weight = 0.5;
    let rejected = matches!(
        broken.validate(),
        Err(EngineError::InvalidWeightConfiguration { .. })
    );
    results.push(check(
        "bad_weights_rejected",
        rejected,
        "hazard table summing to 0.9 raises InvalidWeightConfiguration".into(),
    ));

    if verbose {
        println!(
            "  percentiles: p{:.0}/p{:.0}, data gaps: {:?}",
            config.percentile_lower * 100.0,
            config.percentile_upper * 100.0,
            config.data_gap_policy
        );
    }
    results
}

// ── 2. Normalization ────────────────────────────────────────────────────

fn validate_normalization(report: &AssessmentReport, verbose: bool) -> Vec<TestResult> {
    println!("--- Normalization ---");
    let mut results = Vec::new();

    // Synthetic endpoints: 0, 10, ..., 100 across 11 cities.
    let synthetic: Vec<RawIndicatorSet> = (0..=10)
        .map(|i| RawIndicatorSet::new().with(Indicator::Heat, i as f64 * 10.0))
        .collect();
    match FrozenBounds::freeze(&synthetic, 0.1, 0.9) {
        Ok((bounds, _)) => {
            let (p10, _) = bounds.normalize("p10", &synthetic[1]);
            let (p90, _) = bounds.normalize("p90", &synthetic[9]);
            let lo = p10.get(Indicator::Heat).unwrap_or(f64::NAN);
            let hi = p90.get(Indicator::Heat).unwrap_or(f64::NAN);
            results.push(check(
                "endpoints_p10_p90",
                lo.abs() < TOLERANCE && (hi - 1.0).abs() < TOLERANCE,
                format!("p10 -> {:.12}, p90 -> {:.12}", lo, hi),
            ));
        }
        Err(e) => results.push(check("endpoints_p10_p90", false, e.to_string())),
    }

    // Degenerate spread
    let flat: Vec<RawIndicatorSet> = (0..5)
        .map(|_| RawIndicatorSet::new().with(Indicator::Dust, 0.42))
        .collect();
    match FrozenBounds::freeze(&flat, 0.1, 0.9) {
        Ok((bounds, audit)) => {
            let all_neutral = flat.iter().all(|raw| {
                bounds.normalize("flat", raw).0.get(Indicator::Dust) == Some(0.5)
            });
            results.push(check(
                "degenerate_spread_neutral",
                all_neutral && !audit.is_empty(),
                format!("identical values -> 0.5, {} audit events", audit.len()),
            ));
        }
        Err(e) => results.push(check("degenerate_spread_neutral", false, e.to_string())),
    }

    // Live report: every normalized value in [0,1]
    let out_of_range = report
        .metrics
        .values()
        .flat_map(|m| m.indicators().iter())
        .filter(|(_, v)| !(0.0..=1.0).contains(v))
        .count();
    results.push(check(
        "normalized_in_unit_interval",
        out_of_range == 0,
        format!("{} normalized values outside [0,1]", out_of_range),
    ));

    if verbose {
        for ind in Indicator::ALL {
            if let Some(b) = report.bounds.get(ind) {
                println!(
                    "  {:<14} lo={:>12.3} hi={:>12.3} n={}",
                    ind.name(),
                    b.lower,
                    b.upper,
                    b.observations
                );
            }
        }
    }
    results
}

// ── 3. Metrics ──────────────────────────────────────────────────────────

fn validate_metrics(report: &AssessmentReport, verbose: bool) -> Vec<TestResult> {
    println!("--- Composites & Risk ---");
    let mut results = Vec::new();

    let mut bounded = true;
    let mut identity = true;
    let mut adapt = true;
    for m in report.metrics.values() {
        let values = [
            m.hazard(),
            m.exposure(),
            m.vulnerability(),
            m.adaptive_capacity(),
            m.risk(),
            m.adaptability(),
        ];
        if values.iter().any(|v| !(0.0..=1.0).contains(v)) {
            bounded = false;
            results.push(check(
                &format!("bounds_{}", m.city()),
                false,
                format!("{:?}", values),
            ));
        }
        let product = m.hazard() * m.exposure() * m.vulnerability();
        if (m.risk() - product).abs() >= TOLERANCE {
            identity = false;
            results.push(check(
                &format!("identity_{}", m.city()),
                false,
                format!("risk {} != H·E·V {}", m.risk(), product),
            ));
        }
        if (m.adaptability() - m.adaptive_capacity() / (1.0 + m.risk())).abs() >= TOLERANCE {
            adapt = false;
        }
    }
    let n = report.metrics.len();
    results.push(check("scores_bounded", bounded, format!("{} cities checked", n)));
    results.push(check("risk_is_product", identity, format!("{} cities checked", n)));
    results.push(check("adaptability_law", adapt, format!("{} cities checked", n)));

    let gaps: Vec<&str> = report.low_confidence_cities().collect();
    let flagged = gaps.iter().all(|c| {
        report
            .ranking
            .get(c)
            .map_or(true, |entry| entry.low_confidence)
    });
    results.push(check(
        "data_gaps_flagged",
        flagged,
        format!("low confidence: {:?}", gaps),
    ));

    if verbose {
        for m in report.metrics.values() {
            println!(
                "  {:<10} H={:.3} E={:.3} V={:.3} AC={:.3} R={:.4} A={:.3} [{}]",
                m.city(),
                m.hazard(),
                m.exposure(),
                m.vulnerability(),
                m.adaptive_capacity(),
                m.risk(),
                m.adaptability(),
                m.risk_category().label()
            );
        }
    }
    results
}

// ── 4. Combination law ──────────────────────────────────────────────────

fn validate_combination_law(verbose: bool) -> Vec<TestResult> {
    println!("--- Combination Law ---");
    let mut results = Vec::new();

    let a = ClimateRiskMetrics::from_composites("A", Some(500_000.0), 0.488, 0.839, 0.742, 0.30);
    let b = ClimateRiskMetrics::from_composites("B", Some(500_000.0), 0.650, 0.372, 0.106, 0.696);

    results.push(check(
        "scenario_risk",
        (a.risk() - 0.304).abs() < 1e-3 && (b.risk() - 0.0256).abs() < 1e-4,
        format!("Risk_A={:.4} Risk_B={:.4}", a.risk(), b.risk()),
    ));
    results.push(check(
        "scenario_adaptability",
        (a.adaptability() - 0.230).abs() < 1e-3 && (b.adaptability() - 0.679).abs() < 1e-3,
        format!("A_A={:.3} A_B={:.3}", a.adaptability(), b.adaptability()),
    ));

    let ranking = rank_priorities([&a, &b], &PriorityWeights::default(), DataGapPolicy::Annotate);
    results.push(check(
        "scenario_a_outranks_b",
        ranking.position("A") == Some(0),
        format!("{:?}", ranking.pairs().collect::<Vec<_>>()),
    ));

    let zero = ClimateRiskMetrics::from_composites("Z", Some(1.0), 0.0, 0.9, 0.9, 0.55);
    results.push(check(
        "zero_hazard_zero_risk",
        zero.risk() == 0.0 && zero.adaptability() == 0.55,
        format!("risk={} adaptability={}", zero.risk(), zero.adaptability()),
    ));

    let decreasing = (0..10).all(|i| {
        let lo = ClimateRiskMetrics::from_composites("x", None, 0.1 * i as f64, 1.0, 1.0, 0.5);
        let hi = ClimateRiskMetrics::from_composites("x", None, 0.1 * (i + 1) as f64, 1.0, 1.0, 0.5);
        hi.adaptability() < lo.adaptability()
    });
    results.push(check(
        "adaptability_monotone",
        decreasing,
        "AC=0.5, risk 0.0..1.0 in steps of 0.1".into(),
    ));

    if verbose {
        println!("  A: risk {:.4}, B: risk {:.4}", a.risk(), b.risk());
    }
    results
}

// ── 5. Regional corrections ─────────────────────────────────────────────

fn validate_corrections(
    report: &AssessmentReport,
    table: Option<&CorrectionTable>,
    verbose: bool,
) -> Vec<TestResult> {
    println!("--- Regional Corrections ---");
    let mut results = Vec::new();

    // Reference scenario: V 0.429 + 0.35
    let mut city = ClimateRiskMetrics::from_composites("Ref", None, 0.6, 0.7, 0.429, 0.4);
    let risk_before = city.risk();
    let rule = RegionalCorrectionRule {
        id: "ref-water-stress".into(),
        city: "Ref".into(),
        target: CorrectionTarget::Vulnerability,
        delta: 0.35,
        justification: "reference scenario".into(),
    };
    match apply_rule(&mut city, &rule) {
        Ok(applied) => results.push(check(
            "correction_scenario",
            (applied.after - 0.779).abs() < TOLERANCE && city.risk() > risk_before,
            format!(
                "V {:.3} -> {:.3}, risk {:.4} -> {:.4}",
                applied.before,
                applied.after,
                risk_before,
                city.risk()
            ),
        )),
        Err(e) => results.push(check("correction_scenario", false, e.to_string())),
    }

    let second = apply_rule(&mut city, &rule);
    results.push(check(
        "double_application_rejected",
        matches!(second, Err(EngineError::DoubleCorrectionApplied { .. })),
        "same rule twice raises DoubleCorrectionApplied".into(),
    ));

    let Some(table) = table else {
        println!("  (correction pass skipped)");
        return results;
    };

    let tagged = report
        .metrics
        .values()
        .all(|m| m.correction_version() == Some(table.version.as_str()));
    results.push(check(
        "roster_tagged",
        tagged,
        format!("every profile tagged with table {}", table.version),
    ));

    let mut again = report.metrics.clone();
    let repass = apply_table(&mut again, table);
    results.push(check(
        "second_pass_rejected",
        matches!(repass, Err(EngineError::DoubleCorrectionApplied { .. })) && again == report.metrics,
        "second table pass refused without mutation".into(),
    ));

    for rule in &table.rules {
        let Some(m) = report.get(&rule.city) else {
            continue;
        };
        let traced = m.corrections().iter().any(|c| c.rule_id == rule.id);
        results.push(check(
            &format!("traced_{}", rule.id),
            traced,
            format!("{} {:?} +{:.2}: {}", rule.city, rule.target, rule.delta, rule.justification),
        ));
        if verbose {
            for c in m.corrections().iter().filter(|c| c.rule_id == rule.id) {
                println!(
                    "  {:<10} {:<30} {:?} {:.3} -> {:.3}",
                    rule.city, c.rule_id, c.target, c.before, c.after
                );
            }
        }
    }
    results
}

// ── 6. Prioritization ───────────────────────────────────────────────────

fn validate_priority(
    report: &AssessmentReport,
    config: &EngineConfig,
    verbose: bool,
) -> Vec<TestResult> {
    println!("--- Prioritization ---");
    let mut results = Vec::new();
    let entries = report.ranking.entries();

    let sorted = entries.windows(2).all(|w| {
        w[0].priority > w[1].priority || (w[0].priority == w[1].priority && w[0].city < w[1].city)
    });
    results.push(check(
        "ranking_sorted",
        sorted,
        "descending priority, ties by city name".into(),
    ));

    let expected = match config.data_gap_policy {
        DataGapPolicy::Annotate => report.metrics.len(),
        DataGapPolicy::Suppress => report.metrics.len() - report.summary.low_confidence_count,
    };
    results.push(check(
        "ranking_complete",
        entries.len() == expected,
        format!("{} ranked of {} cities", entries.len(), report.metrics.len()),
    ));

    let bounded = entries.iter().all(|e| (0.0..=1.0).contains(&e.priority));
    results.push(check(
        "priority_bounded",
        bounded,
        "every priority in [0,1]".into(),
    ));

    if verbose {
        for (i, e) in entries.iter().enumerate() {
            println!(
                "  {:>2}. {:<10} {:.3} {:<7}{}",
                i + 1,
                e.city,
                e.priority,
                e.label.label(),
                if e.low_confidence { " (low confidence)" } else { "" }
            );
        }
    }
    results
}

// ── 7. Water scarcity ───────────────────────────────────────────────────

fn validate_water(report: &AssessmentReport, verbose: bool) -> Vec<TestResult> {
    println!("--- Water Scarcity ---");
    let mut results = Vec::new();

    let scored: Vec<(&str, f64)> = report
        .metrics
        .values()
        .filter_map(|m| m.water_scarcity().map(|w| (m.city(), w.score)))
        .collect();
    let bounded = scored.iter().all(|(_, s)| (0.0..=1.0).contains(s));
    results.push(check(
        "water_scores_bounded",
        bounded,
        format!("{} cities with water data", scored.len()),
    ));

    // Sub-score is reported only; it never feeds Risk.
    let independent = report.metrics.values().all(|m| {
        (m.risk() - m.hazard() * m.exposure() * m.vulnerability()).abs() < TOLERANCE
    });
    results.push(check(
        "water_not_folded_into_risk",
        independent,
        "risk depends on H/E/V only".into(),
    ));

    if let Some(summary) = &report.water_summary {
        results.push(check(
            "water_summary_consistent",
            summary.total_cities == scored.len()
                && summary.min_score <= summary.median_score
                && summary.median_score <= summary.max_score,
            format!(
                "mean {:.3}, most stressed {}, least stressed {}",
                summary.mean_score, summary.most_stressed, summary.least_stressed
            ),
        ));
        if verbose {
            for (city, score, level) in &summary.top {
                println!("  {:<10} {:.3} {}", city, score, level.label());
            }
        }
    }
    results
}

// ── Report ──────────────────────────────────────────────────────────────

fn print_report(report: &AssessmentReport, verbose: bool) {
    let s = &report.summary;
    println!("\n--- Assessment Summary ---");
    println!(
        "  {} cities, {} low confidence, {} audit events",
        s.city_count,
        s.low_confidence_count,
        report.audit.len()
    );
    println!(
        "  Risk median {:.4} (IQR {:.4}), AC median {:.3} (IQR {:.3})",
        s.risk.median,
        s.risk.iqr(),
        s.adaptive_capacity.median,
        s.adaptive_capacity.iqr()
    );
    for (category, count) in &s.risk_categories {
        println!("  {:<15} {}", category.label(), count);
    }
    if let Some(top) = report.ranking.entries().first() {
        println!("  Top priority: {} ({:.3})", top.city, top.priority);
    }
    if verbose {
        for event in &report.audit {
            println!("  audit: {:?}", event);
        }
    }
}
