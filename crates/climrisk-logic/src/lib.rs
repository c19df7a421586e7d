//! Pure climate risk composite logic for climrisk.
//!
//! This crate turns per-city raw indicators into bounded IPCC AR6-style
//! Hazard × Exposure × Vulnerability risk scores, an adaptive-capacity-aware
//! adaptability score and an intervention priority ranking. It is
//! independent of any data source, renderer, or file layout: functions take
//! plain data and return results, making them unit-testable and reusable
//! from the headless harness or any reporting front-end.
//!
//! The computation is a two-phase batch: percentile bounds for every
//! indicator are frozen over the whole roster first, then each city's
//! record is derived from those bounds.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`assessment`] | End-to-end pipeline, audit log, distribution summary |
//! | [`composites`] | Weighted H/E/V/AC composites with data-gap flags |
//! | [`config`] | Composite/priority weights, percentile cut points, validation |
//! | [`corrections`] | Declarative regional correction table, guarded application |
//! | [`error`] | Fatal error taxonomy and recoverable audit events |
//! | [`indicators`] | Indicator names, groups, orientation, raw/normalized sets |
//! | [`metrics`] | City profiles and per-city risk metrics |
//! | [`normalize`] | Frozen percentile bounds and [0,1] rescaling |
//! | [`priority`] | Rank-blended priority scores and ranking |
//! | [`risk`] | Risk = H·E·V, Adaptability = AC/(1+Risk), category labels |
//! | [`stats`] | Quantiles, distribution summaries, percentile ranks |
//! | [`water`] | Water-scarcity sub-score and roster summary |

pub mod assessment;
pub mod composites;
pub mod config;
pub mod corrections;
pub mod error;
pub mod indicators;
pub mod metrics;
pub mod normalize;
pub mod priority;
pub mod risk;
pub mod stats;
pub mod water;

pub use error::{AuditEvent, EngineError};
