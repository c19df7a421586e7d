//! Indicator identifiers and the raw/normalized indicator sets.
//!
//! Every indicator belongs to exactly one composite group and has a fixed
//! orientation. Raw values are unit-heterogeneous (°C, people, USD,
//! radiance, metres, counts) and are only ever compared within one
//! indicator across cities, never across indicators.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The four IPCC AR6-style composites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeKind {
    Hazard,
    Exposure,
    Vulnerability,
    AdaptiveCapacity,
}

impl CompositeKind {
    pub const ALL: [CompositeKind; 4] = [
        CompositeKind::Hazard,
        CompositeKind::Exposure,
        CompositeKind::Vulnerability,
        CompositeKind::AdaptiveCapacity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CompositeKind::Hazard => "hazard",
            CompositeKind::Exposure => "exposure",
            CompositeKind::Vulnerability => "vulnerability",
            CompositeKind::AdaptiveCapacity => "adaptive_capacity",
        }
    }

    /// Indicators that feed this composite.
    pub fn members(self) -> impl Iterator<Item = Indicator> {
        Indicator::ALL
            .into_iter()
            .filter(move |i| i.composite() == self)
    }
}

/// How a raw value maps onto its normalized score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Higher raw value → higher score.
    Direct,
    /// Higher raw value → lower score.
    Inverted,
}

/// Fixed indicator roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    /// Summer daytime urban land-surface temperature (°C).
    Heat,
    /// Dry-season length or aridity signal.
    Dry,
    /// Extreme short-duration precipitation.
    Pluvial,
    /// Aerosol / dust loading.
    Dust,
    /// Resident population.
    Population,
    /// Total economic output exposed.
    Gdp,
    /// VIIRS night-time radiance.
    Viirs,
    /// Per-capita income; low income means high vulnerability.
    IncomeInv,
    /// Mean distance to vegetation (m).
    VegAccess,
    /// Vegetation patch fragmentation.
    Fragmentation,
    /// Vegetation trend; greening lowers vulnerability.
    BioTrend,
    /// GDP per capita.
    GdpPc,
    /// Green-space share.
    Greenspace,
    /// Public service density.
    Services,
}

impl Indicator {
    pub const ALL: [Indicator; 14] = [
        Indicator::Heat,
        Indicator::Dry,
        Indicator::Pluvial,
        Indicator::Dust,
        Indicator::Population,
        Indicator::Gdp,
        Indicator::Viirs,
        Indicator::IncomeInv,
        Indicator::VegAccess,
        Indicator::Fragmentation,
        Indicator::BioTrend,
        Indicator::GdpPc,
        Indicator::Greenspace,
        Indicator::Services,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Indicator::Heat => "heat",
            Indicator::Dry => "dry",
            Indicator::Pluvial => "pluvial",
            Indicator::Dust => "dust",
            Indicator::Population => "population",
            Indicator::Gdp => "gdp",
            Indicator::Viirs => "viirs",
            Indicator::IncomeInv => "income_inv",
            Indicator::VegAccess => "veg_access",
            Indicator::Fragmentation => "fragmentation",
            Indicator::BioTrend => "bio_trend",
            Indicator::GdpPc => "gdp_pc",
            Indicator::Greenspace => "greenspace",
            Indicator::Services => "services",
        }
    }

    pub fn composite(self) -> CompositeKind {
        match self {
            Indicator::Heat | Indicator::Dry | Indicator::Pluvial | Indicator::Dust => {
                CompositeKind::Hazard
            }
            Indicator::Population | Indicator::Gdp | Indicator::Viirs => CompositeKind::Exposure,
            Indicator::IncomeInv
            | Indicator::VegAccess
            | Indicator::Fragmentation
            | Indicator::BioTrend => CompositeKind::Vulnerability,
            Indicator::GdpPc | Indicator::Greenspace | Indicator::Services => {
                CompositeKind::AdaptiveCapacity
            }
        }
    }

    /// Declared orientation. Never inferred from the data.
    pub fn orientation(self) -> Orientation {
        match self {
            Indicator::IncomeInv | Indicator::BioTrend => Orientation::Inverted,
            _ => Orientation::Direct,
        }
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw per-city indicator values. `None` (or an absent key) means unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawIndicatorSet {
    values: BTreeMap<Indicator, Option<f64>>,
}

impl RawIndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, indicator: Indicator, value: f64) -> Self {
        self.values.insert(indicator, Some(value));
        self
    }

    pub fn set(&mut self, indicator: Indicator, value: Option<f64>) {
        self.values.insert(indicator, value);
    }

    /// Known, finite value for an indicator. NaN and infinities count as unknown.
    pub fn get(&self, indicator: Indicator) -> Option<f64> {
        self.values
            .get(&indicator)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
    }

    /// Indicators with no usable value, in roster order.
    pub fn missing(&self) -> Vec<Indicator> {
        Indicator::ALL
            .into_iter()
            .filter(|&i| self.get(i).is_none())
            .collect()
    }
}

/// Normalized per-city values, each in [0,1]. Absent keys are missing indicators.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedIndicatorSet {
    values: BTreeMap<Indicator, f64>,
}

impl NormalizedIndicatorSet {
    pub(crate) fn insert(&mut self, indicator: Indicator, value: f64) {
        self.values.insert(indicator, value.clamp(0.0, 1.0));
    }

    pub fn get(&self, indicator: Indicator) -> Option<f64> {
        self.values.get(&indicator).copied()
    }

    pub fn is_missing(&self, indicator: Indicator) -> bool {
        !self.values.contains_key(&indicator)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Indicator, f64)> + '_ {
        self.values.iter().map(|(&i, &v)| (i, v))
    }
}
