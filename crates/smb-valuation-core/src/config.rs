//! Engine configuration.
//!
//! Sector profiles, benchmark schedules and every business threshold are data.
//! A complete configuration ships embedded in the crate (`data/default_config.yaml`)
//! and can be replaced by a YAML or JSON file at startup. Section defaults below
//! mirror the embedded file so that partial files stay usable.

use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ValuationError;
use crate::sector::SectorProfile;
use crate::types::{Money, Multiple, Rate};
use crate::EngineResult;

const EMBEDDED_CONFIG: &str = include_str!("../data/default_config.yaml");

pub const DEFAULT_DISCOUNT_CEILING: Rate = dec!(0.45);
pub const DEFAULT_MARKET_MIN_SAMPLE: u32 = 3;
pub const DEFAULT_MARKET_WEIGHT: Rate = dec!(0.30);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cap on the cumulative discount factor
    #[serde(default = "default_discount_ceiling")]
    pub discount_ceiling: Rate,
    #[serde(default)]
    pub market: MarketSettings,
    #[serde(default)]
    pub multiple_bands: MultipleBands,
    /// Normative owner compensation by revenue band, ascending
    #[serde(default = "default_owner_compensation")]
    pub owner_compensation: Vec<CompensationBand>,
    #[serde(default)]
    pub adjustments: AdjustmentRates,
    #[serde(default)]
    pub dcf: DcfSettings,
    #[serde(default)]
    pub asset: AssetSettings,
    #[serde(default)]
    pub scanner: ScannerThresholds,
    #[serde(default)]
    pub confidence: ConfidenceSettings,
    pub sectors: Vec<SectorProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSettings {
    /// Fewest observed transactions before market multiples are blended in
    pub min_sample: u32,
    /// Share of the observed multiple in the blended range
    pub market_weight: Rate,
}

impl Default for MarketSettings {
    fn default() -> Self {
        MarketSettings {
            min_sample: DEFAULT_MARKET_MIN_SAMPLE,
            market_weight: DEFAULT_MARKET_WEIGHT,
        }
    }
}

/// Relative deltas applied to both ends of a multiple range.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MultipleBands {
    pub size: Vec<SizeBand>,
    pub location: Vec<LocationBand>,
    pub growth: Vec<GrowthBand>,
    /// Bound on any single band's delta
    pub max_band_delta: Rate,
    /// Bound on the summed delta
    pub max_total_delta: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeBand {
    /// Inclusive upper revenue bound; `None` closes the table
    #[serde(default)]
    pub revenue_up_to: Option<Money>,
    pub delta: Rate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationTier {
    Prime,
    Urban,
    Standard,
    Rural,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationBand {
    pub tier: LocationTier,
    pub delta: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthBand {
    /// Band applies from this trailing growth rate upwards
    pub min_growth: Rate,
    pub delta: Rate,
}

impl Default for MultipleBands {
    fn default() -> Self {
        MultipleBands {
            size: vec![
                SizeBand {
                    revenue_up_to: Some(dec!(500000)),
                    delta: dec!(-0.10),
                },
                SizeBand {
                    revenue_up_to: Some(dec!(2000000)),
                    delta: Decimal::ZERO,
                },
                SizeBand {
                    revenue_up_to: Some(dec!(10000000)),
                    delta: dec!(0.05),
                },
                SizeBand {
                    revenue_up_to: None,
                    delta: dec!(0.10),
                },
            ],
            location: vec![
                LocationBand {
                    tier: LocationTier::Prime,
                    delta: dec!(0.05),
                },
                LocationBand {
                    tier: LocationTier::Urban,
                    delta: dec!(0.02),
                },
                LocationBand {
                    tier: LocationTier::Standard,
                    delta: Decimal::ZERO,
                },
                LocationBand {
                    tier: LocationTier::Rural,
                    delta: dec!(-0.05),
                },
            ],
            growth: vec![
                GrowthBand {
                    min_growth: dec!(-1),
                    delta: dec!(-0.10),
                },
                GrowthBand {
                    min_growth: dec!(-0.05),
                    delta: Decimal::ZERO,
                },
                GrowthBand {
                    min_growth: dec!(0.10),
                    delta: dec!(0.05),
                },
                GrowthBand {
                    min_growth: dec!(0.20),
                    delta: dec!(0.10),
                },
            ],
            max_band_delta: dec!(0.15),
            max_total_delta: dec!(0.25),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensationBand {
    #[serde(default)]
    pub revenue_up_to: Option<Money>,
    /// Gross chargeable compensation a hired manager would cost
    pub benchmark: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentRates {
    pub minority: Rate,
    pub illiquidity: Rate,
    pub key_person: KeyPersonRates,
    /// Fraction of the key-person discount kept when the owner commits to a
    /// transition period
    pub transition_relief: Rate,
    /// Ascending by `min_share`; the highest band reached applies
    pub concentration: Vec<ConcentrationBand>,
    pub litigation: Rate,
    /// Discount per restrictive shareholder-agreement clause
    pub agreement_clause: Rate,
    pub control_premium: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyPersonRates {
    pub low: Rate,
    pub medium: Rate,
    pub high: Rate,
}

impl Default for KeyPersonRates {
    fn default() -> Self {
        KeyPersonRates {
            low: dec!(0.05),
            medium: dec!(0.10),
            high: dec!(0.20),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcentrationBand {
    pub min_share: Rate,
    pub discount: Rate,
}

impl Default for AdjustmentRates {
    fn default() -> Self {
        AdjustmentRates {
            minority: dec!(0.20),
            illiquidity: dec!(0.15),
            key_person: KeyPersonRates::default(),
            transition_relief: dec!(0.5),
            concentration: vec![
                ConcentrationBand {
                    min_share: dec!(0.20),
                    discount: dec!(0.05),
                },
                ConcentrationBand {
                    min_share: dec!(0.30),
                    discount: dec!(0.10),
                },
                ConcentrationBand {
                    min_share: dec!(0.50),
                    discount: dec!(0.15),
                },
            ],
            litigation: dec!(0.05),
            agreement_clause: dec!(0.05),
            control_premium: dec!(0.15),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DcfSettings {
    pub horizon_years: u32,
    /// Central discount rate for a small private company
    pub discount_rate: Rate,
    /// Low/high estimates discount at `discount_rate ± rate_spread`
    pub rate_spread: Rate,
    pub terminal_growth: Rate,
    pub tax_rate: Rate,
    /// Share of EBITDA consumed by capex and working capital
    pub reinvestment_rate: Rate,
    pub growth_floor: Rate,
    pub growth_cap: Rate,
}

impl Default for DcfSettings {
    fn default() -> Self {
        DcfSettings {
            horizon_years: 5,
            discount_rate: dec!(0.12),
            rate_spread: dec!(0.02),
            terminal_growth: dec!(0.015),
            tax_rate: dec!(0.25),
            reinvestment_rate: dec!(0.30),
            growth_floor: dec!(-0.05),
            growth_cap: dec!(0.10),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// Haircut applied to net asset value for the low estimate
    pub liquidation_haircut: Rate,
}

impl Default for AssetSettings {
    fn default() -> Self {
        AssetSettings {
            liquidation_haircut: dec!(0.10),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerThresholds {
    pub receivable_days_watch: Decimal,
    pub receivable_days_alert: Decimal,
    /// Increase in receivable days vs N-1 that escalates severity
    pub receivable_days_trend: Decimal,
    pub inventory_growth_gap: Rate,
    pub margin_drop: Rate,
    pub leverage_max: Multiple,
    pub revenue_decline_watch: Rate,
    pub revenue_decline_alert: Rate,
    pub strong_growth: Rate,
    /// Cash as a share of revenue above which liquidity is noted as ample
    pub ample_cash_ratio: Rate,
    pub provision_growth_factor: Decimal,
    pub concentration_watch: Rate,
    pub concentration_alert: Rate,
    pub headcount_max: u32,
}

impl Default for ScannerThresholds {
    fn default() -> Self {
        ScannerThresholds {
            receivable_days_watch: dec!(45),
            receivable_days_alert: dec!(90),
            receivable_days_trend: dec!(15),
            inventory_growth_gap: dec!(0.30),
            margin_drop: dec!(0.03),
            leverage_max: dec!(4),
            revenue_decline_watch: dec!(0.05),
            revenue_decline_alert: dec!(0.15),
            strong_growth: dec!(0.20),
            ample_cash_ratio: dec!(0.25),
            provision_growth_factor: dec!(2),
            concentration_watch: dec!(0.30),
            concentration_alert: dec!(0.50),
            headcount_max: 5000,
        }
    }
}

/// Point deductions from 100 and the score cut-offs of each grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceSettings {
    pub missing_year: Decimal,
    pub missing_field: Decimal,
    pub partial_ebitda: Decimal,
    pub no_normalization: Decimal,
    pub high_anomaly: Decimal,
    pub medium_anomaly: Decimal,
    pub grade_a: Decimal,
    pub grade_b: Decimal,
    pub grade_c: Decimal,
    pub grade_d: Decimal,
}

impl Default for ConfidenceSettings {
    fn default() -> Self {
        ConfidenceSettings {
            missing_year: dec!(10),
            missing_field: dec!(4),
            partial_ebitda: dec!(5),
            no_normalization: dec!(15),
            high_anomaly: dec!(15),
            medium_anomaly: dec!(5),
            grade_a: dec!(85),
            grade_b: dec!(70),
            grade_c: dec!(55),
            grade_d: dec!(40),
        }
    }
}

fn default_discount_ceiling() -> Rate {
    DEFAULT_DISCOUNT_CEILING
}

fn default_owner_compensation() -> Vec<CompensationBand> {
    [
        (Some(dec!(250000)), dec!(35000)),
        (Some(dec!(500000)), dec!(45000)),
        (Some(dec!(1000000)), dec!(60000)),
        (Some(dec!(3000000)), dec!(80000)),
        (Some(dec!(10000000)), dec!(110000)),
        (None, dec!(150000)),
    ]
    .into_iter()
    .map(|(revenue_up_to, benchmark)| CompensationBand {
        revenue_up_to,
        benchmark,
    })
    .collect()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl EngineConfig {
    /// The configuration compiled into the crate.
    pub fn embedded() -> EngineResult<Self> {
        Self::from_yaml_str(EMBEDDED_CONFIG)
    }

    pub fn from_yaml_str(s: &str) -> EngineResult<Self> {
        let cfg: EngineConfig = serde_yaml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_str(s: &str) -> EngineResult<Self> {
        let cfg: EngineConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file.
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ValuationError::Configuration(format!("failed to read '{}': {e}", path.display()))
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&contents),
            other => Err(ValuationError::Configuration(format!(
                "unsupported configuration format {:?} for '{}'",
                other.unwrap_or(""),
                path.display()
            ))),
        }
    }

    /// Owner-compensation benchmark for a revenue level.
    pub fn compensation_benchmark(&self, revenue: Money) -> Option<Money> {
        self.owner_compensation
            .iter()
            .find(|b| b.revenue_up_to.map_or(true, |cap| revenue <= cap))
            .map(|b| b.benchmark)
    }

    /// Structural checks; sector profiles are validated by the registry.
    pub fn validate(&self) -> EngineResult<()> {
        let unit = |name: &str, v: Rate, allow_one: bool| -> EngineResult<()> {
            let upper_ok = if allow_one { v <= Decimal::ONE } else { v < Decimal::ONE };
            if v < Decimal::ZERO || !upper_ok {
                return Err(ValuationError::Configuration(format!(
                    "{name} must lie in [0, 1{} (got {v})",
                    if allow_one { "]" } else { ")" }
                )));
            }
            Ok(())
        };

        if self.discount_ceiling <= Decimal::ZERO {
            return Err(ValuationError::Configuration(
                "discount_ceiling must be positive".into(),
            ));
        }
        unit("discount_ceiling", self.discount_ceiling, true)?;
        if self.market.min_sample == 0 {
            return Err(ValuationError::Configuration(
                "market.min_sample must be at least 1".into(),
            ));
        }
        unit("market.market_weight", self.market.market_weight, true)?;

        let a = &self.adjustments;
        unit("adjustments.minority", a.minority, false)?;
        unit("adjustments.illiquidity", a.illiquidity, false)?;
        unit("adjustments.key_person.low", a.key_person.low, false)?;
        unit("adjustments.key_person.medium", a.key_person.medium, false)?;
        unit("adjustments.key_person.high", a.key_person.high, false)?;
        unit("adjustments.transition_relief", a.transition_relief, true)?;
        unit("adjustments.litigation", a.litigation, false)?;
        unit("adjustments.agreement_clause", a.agreement_clause, false)?;
        unit("adjustments.control_premium", a.control_premium, false)?;
        for (i, band) in a.concentration.iter().enumerate() {
            unit("adjustments.concentration.discount", band.discount, false)?;
            if i > 0 && band.min_share <= a.concentration[i - 1].min_share {
                return Err(ValuationError::Configuration(
                    "adjustments.concentration must be ascending by min_share".into(),
                ));
            }
        }

        let bands = &self.multiple_bands;
        unit("multiple_bands.max_band_delta", bands.max_band_delta, false)?;
        unit("multiple_bands.max_total_delta", bands.max_total_delta, false)?;
        check_ascending_caps(
            "multiple_bands.size",
            bands.size.iter().map(|b| b.revenue_up_to),
        )?;
        check_ascending_caps(
            "owner_compensation",
            self.owner_compensation.iter().map(|b| b.revenue_up_to),
        )?;
        if self.owner_compensation.is_empty() {
            return Err(ValuationError::Configuration(
                "owner_compensation schedule is empty".into(),
            ));
        }
        if bands
            .growth
            .windows(2)
            .any(|w| w[1].min_growth <= w[0].min_growth)
        {
            return Err(ValuationError::Configuration(
                "multiple_bands.growth must be ascending by min_growth".into(),
            ));
        }

        let d = &self.dcf;
        if d.horizon_years == 0 || d.horizon_years > 10 {
            return Err(ValuationError::Configuration(format!(
                "dcf.horizon_years must lie in 1..=10 (got {})",
                d.horizon_years
            )));
        }
        if d.rate_spread < Decimal::ZERO {
            return Err(ValuationError::Configuration(format!(
                "dcf.rate_spread must not be negative (got {})",
                d.rate_spread
            )));
        }
        if d.discount_rate - d.rate_spread <= d.terminal_growth {
            return Err(ValuationError::Configuration(
                "dcf.discount_rate - dcf.rate_spread must exceed dcf.terminal_growth".into(),
            ));
        }
        if d.growth_floor > d.growth_cap {
            return Err(ValuationError::Configuration(
                "dcf.growth_floor must not exceed dcf.growth_cap".into(),
            ));
        }
        unit("dcf.tax_rate", d.tax_rate, false)?;
        unit("dcf.reinvestment_rate", d.reinvestment_rate, false)?;
        unit("asset.liquidation_haircut", self.asset.liquidation_haircut, false)?;

        let c = &self.confidence;
        if !(c.grade_a > c.grade_b && c.grade_b > c.grade_c && c.grade_c > c.grade_d) {
            return Err(ValuationError::Configuration(
                "confidence grade cut-offs must be strictly descending".into(),
            ));
        }
        Ok(())
    }
}

/// Bands closed by `None` must be strictly ascending and `None` may only be last.
fn check_ascending_caps(
    name: &str,
    caps: impl Iterator<Item = Option<Money>>,
) -> EngineResult<()> {
    let mut prev: Option<Money> = None;
    let mut closed = false;
    for cap in caps {
        if closed {
            return Err(ValuationError::Configuration(format!(
                "{name}: an open-ended band must be last"
            )));
        }
        match cap {
            None => closed = true,
            Some(c) => {
                if prev.is_some_and(|p| c <= p) {
                    return Err(ValuationError::Configuration(format!(
                        "{name} must be ascending by revenue_up_to"
                    )));
                }
                prev = Some(c);
            }
        }
    }
    Ok(())
}
