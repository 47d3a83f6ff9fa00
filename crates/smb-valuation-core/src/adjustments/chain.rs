use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::AdjustmentRates;
use crate::error::ValuationError;
use crate::flags::ValuationFlag;
use crate::sector::{Direction, SectorProfile};
use crate::types::Rate;
use crate::EngineResult;

/// Stakes below this fraction carry a minority discount.
pub const CONTROL_THRESHOLD: Rate = dec!(0.5);

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPersonDependence {
    #[default]
    None,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorIntensity {
    Low,
    Medium,
    High,
}

/// Answer to one of the profile's sector-specific factors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorFactorAnswer {
    pub code: String,
    pub intensity: FactorIntensity,
}

/// Qualitative answers that drive the discount/premium chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitativeRisk {
    /// Fraction of the shares being valued, in (0, 1]
    pub ownership_fraction: Rate,
    pub key_person: KeyPersonDependence,
    /// Owner commits to an accompanied hand-over period
    pub transition_commitment: bool,
    /// Largest client's share of revenue
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_client_share: Option<Rate>,
    pub litigation: bool,
    /// Shares cannot be sold on a market
    pub illiquid_shares: bool,
    pub acquires_control: bool,
    /// Restrictive clauses of the shareholder agreement (approval, pre-emption, lock-up...)
    pub agreement_clauses: Vec<String>,
    pub sector_factors: Vec<SectorFactorAnswer>,
}

impl Default for QualitativeRisk {
    fn default() -> Self {
        QualitativeRisk {
            ownership_fraction: Decimal::ONE,
            key_person: KeyPersonDependence::None,
            transition_commitment: false,
            top_client_share: None,
            litigation: false,
            illiquid_shares: false,
            acquires_control: false,
            agreement_clauses: Vec::new(),
            sector_factors: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    KeyPerson,
    Concentration,
    Litigation,
    SectorFactor,
    Illiquidity,
    AgreementClause,
    Minority,
    ControlPremium,
}

/// One step of the discount/premium chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub kind: AdjustmentKind,
    pub direction: Direction,
    pub rate: Rate,
    /// Machine-readable rationale code
    pub rationale: String,
}

impl Adjustment {
    fn discount(kind: AdjustmentKind, rate: Rate, rationale: impl Into<String>) -> Self {
        Adjustment {
            kind,
            direction: Direction::Discount,
            rate,
            rationale: rationale.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Reject risk answers that cannot be valued.
pub fn validate_risk(risk: &QualitativeRisk) -> EngineResult<()> {
    let stake = risk.ownership_fraction;
    if stake <= Decimal::ZERO || stake > Decimal::ONE {
        return Err(ValuationError::invalid(
            "risk.ownership_fraction",
            format!("must lie in (0, 1] (got {stake})"),
        ));
    }
    if risk.acquires_control && stake <= CONTROL_THRESHOLD {
        return Err(ValuationError::invalid(
            "risk.acquires_control",
            format!("a stake of {stake} does not confer control"),
        ));
    }
    if let Some(share) = risk.top_client_share {
        if share < Decimal::ZERO || share > Decimal::ONE {
            return Err(ValuationError::invalid(
                "risk.top_client_share",
                format!("must lie in [0, 1] (got {share})"),
            ));
        }
    }
    for (i, clause) in risk.agreement_clauses.iter().enumerate() {
        if risk.agreement_clauses[..i].contains(clause) {
            return Err(ValuationError::invalid(
                "risk.agreement_clauses",
                format!("clause '{clause}' listed twice"),
            ));
        }
    }
    for (i, answer) in risk.sector_factors.iter().enumerate() {
        if risk.sector_factors[..i].iter().any(|a| a.code == answer.code) {
            return Err(ValuationError::invalid(
                "risk.sector_factors",
                format!("factor '{}' answered twice", answer.code),
            ));
        }
    }
    Ok(())
}

/// Build the ordered chain: key-person, concentration, litigation, sector
/// factors, illiquidity, agreement clauses, minority, control premium.
///
/// Sector-factor answers that the profile does not define are dropped with a
/// flag.
pub fn build_chain(
    risk: &QualitativeRisk,
    profile: &SectorProfile,
    rates: &AdjustmentRates,
) -> EngineResult<(Vec<Adjustment>, Vec<ValuationFlag>)> {
    validate_risk(risk)?;

    let mut chain = Vec::new();
    let mut flags = Vec::new();

    let key_person = match risk.key_person {
        KeyPersonDependence::None => None,
        KeyPersonDependence::Low => Some(("key_person.low", rates.key_person.low)),
        KeyPersonDependence::Medium => Some(("key_person.medium", rates.key_person.medium)),
        KeyPersonDependence::High => Some(("key_person.high", rates.key_person.high)),
    };
    if let Some((code, rate)) = key_person {
        if risk.transition_commitment {
            chain.push(Adjustment::discount(
                AdjustmentKind::KeyPerson,
                rate * rates.transition_relief,
                format!("{code}.with_transition"),
            ));
        } else {
            chain.push(Adjustment::discount(AdjustmentKind::KeyPerson, rate, code));
        }
    }

    if let Some(share) = risk.top_client_share {
        if let Some(band) = rates.concentration.iter().rev().find(|b| share >= b.min_share) {
            chain.push(Adjustment::discount(
                AdjustmentKind::Concentration,
                band.discount,
                format!("concentration.top_client_above_{}", band.min_share.normalize()),
            ));
        }
    }

    if risk.litigation {
        chain.push(Adjustment::discount(
            AdjustmentKind::Litigation,
            rates.litigation,
            "litigation.pending",
        ));
    }

    // Profile declaration order keeps the chain independent of answer order.
    for factor in &profile.adjustment_factors {
        let Some(answer) = risk.sector_factors.iter().find(|a| a.code == factor.code) else {
            continue;
        };
        let rate = match answer.intensity {
            FactorIntensity::Low => factor.impact_min,
            FactorIntensity::Medium => (factor.impact_min + factor.impact_max) / Decimal::TWO,
            FactorIntensity::High => factor.impact_max,
        };
        chain.push(Adjustment {
            kind: AdjustmentKind::SectorFactor,
            direction: factor.direction,
            rate,
            rationale: format!("sector.{}", factor.code),
        });
    }
    for answer in &risk.sector_factors {
        if profile.factor(&answer.code).is_none() {
            flags.push(ValuationFlag::SectorFactorIgnored {
                factor: answer.code.clone(),
            });
        }
    }

    if risk.illiquid_shares {
        chain.push(Adjustment::discount(
            AdjustmentKind::Illiquidity,
            rates.illiquidity,
            "illiquidity.unlisted_shares",
        ));
    }

    for clause in &risk.agreement_clauses {
        chain.push(Adjustment::discount(
            AdjustmentKind::AgreementClause,
            rates.agreement_clause,
            format!("clause.{clause}"),
        ));
    }

    if risk.ownership_fraction < CONTROL_THRESHOLD {
        chain.push(Adjustment::discount(
            AdjustmentKind::Minority,
            rates.minority,
            "minority.stake_below_half",
        ));
    }

    if risk.acquires_control {
        chain.push(Adjustment {
            kind: AdjustmentKind::ControlPremium,
            direction: Direction::Premium,
            rate: rates.control_premium,
            rationale: "control.majority_acquired".to_string(),
        });
    }

    Ok((chain, flags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use pretty_assertions::assert_eq;

    fn restaurant() -> SectorProfile {
        EngineConfig::embedded()
            .unwrap()
            .sectors
            .into_iter()
            .find(|s| s.code == "restaurant")
            .unwrap()
    }

    fn kinds(chain: &[Adjustment]) -> Vec<AdjustmentKind> {
        chain.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn test_minority_stake_with_key_person() {
        let risk = QualitativeRisk {
            ownership_fraction: dec!(0.30),
            key_person: KeyPersonDependence::High,
            ..Default::default()
        };
        let (chain, flags) = build_chain(&risk, &restaurant(), &AdjustmentRates::default()).unwrap();
        assert_eq!(kinds(&chain), vec![AdjustmentKind::KeyPerson, AdjustmentKind::Minority]);
        assert_eq!(chain[0].rate, dec!(0.20));
        assert_eq!(chain[1].rate, dec!(0.20));
        assert!(flags.is_empty());
    }

    #[test]
    fn test_transition_halves_key_person() {
        let risk = QualitativeRisk {
            key_person: KeyPersonDependence::High,
            transition_commitment: true,
            ..Default::default()
        };
        let (chain, _) = build_chain(&risk, &restaurant(), &AdjustmentRates::default()).unwrap();
        assert_eq!(chain[0].rate, dec!(0.10));
        assert_eq!(chain[0].rationale, "key_person.high.with_transition");
    }

    #[test]
    fn test_full_chain_order() {
        let risk = QualitativeRisk {
            ownership_fraction: dec!(0.8),
            key_person: KeyPersonDependence::Low,
            top_client_share: Some(dec!(0.35)),
            litigation: true,
            illiquid_shares: true,
            acquires_control: true,
            agreement_clauses: vec!["pre_emption".into()],
            sector_factors: vec![
                SectorFactorAnswer {
                    code: "short_lease".into(),
                    intensity: FactorIntensity::High,
                },
                SectorFactorAnswer {
                    code: "terrace".into(),
                    intensity: FactorIntensity::Medium,
                },
            ],
            ..Default::default()
        };
        let (chain, _) = build_chain(&risk, &restaurant(), &AdjustmentRates::default()).unwrap();
        assert_eq!(
            kinds(&chain),
            vec![
                AdjustmentKind::KeyPerson,
                AdjustmentKind::Concentration,
                AdjustmentKind::Litigation,
                AdjustmentKind::SectorFactor,
                AdjustmentKind::SectorFactor,
                AdjustmentKind::Illiquidity,
                AdjustmentKind::AgreementClause,
                AdjustmentKind::ControlPremium,
            ]
        );
        // Profile order: terrace before short_lease
        assert_eq!(chain[3].rationale, "sector.terrace");
        assert_eq!(chain[3].rate, dec!(0.055));
        assert_eq!(chain[3].direction, Direction::Premium);
        assert_eq!(chain[4].rate, dec!(0.15));
        assert_eq!(chain[1].rate, dec!(0.10));
    }

    #[test]
    fn test_unknown_factor_flagged() {
        let risk = QualitativeRisk {
            sector_factors: vec![SectorFactorAnswer {
                code: "patents".into(),
                intensity: FactorIntensity::Low,
            }],
            ..Default::default()
        };
        let (chain, flags) = build_chain(&risk, &restaurant(), &AdjustmentRates::default()).unwrap();
        assert!(chain.is_empty());
        assert_eq!(
            flags,
            vec![ValuationFlag::SectorFactorIgnored {
                factor: "patents".into()
            }]
        );
    }

    #[test]
    fn test_invalid_stake_rejected() {
        for stake in [Decimal::ZERO, dec!(1.2), dec!(-0.1)] {
            let risk = QualitativeRisk {
                ownership_fraction: stake,
                ..Default::default()
            };
            assert!(validate_risk(&risk).is_err());
        }
    }

    #[test]
    fn test_control_requires_majority() {
        let risk = QualitativeRisk {
            ownership_fraction: dec!(0.4),
            acquires_control: true,
            ..Default::default()
        };
        assert!(validate_risk(&risk).is_err());
    }

    #[test]
    fn test_half_stake_has_no_minority_discount() {
        let risk = QualitativeRisk {
            ownership_fraction: dec!(0.5),
            ..Default::default()
        };
        let (chain, _) = build_chain(&risk, &restaurant(), &AdjustmentRates::default()).unwrap();
        assert!(chain.is_empty());
    }
}
