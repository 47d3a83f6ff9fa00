use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::profile::SectorProfile;
use crate::error::ValuationError;
use crate::EngineResult;

/// Code of the profile every unmatched lookup falls back to.
pub const DEFAULT_SECTOR: &str = "default";

/// Shortest classification prefix considered by the hierarchical match.
const MIN_PREFIX_LEN: usize = 2;

/// How a lookup reached its profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Prefix { prefix: String },
    Default,
}

#[derive(Debug, Clone)]
pub struct SectorMatch<'a> {
    pub profile: &'a SectorProfile,
    pub kind: MatchKind,
}

/// Canonical form of a sector code: trimmed, lowercase, without the
/// separators classification codes are written with (`.`, `-`, spaces).
pub fn normalize_code(code: &str) -> String {
    code.trim()
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Immutable catalogue of sector profiles, built once at startup.
#[derive(Debug)]
pub struct SectorRegistry {
    profiles: Vec<SectorProfile>,
    by_code: HashMap<String, usize>,
    by_prefix: HashMap<String, usize>,
    longest_prefix: usize,
    default_index: usize,
}

impl SectorRegistry {
    /// Validate every profile and index codes, aliases and prefixes.
    ///
    /// Fails on weight totals outside tolerance, missing ranges, duplicate
    /// keys, or a missing `default` profile.
    pub fn from_profiles(profiles: Vec<SectorProfile>) -> EngineResult<Self> {
        let mut by_code = HashMap::new();
        let mut by_prefix = HashMap::new();
        let mut longest_prefix = 0;

        for (idx, profile) in profiles.iter().enumerate() {
            profile.validate()?;

            let keys = std::iter::once(&profile.code).chain(profile.aliases.iter());
            for key in keys {
                let norm = normalize_code(key);
                if norm.is_empty() {
                    return Err(ValuationError::Configuration(format!(
                        "sector '{}' has an empty code or alias",
                        profile.code
                    )));
                }
                if let Some(prev) = by_code.insert(norm.clone(), idx) {
                    return Err(ValuationError::Configuration(format!(
                        "sector key '{norm}' is claimed by both '{}' and '{}'",
                        profiles[prev].code, profile.code
                    )));
                }
            }

            for prefix in &profile.classification_prefixes {
                let norm = normalize_code(prefix);
                if norm.len() < MIN_PREFIX_LEN {
                    return Err(ValuationError::Configuration(format!(
                        "sector '{}': prefix '{prefix}' is shorter than {MIN_PREFIX_LEN} characters",
                        profile.code
                    )));
                }
                longest_prefix = longest_prefix.max(norm.len());
                if let Some(prev) = by_prefix.insert(norm.clone(), idx) {
                    return Err(ValuationError::Configuration(format!(
                        "classification prefix '{norm}' is claimed by both '{}' and '{}'",
                        profiles[prev].code, profile.code
                    )));
                }
            }
        }

        let default_index = *by_code.get(DEFAULT_SECTOR).ok_or_else(|| {
            ValuationError::Configuration(format!(
                "no '{DEFAULT_SECTOR}' sector profile is configured"
            ))
        })?;

        debug!(profiles = profiles.len(), prefixes = by_prefix.len(), "sector registry built");

        Ok(SectorRegistry {
            profiles,
            by_code,
            by_prefix,
            longest_prefix,
            default_index,
        })
    }

    /// Resolve a sector code. Never fails: exact code/alias first, then the
    /// longest configured classification prefix, then the default profile.
    pub fn lookup(&self, sector_code: &str) -> SectorMatch<'_> {
        let norm = normalize_code(sector_code);

        if let Some(&idx) = self.by_code.get(&norm) {
            return SectorMatch {
                profile: &self.profiles[idx],
                kind: MatchKind::Exact,
            };
        }

        let upper = norm.len().min(self.longest_prefix);
        for len in (MIN_PREFIX_LEN..=upper).rev() {
            if !norm.is_char_boundary(len) {
                continue;
            }
            let prefix = &norm[..len];
            if let Some(&idx) = self.by_prefix.get(prefix) {
                debug!(code = %sector_code, prefix, "sector matched by prefix");
                return SectorMatch {
                    profile: &self.profiles[idx],
                    kind: MatchKind::Prefix {
                        prefix: prefix.to_string(),
                    },
                };
            }
        }

        warn!(code = %sector_code, "unknown sector, using default profile");
        SectorMatch {
            profile: self.default_profile(),
            kind: MatchKind::Default,
        }
    }

    /// Exact lookup only, without fallback.
    pub fn get(&self, sector_code: &str) -> Option<&SectorProfile> {
        self.by_code
            .get(&normalize_code(sector_code))
            .map(|&idx| &self.profiles[idx])
    }

    pub fn default_profile(&self) -> &SectorProfile {
        &self.profiles[self.default_index]
    }

    pub fn profiles(&self) -> &[SectorProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sector::profile::{MethodId, MethodWeight, MultipleRange};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn profile(code: &str, aliases: &[&str], prefixes: &[&str]) -> SectorProfile {
        SectorProfile {
            code: code.into(),
            name: code.to_uppercase(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
            classification_prefixes: prefixes.iter().map(|s| s.to_string()).collect(),
            methods: vec![MethodWeight {
                method: MethodId::EbitdaMultiple,
                weight: dec!(1),
            }],
            revenue_multiple: None,
            ebitda_multiple: Some(MultipleRange {
                min: dec!(4),
                max: dec!(6),
            }),
            benchmark_net_margin: None,
            asset_floor: false,
            adjustment_factors: vec![],
            questions: vec![],
        }
    }

    fn registry() -> SectorRegistry {
        SectorRegistry::from_profiles(vec![
            profile("default", &[], &[]),
            profile("restaurant", &["56.10A"], &["56"]),
            profile("fast_food", &[], &["56.10C"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  56.10-A "), "5610a");
        assert_eq!(normalize_code("Restaurant"), "restaurant");
    }

    #[test]
    fn test_exact_match_on_code_and_alias() {
        let r = registry();
        assert_eq!(r.lookup("RESTAURANT").profile.code, "restaurant");
        let m = r.lookup("56.10a");
        assert_eq!(m.profile.code, "restaurant");
        assert_eq!(m.kind, MatchKind::Exact);
    }

    #[test]
    fn test_longest_prefix_wins() {
        let r = registry();
        let m = r.lookup("56.10C");
        assert_eq!(m.profile.code, "fast_food");
        let m = r.lookup("56.30Z");
        assert_eq!(m.profile.code, "restaurant");
        assert_eq!(
            m.kind,
            MatchKind::Prefix {
                prefix: "56".into()
            }
        );
    }

    #[test]
    fn test_unknown_falls_back_to_default() {
        let r = registry();
        let m = r.lookup("99.99Z");
        assert_eq!(m.profile.code, "default");
        assert_eq!(m.kind, MatchKind::Default);
        assert_eq!(r.lookup("").kind, MatchKind::Default);
    }

    #[test]
    fn test_missing_default_is_fatal() {
        let err = SectorRegistry::from_profiles(vec![profile("restaurant", &[], &[])]).unwrap_err();
        assert!(err.to_string().contains("default"));
    }

    #[test]
    fn test_duplicate_alias_is_fatal() {
        let err = SectorRegistry::from_profiles(vec![
            profile("default", &[], &[]),
            profile("a", &["x"], &[]),
            profile("b", &["X"], &[]),
        ])
        .unwrap_err();
        assert!(matches!(err, ValuationError::Configuration(_)));
    }

    #[test]
    fn test_bad_weights_fail_load() {
        let mut bad = profile("bad", &[], &[]);
        bad.methods[0].weight = dec!(0.9);
        let err =
            SectorRegistry::from_profiles(vec![profile("default", &[], &[]), bad]).unwrap_err();
        assert!(matches!(err, ValuationError::WeightConfiguration { .. }));
    }

    #[test]
    fn test_get_is_exact_only() {
        let r = registry();
        assert!(r.get("56.30Z").is_none());
        assert!(r.get("restaurant").is_some());
    }
}
