//! Risk severity levels and the total order over them.

use serde::{Deserialize, Serialize};

/// Severity of a detected threat or aggregated result.
///
/// Ordered `Low < Medium < High < Critical`; derive the default `Ord` from
/// declaration order so `max()` over an iterator picks the most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Lowercase string form, used in log formatting and serialized payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for RiskLevel {
    fn default() -> Self {
        Self::Low
    }
}

/// `max` over a set of severities; `None` (empty input) maps to `Low` by
/// callers that need the spec's "absent any findings, `low`" default.
pub fn max_risk_level<I: IntoIterator<Item = RiskLevel>>(levels: I) -> Option<RiskLevel> {
    levels.into_iter().max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn total_order() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn max_over_empty_is_none() {
        assert_eq!(max_risk_level(std::iter::empty()), None);
    }

    #[test]
    fn max_picks_critical() {
        let levels = [RiskLevel::Low, RiskLevel::Critical, RiskLevel::Medium];
        assert_eq!(max_risk_level(levels), Some(RiskLevel::Critical));
    }

    fn rank(level: RiskLevel) -> u8 {
        match level {
            RiskLevel::Low => 0,
            RiskLevel::Medium => 1,
            RiskLevel::High => 2,
            RiskLevel::Critical => 3,
        }
    }

    fn any_risk_level() -> impl Strategy<Value = RiskLevel> {
        prop_oneof![
            Just(RiskLevel::Low),
            Just(RiskLevel::Medium),
            Just(RiskLevel::High),
            Just(RiskLevel::Critical),
        ]
    }

    proptest! {
        /// Derived `Ord` must agree with the spec's declared severity rank
        /// (`Low < Medium < High < Critical`) for every pair, not just the
        /// adjacent pairs the unit test above checks.
        #[test]
        fn ord_matches_declared_rank(a in any_risk_level(), b in any_risk_level()) {
            prop_assert_eq!(a.cmp(&b), rank(a).cmp(&rank(b)));
        }

        /// `max_risk_level` over any non-empty multiset always returns the
        /// element with the highest declared rank, independent of input
        /// order (spec §8: "overallRisk = max of per-finding severities").
        #[test]
        fn max_risk_level_matches_highest_rank(levels in prop::collection::vec(any_risk_level(), 1..20)) {
            let expected_rank = levels.iter().copied().map(rank).max().unwrap();
            let got = max_risk_level(levels).unwrap();
            prop_assert_eq!(rank(got), expected_rank);
        }
    }
}
