//! The module contains the budget configuration and the monitor mapping a
//! spending total to a status tier.
//!
//! Let $ratio = total / limit$. The tiers are:
//!
//! - `Unbounded` when $limit <= 0$
//! - `Safe` when $ratio < 0.50$
//! - `Caution` when $0.50 <= ratio < 0.90$
//! - `Near` when $0.90 <= ratio < 1.00$
//! - `Exceeded` when $ratio >= 1.00$, the only tier raising an alert
//!
//! Comparisons are done on integer cents so every boundary is exact.
use serde::{Deserialize, Serialize};

use crate::Money;

/// User-declared spending limit for the outing.
///
/// A zero limit means no limit. The configuration outlives sessions: closing
/// a tab does not reset it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    pub limit: Money,
    pub location: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetTier {
    Unbounded,
    Safe,
    Caution,
    Near,
    Exceeded,
}

impl BudgetTier {
    pub fn label(self) -> &'static str {
        match self {
            BudgetTier::Unbounded => "No limit set",
            BudgetTier::Safe => "Within budget",
            BudgetTier::Caution => "Watch your spending",
            BudgetTier::Near | BudgetTier::Exceeded => "Limit reached!",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BudgetStatus {
    pub tier: BudgetTier,
    pub alert: bool,
    /// `total / limit` as a whole percentage, clamped to 0..=100.
    pub progress_percent: u8,
}

/// Map the current total against the limit. Stateless: nothing from previous
/// calls is taken into account.
pub fn evaluate(total: Money, limit: Money) -> BudgetStatus {
    if limit.cents() <= 0 {
        return BudgetStatus {
            tier: BudgetTier::Unbounded,
            alert: false,
            progress_percent: 0,
        };
    }

    let total_cents = i128::from(total.cents());
    let limit_cents = i128::from(limit.cents());

    let tier = if total_cents * 100 < limit_cents * 50 {
        BudgetTier::Safe
    } else if total_cents * 100 < limit_cents * 90 {
        BudgetTier::Caution
    } else if total_cents < limit_cents {
        BudgetTier::Near
    } else {
        BudgetTier::Exceeded
    };

    BudgetStatus {
        tier,
        alert: tier == BudgetTier::Exceeded,
        progress_percent: progress_percent(total_cents, limit_cents),
    }
}

fn progress_percent(total_cents: i128, limit_cents: i128) -> u8 {
    let percent = (total_cents * 100 * 2 + limit_cents) / (limit_cents * 2);
    percent.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(total: i64, limit: i64) -> BudgetTier {
        evaluate(Money::new(total), Money::new(limit)).tier
    }

    #[test]
    fn zero_or_negative_limit_is_unbounded() {
        assert_eq!(tier(5000, 0), BudgetTier::Unbounded);
        assert_eq!(tier(5000, -100), BudgetTier::Unbounded);
        assert!(!evaluate(Money::new(5000), Money::ZERO).alert);
    }

    #[test]
    fn boundaries_belong_to_higher_tier() {
        assert_eq!(tier(4999, 10000), BudgetTier::Safe);
        assert_eq!(tier(5000, 10000), BudgetTier::Caution);
        assert_eq!(tier(8999, 10000), BudgetTier::Caution);
        assert_eq!(tier(9000, 10000), BudgetTier::Near);
        assert_eq!(tier(9999, 10000), BudgetTier::Near);
        assert_eq!(tier(10000, 10000), BudgetTier::Exceeded);
        assert_eq!(tier(25000, 10000), BudgetTier::Exceeded);
    }

    #[test]
    fn boundaries_hold_for_odd_limits() {
        // 0.5 * 3.33 = 1.665, not representable in cents.
        assert_eq!(tier(166, 333), BudgetTier::Safe);
        assert_eq!(tier(167, 333), BudgetTier::Caution);
        // 0.9 * 3.33 = 2.997
        assert_eq!(tier(299, 333), BudgetTier::Caution);
        assert_eq!(tier(300, 333), BudgetTier::Near);
    }

    #[test]
    fn only_exceeded_alerts() {
        let near = evaluate(Money::new(9500), Money::new(10000));
        assert_eq!(near.tier, BudgetTier::Near);
        assert!(!near.alert);

        let exceeded = evaluate(Money::new(10000), Money::new(10000));
        assert_eq!(exceeded.tier, BudgetTier::Exceeded);
        assert!(exceeded.alert);
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(evaluate(Money::new(2500), Money::new(10000)).progress_percent, 25);
        assert_eq!(evaluate(Money::new(30000), Money::new(10000)).progress_percent, 100);
        assert_eq!(evaluate(Money::new(-500), Money::new(10000)).progress_percent, 0);
        assert_eq!(evaluate(Money::new(1), Money::new(300)).progress_percent, 0);
    }

    #[test]
    fn labels_follow_tiers() {
        assert_eq!(BudgetTier::Safe.label(), "Within budget");
        assert_eq!(BudgetTier::Near.label(), BudgetTier::Exceeded.label());
    }
}
