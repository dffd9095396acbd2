//! Cancellation refund policy.
//!
//! The refund depends only on how long before the ceremony the booking is
//! cancelled:
//!
//! | time before event | refund |
//! |-------------------|--------|
//! | < 24h (or past)   | 0%     |
//! | 24h – 48h         | 75%    |
//! | 48h – 72h         | 90%    |
//! | ≥ 72h             | 100%   |
//!
//! Lower bounds are inclusive. `now` is always passed in, so the same inputs
//! give the same quote.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, ResultEngine};

/// `(minimum hours before the event, refund percent)`, highest first.
const REFUND_TIERS: [(i64, u8); 3] = [(72, 100), (48, 90), (24, 75)];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundQuote {
    pub percent: u8,
    pub amount: Money,
}

/// Refund percent for a cancellation happening `until_event` before the event.
pub fn refund_percent(until_event: TimeDelta) -> u8 {
    REFUND_TIERS
        .iter()
        .find(|(hours, _)| until_event >= TimeDelta::hours(*hours))
        .map_or(0, |(_, percent)| *percent)
}

/// Computes the refund owed when a booking is cancelled at `now`.
pub fn compute_refund(
    event_date: DateTime<Utc>,
    now: DateTime<Utc>,
    total_price: Money,
) -> ResultEngine<RefundQuote> {
    if total_price.is_negative() {
        return Err(EngineError::InvalidAmount(format!(
            "total price must be >= 0, got {total_price}"
        )));
    }
    let percent = refund_percent(event_date - now);
    Ok(RefundQuote {
        percent,
        amount: total_price.percent_of(percent)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()
    }

    fn quote(hours: i64, total: i64) -> RefundQuote {
        compute_refund(now() + TimeDelta::hours(hours), now(), Money::new(total)).unwrap()
    }

    #[test]
    fn ten_hours_before_refunds_nothing() {
        assert_eq!(
            quote(10, 10_000),
            RefundQuote {
                percent: 0,
                amount: Money::ZERO
            }
        );
    }

    #[test]
    fn thirty_six_hours_before_refunds_75() {
        assert_eq!(
            quote(36, 10_000),
            RefundQuote {
                percent: 75,
                amount: Money::new(7_500)
            }
        );
    }

    #[test]
    fn hundred_hours_before_refunds_everything() {
        assert_eq!(
            quote(100, 10_000),
            RefundQuote {
                percent: 100,
                amount: Money::new(10_000)
            }
        );
    }

    #[test]
    fn tier_boundaries_are_inclusive_below() {
        let just_under = |h: i64| {
            refund_percent(TimeDelta::hours(h) - TimeDelta::seconds(1))
        };
        assert_eq!(refund_percent(TimeDelta::hours(24)), 75);
        assert_eq!(just_under(24), 0);
        assert_eq!(refund_percent(TimeDelta::hours(48)), 90);
        assert_eq!(just_under(48), 75);
        assert_eq!(refund_percent(TimeDelta::hours(72)), 100);
        assert_eq!(just_under(72), 90);
    }

    #[test]
    fn past_events_refund_nothing() {
        assert_eq!(quote(-5, 4_000).percent, 0);
        assert_eq!(quote(-5, 4_000).amount, Money::ZERO);
    }

    #[test]
    fn percent_never_decreases_with_more_notice() {
        let mut last = 0;
        for minutes in (-600..6_000).step_by(7) {
            let percent = refund_percent(TimeDelta::minutes(minutes));
            assert!([0, 75, 90, 100].contains(&percent));
            assert!(percent >= last);
            last = percent;
        }
    }

    #[test]
    fn amount_rounds_to_whole_rupees() {
        assert_eq!(quote(30, 1_001).amount, Money::new(751));
        assert_eq!(quote(50, 1_005).amount, Money::new(905));
    }

    #[test]
    fn negative_total_is_rejected() {
        assert!(compute_refund(now(), now(), Money::new(-1)).is_err());
    }
}
