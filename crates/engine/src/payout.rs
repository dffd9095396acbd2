//! Pandit payout computation and travel reconciliation.
//!
//! The net payout of a booking is
//!
//! ```text
//! dakshina - platform_fee + travel + food_allowance + samagri
//! ```
//!
//! where the platform fee was frozen when the pandit accepted the booking.
//! A booking whose claimed travel cost strays from the platform estimate by
//! more than the tolerance is flagged as a discrepancy and cannot be paid out
//! until an admin resolves it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Booking, BookingStatus, EngineError, Money, PayoutStatus, ResultEngine};

/// Fee schedule and reconciliation settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutPolicy {
    /// Share of the dakshina kept by the platform.
    pub platform_fee_percent: u8,
    /// Largest travel difference that is still treated as rounding noise.
    pub discrepancy_tolerance: Money,
}

impl Default for PayoutPolicy {
    fn default() -> Self {
        Self {
            platform_fee_percent: 15,
            discrepancy_tolerance: Money::new(100),
        }
    }
}

impl PayoutPolicy {
    pub fn validate(&self) -> ResultEngine<()> {
        if self.platform_fee_percent > 100 {
            return Err(EngineError::InvalidAmount(format!(
                "platform fee must be <= 100%, got {}%",
                self.platform_fee_percent
            )));
        }
        if self.discrepancy_tolerance.is_negative() {
            return Err(EngineError::InvalidAmount(
                "discrepancy tolerance must be >= 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn platform_fee(&self, dakshina: Money) -> ResultEngine<Money> {
        dakshina.percent_of(self.platform_fee_percent)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    Dakshina,
    PlatformFee,
    Travel,
    FoodAllowance,
    Samagri,
}

impl LineItemKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Dakshina => "Dakshina",
            Self::PlatformFee => "Platform fee",
            Self::Travel => "Travel reimbursement",
            Self::FoodAllowance => "Food allowance",
            Self::Samagri => "Samagri reimbursement",
        }
    }
}

/// One signed row of the payout breakdown (the fee is negative).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub kind: LineItemKind,
    pub amount: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutBreakdown {
    pub net: Money,
    pub line_items: Vec<LineItem>,
}

/// Computes the net payout from the booking snapshot alone.
pub fn compute_payout(booking: &Booking) -> ResultEngine<PayoutBreakdown> {
    let platform_fee = booking
        .platform_fee
        .ok_or_else(|| EngineError::MissingPrecondition {
            booking: booking.booking_number.clone(),
            field: "platform_fee",
        })?;

    let line_items = vec![
        LineItem {
            kind: LineItemKind::Dakshina,
            amount: booking.dakshina_amount,
        },
        LineItem {
            kind: LineItemKind::PlatformFee,
            amount: Money::ZERO - platform_fee,
        },
        LineItem {
            kind: LineItemKind::Travel,
            amount: booking.travel_cost(),
        },
        LineItem {
            kind: LineItemKind::FoodAllowance,
            amount: booking.food_allowance_amount,
        },
        LineItem {
            kind: LineItemKind::Samagri,
            amount: booking.samagri_amount,
        },
    ];

    let mut net = Money::ZERO;
    for item in &line_items {
        if item.kind != LineItemKind::PlatformFee && item.amount.is_negative() {
            return Err(EngineError::InvalidAmount(format!(
                "{} must be >= 0, got {}",
                item.kind.label(),
                item.amount
            )));
        }
        net = net
            .checked_add(item.amount)
            .ok_or_else(|| EngineError::InvalidAmount("payout too large".to_string()))?;
    }
    if net.is_negative() {
        return Err(EngineError::InvalidAmount(format!(
            "booking {}: payout would be negative ({net})",
            booking.booking_number
        )));
    }

    Ok(PayoutBreakdown { net, line_items })
}

/// `true` when the claim differs from the estimate by more than `tolerance`.
pub fn flag_discrepancy(claimed: Money, calculated: Money, tolerance: Money) -> bool {
    claimed.abs_diff(calculated) > tolerance.rupees().unsigned_abs()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Upi,
    BankTransfer,
    Cheque,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upi => "UPI",
            Self::BankTransfer => "BANK_TRANSFER",
            Self::Cheque => "CHEQUE",
            Self::Cash => "CASH",
        }
    }
}

impl core::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for PaymentMethod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "UPI" => Ok(Self::Upi),
            "BANK_TRANSFER" | "NEFT" | "IMPS" => Ok(Self::BankTransfer),
            "CHEQUE" => Ok(Self::Cheque),
            "CASH" => Ok(Self::Cash),
            other => Err(EngineError::InvalidAmount(format!(
                "unsupported payment method: {other}"
            ))),
        }
    }
}

/// Payment details the admin enters when approving a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub transaction_ref: String,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
}

impl PaymentDetails {
    pub fn validate(&self) -> ResultEngine<()> {
        if self.transaction_ref.trim().is_empty() {
            return Err(EngineError::InvalidAmount(
                "transaction reference must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Checks the three preconditions of a payout approval.
pub fn ensure_payout_eligible(booking: &Booking) -> ResultEngine<()> {
    let not_eligible = |reason| EngineError::PayoutNotEligible {
        booking: booking.booking_number.clone(),
        reason,
    };
    if booking.status != BookingStatus::Completed {
        return Err(not_eligible("booking is not completed"));
    }
    if booking.payout.status != PayoutStatus::Pending {
        return Err(not_eligible("payout already completed"));
    }
    if booking.discrepancy {
        return Err(EngineError::DiscrepancyBlocked {
            booking: booking.booking_number.clone(),
        });
    }
    Ok(())
}

#[derive(Debug, PartialEq)]
pub struct BatchFailure {
    pub booking_id: Uuid,
    pub error: EngineError,
}

/// Result of a batch approval; every id lands in exactly one list.
#[derive(Debug, Default, PartialEq)]
pub struct BatchOutcome {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<BatchFailure>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::NewBooking;

    fn completed_booking() -> Booking {
        let mut booking = Booking::new(
            NewBooking {
                booking_number: "HPJ-9921".to_string(),
                customer_id: "cust-1".to_string(),
                event_date: Utc::now(),
                total_amount: Money::new(3_000),
                dakshina_amount: Money::new(2_100),
                travel_required: true,
                food_allowance_amount: Money::new(200),
                samagri_amount: Money::ZERO,
            },
            Utc::now(),
        )
        .unwrap();
        booking.status = BookingStatus::Completed;
        booking.platform_fee = Some(Money::new(200));
        booking.calculated_travel_cost = Some(Money::new(500));
        booking
    }

    #[test]
    fn net_payout_adds_reimbursements_and_subtracts_fee() {
        let breakdown = compute_payout(&completed_booking()).unwrap();
        assert_eq!(breakdown.net, Money::new(2_600));
        assert_eq!(breakdown.line_items.len(), 5);
        assert_eq!(
            breakdown.line_items[1],
            LineItem {
                kind: LineItemKind::PlatformFee,
                amount: Money::new(-200)
            }
        );
    }

    #[test]
    fn payout_is_deterministic() {
        let booking = completed_booking();
        assert_eq!(
            compute_payout(&booking).unwrap(),
            compute_payout(&booking).unwrap()
        );
    }

    #[test]
    fn payout_needs_frozen_fee() {
        let mut booking = completed_booking();
        booking.platform_fee = None;
        assert_eq!(
            compute_payout(&booking),
            Err(EngineError::MissingPrecondition {
                booking: "HPJ-9921".to_string(),
                field: "platform_fee"
            })
        );
    }

    #[test]
    fn default_fee_is_fifteen_percent() {
        let policy = PayoutPolicy::default();
        assert_eq!(policy.platform_fee(Money::new(2_000)).unwrap(), Money::new(300));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn discrepancy_beyond_tolerance_is_flagged() {
        assert!(flag_discrepancy(
            Money::new(1_200),
            Money::new(800),
            Money::new(100)
        ));
        assert!(!flag_discrepancy(
            Money::new(880),
            Money::new(800),
            Money::new(100)
        ));
        assert!(!flag_discrepancy(
            Money::new(900),
            Money::new(800),
            Money::new(100)
        ));
    }

    #[test]
    fn discrepancy_is_symmetric() {
        for (a, b) in [(1_200, 800), (0, 101), (500, 500), (99, 0)] {
            let tolerance = Money::new(100);
            assert_eq!(
                flag_discrepancy(Money::new(a), Money::new(b), tolerance),
                flag_discrepancy(Money::new(b), Money::new(a), tolerance)
            );
        }
    }

    #[test]
    fn flagged_booking_is_blocked() {
        let mut booking = completed_booking();
        booking.discrepancy = true;
        assert_eq!(
            ensure_payout_eligible(&booking),
            Err(EngineError::DiscrepancyBlocked {
                booking: "HPJ-9921".to_string()
            })
        );
    }

    #[test]
    fn only_completed_pending_bookings_are_eligible() {
        let mut booking = completed_booking();
        assert!(ensure_payout_eligible(&booking).is_ok());

        booking.payout.status = PayoutStatus::Completed;
        assert!(matches!(
            ensure_payout_eligible(&booking),
            Err(EngineError::PayoutNotEligible { .. })
        ));

        booking.payout.status = PayoutStatus::Pending;
        booking.status = BookingStatus::PujaInProgress;
        assert!(matches!(
            ensure_payout_eligible(&booking),
            Err(EngineError::PayoutNotEligible { .. })
        ));
    }

    #[test]
    fn payment_method_accepts_common_spellings() {
        assert_eq!(PaymentMethod::try_from("upi").unwrap(), PaymentMethod::Upi);
        assert_eq!(
            PaymentMethod::try_from("bank transfer").unwrap(),
            PaymentMethod::BankTransfer
        );
        assert_eq!(
            PaymentMethod::try_from("NEFT").unwrap(),
            PaymentMethod::BankTransfer
        );
        assert!(PaymentMethod::try_from("paypal").is_err());
    }
}
