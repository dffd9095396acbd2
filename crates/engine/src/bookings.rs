//! Booking primitives.
//!
//! A [`Booking`] is the snapshot every rule in the engine works on. It is
//! created by the matching process, advanced only by
//! [`transition`](crate::transition) and otherwise touched only through the
//! payout, reconciliation and review operations.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    BookingStatus, EngineError, Money, PaymentMethod, PayoutStatus, RefundQuote, ResultEngine,
    StatusChange,
};

/// Input of the matching process when it opens a booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBooking {
    pub booking_number: String,
    pub customer_id: String,
    pub event_date: DateTime<Utc>,
    pub total_amount: Money,
    pub dakshina_amount: Money,
    pub travel_required: bool,
    pub food_allowance_amount: Money,
    pub samagri_amount: Money,
}

/// Refund applied when a booking was cancelled or refunded. Never recomputed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedRefund {
    pub percent: u8,
    pub amount: Money,
    pub computed_at: DateTime<Utc>,
}

/// Admin decision that cleared a travel discrepancy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscrepancyResolution {
    pub resolved_by: String,
    pub resolved_at: DateTime<Utc>,
    pub note: Option<String>,
}

/// Disbursement record of the pandit payout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub status: PayoutStatus,
    /// Net amount owed to the pandit, set once the booking completes.
    pub amount: Option<Money>,
    pub reference: Option<String>,
    pub method: Option<PaymentMethod>,
    pub payment_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub booking_number: String,
    pub customer_id: String,
    pub pandit_id: Option<String>,
    pub event_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub status: BookingStatus,
    pub total_amount: Money,
    pub dakshina_amount: Money,
    /// Frozen when the pandit accepts; later fee changes never touch it.
    pub platform_fee: Option<Money>,
    pub travel_required: bool,
    pub calculated_travel_cost: Option<Money>,
    pub actual_travel_cost: Option<Money>,
    pub food_allowance_amount: Money,
    pub samagri_amount: Money,
    pub discrepancy: bool,
    pub discrepancy_resolution: Option<DiscrepancyResolution>,
    pub refund: Option<AppliedRefund>,
    pub payout: PayoutRecord,
    pub has_review: bool,
    pub version: i64,
    pub history: Vec<StatusChange>,
}

impl Booking {
    pub fn new(new: NewBooking, created_at: DateTime<Utc>) -> ResultEngine<Self> {
        let booking_number = new.booking_number.trim().to_string();
        if booking_number.is_empty() {
            return Err(EngineError::InvalidAmount(
                "booking number must not be empty".to_string(),
            ));
        }
        if new.customer_id.trim().is_empty() {
            return Err(EngineError::InvalidAmount(
                "customer must not be empty".to_string(),
            ));
        }
        for (label, amount) in [
            ("total_amount", new.total_amount),
            ("dakshina_amount", new.dakshina_amount),
            ("food_allowance_amount", new.food_allowance_amount),
            ("samagri_amount", new.samagri_amount),
        ] {
            if amount.is_negative() {
                return Err(EngineError::InvalidAmount(format!(
                    "{label} must be >= 0, got {amount}"
                )));
            }
        }

        Ok(Self {
            id: Uuid::new_v4(),
            booking_number,
            customer_id: new.customer_id.trim().to_string(),
            pandit_id: None,
            event_date: new.event_date,
            created_at,
            status: BookingStatus::Created,
            total_amount: new.total_amount,
            dakshina_amount: new.dakshina_amount,
            platform_fee: None,
            travel_required: new.travel_required,
            calculated_travel_cost: None,
            actual_travel_cost: None,
            food_allowance_amount: new.food_allowance_amount,
            samagri_amount: new.samagri_amount,
            discrepancy: false,
            discrepancy_resolution: None,
            refund: None,
            payout: PayoutRecord::default(),
            has_review: false,
            version: 0,
            history: Vec::new(),
        })
    }

    pub fn is_assigned_pandit(&self, actor_id: &str) -> bool {
        self.pandit_id.as_deref() == Some(actor_id)
    }

    /// Travel amount reimbursed to the pandit.
    ///
    /// The claimed (or admin-entered) cost wins over the platform estimate.
    pub fn travel_cost(&self) -> Money {
        if !self.travel_required {
            return Money::ZERO;
        }
        self.actual_travel_cost
            .or(self.calculated_travel_cost)
            .unwrap_or(Money::ZERO)
    }

    pub(crate) fn apply_refund(&mut self, quote: RefundQuote, computed_at: DateTime<Utc>) {
        self.refund = Some(AppliedRefund {
            percent: quote.percent,
            amount: quote.amount,
            computed_at,
        });
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub booking_number: String,
    pub customer_id: String,
    pub pandit_id: Option<String>,
    pub event_date: DateTimeUtc,
    pub created_at: DateTimeUtc,
    pub status: String,
    pub total_amount: i64,
    pub dakshina_amount: i64,
    pub platform_fee: Option<i64>,
    pub travel_required: bool,
    pub calculated_travel_cost: Option<i64>,
    pub actual_travel_cost: Option<i64>,
    pub food_allowance_amount: i64,
    pub samagri_amount: i64,
    pub discrepancy: bool,
    pub discrepancy_resolved_by: Option<String>,
    pub discrepancy_resolved_at: Option<DateTimeUtc>,
    pub discrepancy_note: Option<String>,
    pub refund_percent: Option<i32>,
    pub refund_amount: Option<i64>,
    pub refund_computed_at: Option<DateTimeUtc>,
    pub pandit_payout: Option<i64>,
    pub payout_status: String,
    pub payout_reference: Option<String>,
    pub payout_method: Option<String>,
    pub payout_payment_date: Option<Date>,
    pub payout_completed_at: Option<DateTimeUtc>,
    pub payout_approved_by: Option<String>,
    pub has_review: bool,
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::status_history::Entity")]
    StatusHistory,
    #[sea_orm(has_one = "super::reviews::Entity")]
    Review,
}

impl Related<super::status_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusHistory.def()
    }
}

impl Related<super::reviews::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Review.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Booking> for ActiveModel {
    fn from(booking: &Booking) -> Self {
        let resolution = booking.discrepancy_resolution.as_ref();
        Self {
            id: ActiveValue::Set(booking.id),
            booking_number: ActiveValue::Set(booking.booking_number.clone()),
            customer_id: ActiveValue::Set(booking.customer_id.clone()),
            pandit_id: ActiveValue::Set(booking.pandit_id.clone()),
            event_date: ActiveValue::Set(booking.event_date),
            created_at: ActiveValue::Set(booking.created_at),
            status: ActiveValue::Set(booking.status.as_str().to_string()),
            total_amount: ActiveValue::Set(booking.total_amount.rupees()),
            dakshina_amount: ActiveValue::Set(booking.dakshina_amount.rupees()),
            platform_fee: ActiveValue::Set(booking.platform_fee.map(Money::rupees)),
            travel_required: ActiveValue::Set(booking.travel_required),
            calculated_travel_cost: ActiveValue::Set(
                booking.calculated_travel_cost.map(Money::rupees),
            ),
            actual_travel_cost: ActiveValue::Set(booking.actual_travel_cost.map(Money::rupees)),
            food_allowance_amount: ActiveValue::Set(booking.food_allowance_amount.rupees()),
            samagri_amount: ActiveValue::Set(booking.samagri_amount.rupees()),
            discrepancy: ActiveValue::Set(booking.discrepancy),
            discrepancy_resolved_by: ActiveValue::Set(resolution.map(|r| r.resolved_by.clone())),
            discrepancy_resolved_at: ActiveValue::Set(resolution.map(|r| r.resolved_at)),
            discrepancy_note: ActiveValue::Set(resolution.and_then(|r| r.note.clone())),
            refund_percent: ActiveValue::Set(booking.refund.map(|r| i32::from(r.percent))),
            refund_amount: ActiveValue::Set(booking.refund.map(|r| r.amount.rupees())),
            refund_computed_at: ActiveValue::Set(booking.refund.map(|r| r.computed_at)),
            pandit_payout: ActiveValue::Set(booking.payout.amount.map(Money::rupees)),
            payout_status: ActiveValue::Set(booking.payout.status.as_str().to_string()),
            payout_reference: ActiveValue::Set(booking.payout.reference.clone()),
            payout_method: ActiveValue::Set(
                booking.payout.method.map(|m| m.as_str().to_string()),
            ),
            payout_payment_date: ActiveValue::Set(booking.payout.payment_date),
            payout_completed_at: ActiveValue::Set(booking.payout.completed_at),
            payout_approved_by: ActiveValue::Set(booking.payout.approved_by.clone()),
            has_review: ActiveValue::Set(booking.has_review),
            version: ActiveValue::Set(booking.version),
        }
    }
}

impl TryFrom<Model> for Booking {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let refund = match (
            model.refund_percent,
            model.refund_amount,
            model.refund_computed_at,
        ) {
            (Some(percent), Some(amount), Some(computed_at)) => Some(AppliedRefund {
                percent: u8::try_from(percent).map_err(|_| {
                    EngineError::InvalidAmount(format!("invalid refund percent: {percent}"))
                })?,
                amount: Money::new(amount),
                computed_at,
            }),
            _ => None,
        };
        let discrepancy_resolution = match (
            model.discrepancy_resolved_by,
            model.discrepancy_resolved_at,
        ) {
            (Some(resolved_by), Some(resolved_at)) => Some(DiscrepancyResolution {
                resolved_by,
                resolved_at,
                note: model.discrepancy_note,
            }),
            _ => None,
        };

        Ok(Self {
            id: model.id,
            booking_number: model.booking_number,
            customer_id: model.customer_id,
            pandit_id: model.pandit_id,
            event_date: model.event_date,
            created_at: model.created_at,
            status: BookingStatus::try_from(model.status.as_str())?,
            total_amount: Money::new(model.total_amount),
            dakshina_amount: Money::new(model.dakshina_amount),
            platform_fee: model.platform_fee.map(Money::new),
            travel_required: model.travel_required,
            calculated_travel_cost: model.calculated_travel_cost.map(Money::new),
            actual_travel_cost: model.actual_travel_cost.map(Money::new),
            food_allowance_amount: Money::new(model.food_allowance_amount),
            samagri_amount: Money::new(model.samagri_amount),
            discrepancy: model.discrepancy,
            discrepancy_resolution,
            refund,
            payout: PayoutRecord {
                status: PayoutStatus::try_from(model.payout_status.as_str())?,
                amount: model.pandit_payout.map(Money::new),
                reference: model.payout_reference,
                method: model
                    .payout_method
                    .as_deref()
                    .map(PaymentMethod::try_from)
                    .transpose()?,
                payment_date: model.payout_payment_date,
                completed_at: model.payout_completed_at,
                approved_by: model.payout_approved_by,
            },
            has_review: model.has_review,
            version: model.version,
            history: Vec::new(),
        })
    }
}
