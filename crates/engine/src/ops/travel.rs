use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::TransactionTrait;

use crate::{
    Actor, ActorRole, Booking, BookingStatus, DiscrepancyResolution, EngineError, Money,
    PayoutStatus, ResultEngine, TravelCostComponents, TravelEstimator, TravelRequest,
    aggregate_travel_cost, compute_payout, estimate_travel_cost, flag_discrepancy,
};

use super::{Engine, normalize_optional_text, with_tx};

/// Recomputes the pending payout of a completed booking after its costs moved.
fn refresh_payout(booking: &mut Booking) -> ResultEngine<()> {
    if booking.status == BookingStatus::Completed && booking.payout.status == PayoutStatus::Pending
    {
        booking.payout.amount = Some(compute_payout(booking)?.net);
    }
    Ok(())
}

fn require_admin(actor: &Actor, action: &'static str) -> ResultEngine<()> {
    if !actor.is_admin() {
        return Err(EngineError::UnauthorizedActor {
            actor: actor.id.clone(),
            action,
        });
    }
    Ok(())
}

impl Engine {
    /// Stores the platform's travel estimate as `calculated_travel_cost`.
    pub async fn record_travel_estimate(
        &self,
        booking_id: Uuid,
        components: &TravelCostComponents,
        actor: &Actor,
    ) -> ResultEngine<Money> {
        require_admin(actor, "record a travel estimate")?;
        let total = aggregate_travel_cost(components)?;
        self.store_travel_estimate(booking_id, total).await
    }

    /// Prices the trip with `estimator` and stores the result.
    ///
    /// An estimator failure is returned as is; nothing is stored in that case.
    pub async fn estimate_travel<E: TravelEstimator>(
        &self,
        booking_id: Uuid,
        estimator: &E,
        request: &TravelRequest,
        actor: &Actor,
    ) -> ResultEngine<Money> {
        require_admin(actor, "record a travel estimate")?;
        let total = estimate_travel_cost(estimator, request).await?;
        self.store_travel_estimate(booking_id, total).await
    }

    async fn store_travel_estimate(&self, booking_id: Uuid, total: Money) -> ResultEngine<Money> {
        with_tx!(self, |db_tx| {
            let booking = self.load_booking(&db_tx, booking_id).await?;
            if booking.status.is_terminal() {
                return Err(EngineError::InvalidTransition {
                    booking: booking.booking_number,
                    current: booking.status,
                    action: "record-travel-estimate",
                });
            }
            if !booking.travel_required {
                return Err(EngineError::InvalidAmount(format!(
                    "booking {} does not require travel",
                    booking.booking_number
                )));
            }

            let mut next = booking.clone();
            next.calculated_travel_cost = Some(total);
            if let Some(claimed) = next.actual_travel_cost
                && flag_discrepancy(claimed, total, self.policy.discrepancy_tolerance)
            {
                next.discrepancy = true;
            }
            next.version += 1;
            self.store_booking(&db_tx, &next, booking.version).await?;

            tracing::info!(booking = %next.booking_number, estimate = %total, "travel estimate recorded");
            Ok(total)
        })
    }

    /// Records the travel cost claimed by the pandit (or entered by an admin).
    ///
    /// Returns whether the booking is flagged as a discrepancy afterwards. A
    /// claim within tolerance never clears an existing flag.
    pub async fn record_travel_claim(
        &self,
        booking_id: Uuid,
        claimed: Money,
        actor: &Actor,
    ) -> ResultEngine<bool> {
        if claimed.is_negative() {
            return Err(EngineError::InvalidAmount(format!(
                "claimed travel cost must be >= 0, got {claimed}"
            )));
        }
        with_tx!(self, |db_tx| {
            let booking = self.load_booking(&db_tx, booking_id).await?;
            let allowed = actor.is_admin()
                || (actor.role == ActorRole::Pandit && booking.is_assigned_pandit(&actor.id));
            if !allowed {
                return Err(EngineError::UnauthorizedActor {
                    actor: actor.id.clone(),
                    action: "record a travel claim",
                });
            }
            if matches!(
                booking.status,
                BookingStatus::Cancelled | BookingStatus::Refunded
            ) {
                return Err(EngineError::InvalidTransition {
                    booking: booking.booking_number,
                    current: booking.status,
                    action: "record-travel-claim",
                });
            }
            if booking.payout.status == PayoutStatus::Completed {
                return Err(EngineError::PayoutNotEligible {
                    booking: booking.booking_number,
                    reason: "payout already completed",
                });
            }
            if !booking.travel_required {
                return Err(EngineError::InvalidAmount(format!(
                    "booking {} does not require travel",
                    booking.booking_number
                )));
            }

            let mut next = booking.clone();
            next.actual_travel_cost = Some(claimed);
            // Without an estimate there is nothing to reconcile yet; recording
            // the estimate later runs the comparison.
            if let Some(calculated) = booking.calculated_travel_cost
                && flag_discrepancy(claimed, calculated, self.policy.discrepancy_tolerance)
            {
                next.discrepancy = true;
            }
            refresh_payout(&mut next)?;
            next.version += 1;
            self.store_booking(&db_tx, &next, booking.version).await?;

            if next.discrepancy {
                tracing::warn!(
                    booking = %next.booking_number,
                    claimed = %claimed,
                    calculated = ?next.calculated_travel_cost,
                    "travel claim flagged as discrepancy"
                );
            } else {
                tracing::info!(booking = %next.booking_number, claimed = %claimed, "travel claim recorded");
            }
            Ok(next.discrepancy)
        })
    }

    /// Clears a discrepancy flag. Only an admin decision does that.
    ///
    /// `accepted_travel_cost`, when given, replaces the claimed amount.
    pub async fn resolve_discrepancy(
        &self,
        booking_id: Uuid,
        actor: &Actor,
        accepted_travel_cost: Option<Money>,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> ResultEngine<Booking> {
        require_admin(actor, "resolve a discrepancy")?;
        if let Some(amount) = accepted_travel_cost
            && amount.is_negative()
        {
            return Err(EngineError::InvalidAmount(format!(
                "accepted travel cost must be >= 0, got {amount}"
            )));
        }
        with_tx!(self, |db_tx| {
            let booking = self.load_booking(&db_tx, booking_id).await?;
            if !booking.discrepancy {
                return Err(EngineError::MissingPrecondition {
                    booking: booking.booking_number,
                    field: "discrepancy",
                });
            }

            let mut next = booking.clone();
            if let Some(amount) = accepted_travel_cost {
                next.actual_travel_cost = Some(amount);
            }
            next.discrepancy = false;
            next.discrepancy_resolution = Some(DiscrepancyResolution {
                resolved_by: actor.id.clone(),
                resolved_at: now,
                note: normalize_optional_text(note),
            });
            refresh_payout(&mut next)?;
            next.version += 1;
            self.store_booking(&db_tx, &next, booking.version).await?;

            tracing::info!(
                booking = %next.booking_number,
                admin = %actor.id,
                travel = %next.travel_cost(),
                "discrepancy resolved"
            );
            Ok(next)
        })
    }
}
