use std::{collections::HashMap, io::Write};

use chrono::{DateTime, Utc};
use tokio::task::{self, JoinSet};
use uuid::Uuid;

use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    Actor, BatchFailure, BatchOutcome, Booking, BookingStatus, EngineError, Money,
    PaymentDetails, PayoutBreakdown, PayoutRecord, PayoutStatus, ResultEngine, bookings,
    compute_payout, ensure_payout_eligible, write_payouts_csv,
};

use super::{Engine, with_tx};

/// Waits for every task and returns `(input index, booking id, result)` in
/// input order. A task that panicked or was aborted still reports its id, as
/// [`EngineError::TaskFailed`].
async fn join_in_order<T: 'static>(
    mut tasks: JoinSet<ResultEngine<T>>,
    slots: HashMap<task::Id, (usize, Uuid)>,
) -> Vec<(usize, Uuid, ResultEngine<T>)> {
    let mut results = Vec::with_capacity(slots.len());
    while let Some(joined) = tasks.join_next_with_id().await {
        let (task_id, result) = match joined {
            Ok((task_id, result)) => (task_id, result),
            Err(err) => {
                tracing::error!("payout approval task failed: {err}");
                (err.id(), Err(EngineError::TaskFailed(err.to_string())))
            }
        };
        if let Some(&(index, booking_id)) = slots.get(&task_id) {
            results.push((index, booking_id, result));
        }
    }
    results.sort_by_key(|(index, _, _)| *index);
    results
}

impl Engine {
    /// Net payout and line items for a booking, from its current snapshot.
    pub async fn payout_breakdown(&self, booking_id: Uuid) -> ResultEngine<PayoutBreakdown> {
        let booking = self.booking(booking_id).await?;
        compute_payout(&booking)
    }

    /// Completed bookings whose payout has not been made yet, oldest event
    /// first. Flagged bookings are included so the admin can see what is
    /// blocked. Snapshots come without history.
    pub async fn pending_payouts(&self) -> ResultEngine<Vec<Booking>> {
        with_tx!(self, |db_tx| {
            bookings::Entity::find()
                .filter(bookings::Column::Status.eq(BookingStatus::Completed.as_str()))
                .filter(bookings::Column::PayoutStatus.eq(PayoutStatus::Pending.as_str()))
                .order_by_asc(bookings::Column::EventDate)
                .order_by_asc(bookings::Column::BookingNumber)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Booking::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Writes every completed payout as CSV, in completion order.
    ///
    /// Returns the number of rows written.
    pub async fn export_payouts_csv<W: Write>(&self, out: W) -> ResultEngine<usize> {
        let paid: Vec<Booking> = with_tx!(self, |db_tx| {
            bookings::Entity::find()
                .filter(bookings::Column::PayoutStatus.eq(PayoutStatus::Completed.as_str()))
                .order_by_asc(bookings::Column::PayoutCompletedAt)
                .order_by_asc(bookings::Column::BookingNumber)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Booking::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })?;
        let rows = write_payouts_csv(&paid, out)?;
        tracing::info!(rows, "payouts exported");
        Ok(rows)
    }

    /// Marks the payout of every listed booking as completed.
    ///
    /// Each booking is checked and written on its own: one ineligible id
    /// never blocks the others. Ids are reported in the order given.
    pub async fn approve_batch(
        &self,
        booking_ids: &[Uuid],
        actor: &Actor,
        details: PaymentDetails,
        now: DateTime<Utc>,
    ) -> ResultEngine<BatchOutcome> {
        if !actor.is_admin() {
            return Err(EngineError::UnauthorizedActor {
                actor: actor.id.clone(),
                action: "approve payouts",
            });
        }
        details.validate()?;

        let mut tasks = JoinSet::new();
        let mut slots = HashMap::with_capacity(booking_ids.len());
        for (index, &booking_id) in booking_ids.iter().enumerate() {
            let engine = self.clone();
            let admin_id = actor.id.clone();
            let details = details.clone();
            let handle = tasks.spawn(async move {
                engine
                    .approve_one(booking_id, &admin_id, &details, now)
                    .await
            });
            slots.insert(handle.id(), (index, booking_id));
        }
        let results = join_in_order(tasks, slots).await;

        let mut outcome = BatchOutcome::default();
        let mut total = Money::ZERO;
        for (_, booking_id, result) in results {
            match result {
                Ok(amount) => {
                    total += amount;
                    outcome.succeeded.push(booking_id);
                }
                Err(error) => {
                    tracing::warn!(%booking_id, code = error.code(), "payout not approved: {error}");
                    outcome.failed.push(BatchFailure { booking_id, error });
                }
            }
        }

        tracing::info!(
            admin = %actor.id,
            reference = %details.transaction_ref,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            total = %total,
            "payout batch processed"
        );
        Ok(outcome)
    }

    async fn approve_one(
        &self,
        booking_id: Uuid,
        admin_id: &str,
        details: &PaymentDetails,
        now: DateTime<Utc>,
    ) -> ResultEngine<Money> {
        with_tx!(self, |db_tx| {
            let booking = self.load_booking(&db_tx, booking_id).await?;
            ensure_payout_eligible(&booking)?;
            let breakdown = compute_payout(&booking)?;

            let mut next = booking.clone();
            next.payout = PayoutRecord {
                status: PayoutStatus::Completed,
                amount: Some(breakdown.net),
                reference: Some(details.transaction_ref.trim().to_string()),
                method: Some(details.method),
                payment_date: Some(details.payment_date),
                completed_at: Some(now),
                approved_by: Some(admin_id.to_string()),
            };
            next.version += 1;
            self.store_booking(&db_tx, &next, booking.version).await?;
            Ok(breakdown.net)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn crashed_task_keeps_its_booking_id() {
        let ids = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let mut tasks = JoinSet::new();
        let mut slots = HashMap::new();
        for (index, &booking_id) in ids.iter().enumerate() {
            let handle = tasks.spawn(async move {
                if index == 1 {
                    panic!("ledger connection dropped");
                }
                Ok(Money::new(500))
            });
            slots.insert(handle.id(), (index, booking_id));
        }

        let results = join_in_order(tasks, slots).await;
        assert_eq!(results.len(), 3);
        let reported: Vec<Uuid> = results.iter().map(|(_, id, _)| *id).collect();
        assert_eq!(reported, ids);
        assert!(results[0].2.is_ok());
        assert!(results[2].2.is_ok());
        let err = results[1].2.as_ref().unwrap_err();
        assert_eq!(err.code(), "task_failed");
    }
}
