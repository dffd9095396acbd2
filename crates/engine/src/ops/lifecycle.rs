use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{TransactionTrait, prelude::*};

use crate::{
    Action, Actor, BookingStatus, EngineError, RefundQuote, ResultEngine, SideEffect, Transition,
    TransitionContext, compute_refund, status_history, transition,
};

use super::{Engine, with_tx};

/// What the caller gets back from [`Engine::transition`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub booking_id: Uuid,
    pub status: BookingStatus,
    pub side_effects: Vec<SideEffect>,
}

impl Engine {
    /// Applies `action` to a booking and persists the result.
    ///
    /// The booking row and its new history entry are written in one
    /// transaction. The returned side effects are not executed here.
    pub async fn transition(
        &self,
        booking_id: Uuid,
        action: Action,
        actor: &Actor,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> ResultEngine<TransitionOutcome> {
        let ctx = TransitionContext {
            now,
            policy: self.policy,
        };
        let outcome = match self
            .apply_transition(booking_id, &action, actor, note, &ctx)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::debug!(
                    %booking_id,
                    action = action.name(),
                    actor = %actor.id,
                    code = err.code(),
                    "transition rejected: {err}"
                );
                return Err(err);
            }
        };

        tracing::info!(
            booking = %outcome.booking.booking_number,
            action = action.name(),
            actor = %actor.id,
            from = %outcome.change.from_status,
            to = %outcome.change.to_status,
            "booking transitioned"
        );
        if matches!(action, Action::Cancel | Action::Refund)
            && let Some(refund) = outcome.booking.refund
        {
            tracing::info!(
                booking = %outcome.booking.booking_number,
                percent = refund.percent,
                amount = %refund.amount,
                "refund applied"
            );
        }

        Ok(TransitionOutcome {
            booking_id,
            status: outcome.booking.status,
            side_effects: outcome.side_effects,
        })
    }

    async fn apply_transition(
        &self,
        booking_id: Uuid,
        action: &Action,
        actor: &Actor,
        note: Option<&str>,
        ctx: &TransitionContext,
    ) -> ResultEngine<Transition> {
        with_tx!(self, |db_tx| {
            let booking = self.load_booking(&db_tx, booking_id).await?;
            let outcome = transition(&booking, action, actor, note, ctx)?;

            self.store_booking(&db_tx, &outcome.booking, booking.version)
                .await?;
            status_history::ActiveModel::from(&outcome.change)
                .insert(&db_tx)
                .await?;
            Ok(outcome)
        })
    }

    /// Refund the customer would get by cancelling at `now`. Nothing is stored.
    pub async fn quote_refund(
        &self,
        booking_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultEngine<RefundQuote> {
        let booking = self.booking(booking_id).await?;
        if booking.status.is_terminal() {
            return Err(EngineError::InvalidTransition {
                booking: booking.booking_number,
                current: booking.status,
                action: Action::Cancel.name(),
            });
        }
        compute_refund(booking.event_date, now, booking.total_amount)
    }
}
