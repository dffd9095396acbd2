use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{QueryFilter, TransactionTrait, prelude::*};

use crate::{
    Actor, ActorRole, EngineError, OverallRating, Ratings, ResultEngine, Review,
    ensure_review_allowed, normalize_comment, reviews,
};

use super::{Engine, with_tx};

impl Engine {
    /// Attaches the customer's review to a completed booking.
    pub async fn submit_review(
        &self,
        booking_id: Uuid,
        actor: &Actor,
        ratings: Ratings,
        comment: &str,
        anonymous: bool,
        now: DateTime<Utc>,
    ) -> ResultEngine<OverallRating> {
        ratings.validate()?;
        let comment = normalize_comment(comment)?;

        with_tx!(self, |db_tx| {
            let booking = self.load_booking(&db_tx, booking_id).await?;
            if actor.role != ActorRole::Customer || actor.id != booking.customer_id {
                return Err(EngineError::UnauthorizedActor {
                    actor: actor.id.clone(),
                    action: "review this booking",
                });
            }
            ensure_review_allowed(&booking)?;

            let review = Review {
                id: Uuid::new_v4(),
                booking_id,
                customer_id: booking.customer_id.clone(),
                overall: ratings.overall(),
                ratings,
                comment,
                anonymous,
                created_at: now,
            };
            reviews::ActiveModel::from(&review).insert(&db_tx).await?;

            let mut next = booking.clone();
            next.has_review = true;
            next.version += 1;
            self.store_booking(&db_tx, &next, booking.version).await?;

            tracing::info!(
                booking = %booking.booking_number,
                overall = %review.overall,
                "review submitted"
            );
            Ok(review.overall)
        })
    }

    pub async fn review(&self, booking_id: Uuid) -> ResultEngine<Review> {
        with_tx!(self, |db_tx| {
            reviews::Entity::find()
                .filter(reviews::Column::BookingId.eq(booking_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("review of booking {booking_id}")))
                .and_then(Review::try_from)
        })
    }
}
