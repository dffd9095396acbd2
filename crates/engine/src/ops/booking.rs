use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{QueryFilter, TransactionTrait, prelude::*};

use crate::{Booking, EngineError, NewBooking, ResultEngine, StatusChange, bookings};

use super::{Engine, with_tx};

impl Engine {
    /// Stores a booking opened by the matching process, in `CREATED`.
    pub async fn create_booking(
        &self,
        new: NewBooking,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Uuid> {
        let booking = Booking::new(new, created_at)?;
        with_tx!(self, |db_tx| {
            let existing = bookings::Entity::find()
                .filter(bookings::Column::BookingNumber.eq(booking.booking_number.clone()))
                .one(&db_tx)
                .await?;
            if existing.is_some() {
                return Err(EngineError::ExistingKey(booking.booking_number));
            }

            bookings::ActiveModel::from(&booking).insert(&db_tx).await?;
            tracing::info!(
                booking = %booking.booking_number,
                customer = %booking.customer_id,
                "booking created"
            );
            Ok(booking.id)
        })
    }

    /// Return a [`Booking`] (snapshot from DB, history included).
    pub async fn booking(&self, booking_id: Uuid) -> ResultEngine<Booking> {
        with_tx!(self, |db_tx| self.load_booking(&db_tx, booking_id).await)
    }

    pub async fn booking_by_number(&self, booking_number: &str) -> ResultEngine<Booking> {
        let booking_number = booking_number.trim();
        with_tx!(self, |db_tx| {
            let model = bookings::Entity::find()
                .filter(bookings::Column::BookingNumber.eq(booking_number))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(booking_number.to_string()))?;
            self.load_booking(&db_tx, model.id).await
        })
    }

    /// Status changes of a booking, oldest first.
    pub async fn status_history(&self, booking_id: Uuid) -> ResultEngine<Vec<StatusChange>> {
        Ok(self.booking(booking_id).await?.history)
    }
}
