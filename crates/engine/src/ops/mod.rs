use sea_orm::{ConnectionTrait, DatabaseConnection, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    Booking, EngineError, PayoutPolicy, ResultEngine, StatusChange, bookings, status_history,
};

mod booking;
mod lifecycle;
mod payouts;
mod reviews;
mod travel;

pub use lifecycle::TransitionOutcome;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Database-backed front of the engine.
///
/// Every mutating method runs in its own transaction and writes the booking
/// row with a compare-and-set on its `version`, so two concurrent actions on
/// the same booking can never both succeed. Distinct bookings never wait on
/// each other inside the engine.
#[derive(Clone, Debug)]
pub struct Engine {
    database: DatabaseConnection,
    policy: PayoutPolicy,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn policy(&self) -> PayoutPolicy {
        self.policy
    }

    /// Loads a booking snapshot together with its full status history.
    async fn load_booking<C: ConnectionTrait>(
        &self,
        db: &C,
        booking_id: Uuid,
    ) -> ResultEngine<Booking> {
        let model = bookings::Entity::find_by_id(booking_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("booking {booking_id}")))?;
        let mut booking = Booking::try_from(model)?;
        booking.history = status_history::Entity::find()
            .filter(status_history::Column::BookingId.eq(booking_id))
            .order_by_asc(status_history::Column::Sequence)
            .all(db)
            .await?
            .into_iter()
            .map(StatusChange::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        Ok(booking)
    }

    /// Writes `next` over the stored row if nobody changed it since
    /// `expected_version` was read.
    async fn store_booking<C: ConnectionTrait>(
        &self,
        db: &C,
        next: &Booking,
        expected_version: i64,
    ) -> ResultEngine<()> {
        let result = bookings::Entity::update_many()
            .set(bookings::ActiveModel::from(next))
            .filter(bookings::Column::Id.eq(next.id))
            .filter(bookings::Column::Version.eq(expected_version))
            .exec(db)
            .await?;
        if result.rows_affected != 1 {
            tracing::warn!(
                booking = %next.booking_number,
                expected_version,
                "booking changed concurrently, write rejected"
            );
            return Err(EngineError::Conflict(next.booking_number.clone()));
        }
        Ok(())
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    policy: PayoutPolicy,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Fee schedule and discrepancy tolerance; defaults to [`PayoutPolicy::default`].
    pub fn policy(mut self, policy: PayoutPolicy) -> EngineBuilder {
        self.policy = policy;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        self.policy.validate()?;
        Ok(Engine {
            database: self.database,
            policy: self.policy,
        })
    }
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use migration::MigratorTrait;
    use sea_orm::{Database, sea_query::Expr};

    use super::*;
    use crate::{Money, NewBooking};

    async fn engine_with_booking() -> (Engine, Uuid) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder().database(db).build().await.unwrap();
        let now = Utc::now();
        let id = engine
            .create_booking(
                NewBooking {
                    booking_number: "HPJ-3001".to_string(),
                    customer_id: "cust-ravi".to_string(),
                    event_date: now + Duration::days(5),
                    total_amount: Money::new(3_000),
                    dakshina_amount: Money::new(1_800),
                    travel_required: false,
                    food_allowance_amount: Money::ZERO,
                    samagri_amount: Money::ZERO,
                },
                now,
            )
            .await
            .unwrap();
        (engine, id)
    }

    #[tokio::test]
    async fn stale_version_write_is_rejected() {
        let (engine, id) = engine_with_booking().await;
        let read = engine.booking(id).await.unwrap();

        // Another writer commits between our read and our write.
        bookings::Entity::update_many()
            .col_expr(bookings::Column::Version, Expr::value(read.version + 1))
            .filter(bookings::Column::Id.eq(id))
            .exec(&engine.database)
            .await
            .unwrap();

        let mut next = read.clone();
        next.pandit_id = Some("pandit-late".to_string());
        next.version += 1;
        let err = engine
            .store_booking(&engine.database, &next, read.version)
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::Conflict("HPJ-3001".to_string()));
        assert_eq!(err.code(), "conflict");

        let stored = engine.booking(id).await.unwrap();
        assert_eq!(stored.version, read.version + 1);
        assert_eq!(stored.pandit_id, None);
        assert_eq!(stored.status, read.status);
    }

    #[tokio::test]
    async fn current_version_write_is_applied() {
        let (engine, id) = engine_with_booking().await;
        let read = engine.booking(id).await.unwrap();

        let mut next = read.clone();
        next.pandit_id = Some("pandit-meera".to_string());
        next.version += 1;
        engine
            .store_booking(&engine.database, &next, read.version)
            .await
            .unwrap();

        let stored = engine.booking(id).await.unwrap();
        assert_eq!(stored.version, read.version + 1);
        assert_eq!(stored.pandit_id.as_deref(), Some("pandit-meera"));
    }
}
