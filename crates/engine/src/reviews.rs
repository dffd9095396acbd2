//! Customer reviews and rating aggregation.
//!
//! A completed booking receives at most one review. Reviews are append-only:
//! there is no update or delete path.

use std::fmt;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Booking, BookingStatus, EngineError, ResultEngine};

pub const MIN_COMMENT_CHARS: usize = 10;

/// The five sub-ratings, each an integer in `1..=5`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratings {
    pub punctuality: u8,
    pub knowledge: u8,
    pub conduct: u8,
    pub accuracy: u8,
    pub samagri: u8,
}

impl Ratings {
    fn named(&self) -> [(&'static str, u8); 5] {
        [
            ("punctuality", self.punctuality),
            ("knowledge", self.knowledge),
            ("conduct", self.conduct),
            ("accuracy", self.accuracy),
            ("samagri", self.samagri),
        ]
    }

    pub fn validate(&self) -> ResultEngine<()> {
        for (name, value) in self.named() {
            if !(1..=5).contains(&value) {
                return Err(EngineError::InvalidRating(format!(
                    "{name} must be between 1 and 5, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Mean of the sub-ratings, rounded to one decimal. Expects validated
    /// ratings.
    pub fn overall(&self) -> OverallRating {
        let sum: u8 = self.named().iter().map(|(_, v)| (*v).min(5)).sum();
        // round(sum / 5 * 10) is exactly 2 * sum.
        OverallRating(sum * 2)
    }
}

/// Overall score stored as tenths of a star (`48` is 4.8).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverallRating(u8);

impl OverallRating {
    pub fn tenths(self) -> u8 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 10.0
    }
}

impl fmt::Display for OverallRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

/// Trims the comment and enforces the minimum length.
pub fn normalize_comment(comment: &str) -> ResultEngine<String> {
    let trimmed = comment.trim();
    if trimmed.chars().count() < MIN_COMMENT_CHARS {
        return Err(EngineError::InvalidComment(format!(
            "comment must be at least {MIN_COMMENT_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// A review may only be attached to a completed booking without one.
pub fn ensure_review_allowed(booking: &Booking) -> ResultEngine<()> {
    if booking.status != BookingStatus::Completed {
        return Err(EngineError::ReviewNotAllowed {
            booking: booking.booking_number.clone(),
            reason: "booking is not completed",
        });
    }
    if booking.has_review {
        return Err(EngineError::ReviewNotAllowed {
            booking: booking.booking_number.clone(),
            reason: "booking already has a review",
        });
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub customer_id: String,
    pub ratings: Ratings,
    pub overall: OverallRating,
    pub comment: String,
    pub anonymous: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub booking_id: Uuid,
    pub customer_id: String,
    pub punctuality: i16,
    pub knowledge: i16,
    pub conduct: i16,
    pub accuracy: i16,
    pub samagri: i16,
    pub overall_tenths: i16,
    pub comment: String,
    pub anonymous: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bookings::Entity",
        from = "Column::BookingId",
        to = "super::bookings::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Booking,
}

impl Related<super::bookings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Review> for ActiveModel {
    fn from(review: &Review) -> Self {
        Self {
            id: ActiveValue::Set(review.id),
            booking_id: ActiveValue::Set(review.booking_id),
            customer_id: ActiveValue::Set(review.customer_id.clone()),
            punctuality: ActiveValue::Set(i16::from(review.ratings.punctuality)),
            knowledge: ActiveValue::Set(i16::from(review.ratings.knowledge)),
            conduct: ActiveValue::Set(i16::from(review.ratings.conduct)),
            accuracy: ActiveValue::Set(i16::from(review.ratings.accuracy)),
            samagri: ActiveValue::Set(i16::from(review.ratings.samagri)),
            overall_tenths: ActiveValue::Set(i16::from(review.overall.tenths())),
            comment: ActiveValue::Set(review.comment.clone()),
            anonymous: ActiveValue::Set(review.anonymous),
            created_at: ActiveValue::Set(review.created_at),
        }
    }
}

impl TryFrom<Model> for Review {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let rating = |value: i16| {
            u8::try_from(value)
                .map_err(|_| EngineError::InvalidRating(format!("stored rating {value}")))
        };
        let ratings = Ratings {
            punctuality: rating(model.punctuality)?,
            knowledge: rating(model.knowledge)?,
            conduct: rating(model.conduct)?,
            accuracy: rating(model.accuracy)?,
            samagri: rating(model.samagri)?,
        };
        ratings.validate()?;

        Ok(Self {
            id: model.id,
            booking_id: model.booking_id,
            customer_id: model.customer_id,
            overall: ratings.overall(),
            ratings,
            comment: model.comment,
            anonymous: model.anonymous,
            created_at: model.created_at,
        })
    }
}
