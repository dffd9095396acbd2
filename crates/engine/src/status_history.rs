//! Append-only audit trail of booking status changes.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{BookingStatus, EngineError};

/// One status change. Written once, never updated or deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: Uuid,
    pub booking_id: Uuid,
    /// Position in the booking's history, starting at 1.
    pub sequence: i64,
    pub from_status: BookingStatus,
    pub to_status: BookingStatus,
    pub action: String,
    pub actor_id: String,
    pub note: Option<String>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "booking_status_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub booking_id: Uuid,
    pub sequence: i64,
    pub from_status: String,
    pub to_status: String,
    pub action: String,
    pub actor_id: String,
    pub note: Option<String>,
    pub changed_at: DateTimeUtc,
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

impl From<&StatusChange> for ActiveModel {
    fn from(change: &StatusChange) -> Self {
        Self {
            id: ActiveValue::Set(change.id),
            booking_id: ActiveValue::Set(change.booking_id),
            sequence: ActiveValue::Set(change.sequence),
            from_status: ActiveValue::Set(change.from_status.as_str().to_string()),
            to_status: ActiveValue::Set(change.to_status.as_str().to_string()),
            action: ActiveValue::Set(change.action.clone()),
            actor_id: ActiveValue::Set(change.actor_id.clone()),
            note: ActiveValue::Set(change.note.clone()),
            changed_at: ActiveValue::Set(change.changed_at),
        }
    }
}

impl TryFrom<Model> for StatusChange {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            booking_id: model.booking_id,
            sequence: model.sequence,
            from_status: BookingStatus::try_from(model.from_status.as_str())?,
            to_status: BookingStatus::try_from(model.to_status.as_str())?,
            action: model.action,
            actor_id: model.actor_id,
            note: model.note,
            changed_at: model.changed_at,
        })
    }
}
