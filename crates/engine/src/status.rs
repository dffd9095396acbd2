//! Closed status enumerations for bookings and payouts.
//!
//! Statuses are stored as their `SCREAMING_SNAKE_CASE` names; anything else
//! read from storage is rejected with [`EngineError::InvalidStatus`].

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Lifecycle status of a booking.
///
/// ```text
/// CREATED ──► PANDIT_REQUESTED ──► CONFIRMED ──► TRAVEL_BOOKED ──► PANDIT_EN_ROUTE
///    ▲               │                 └─────(no travel)────────────►┘
///    └──(declined)───┘
/// PANDIT_EN_ROUTE ──► PANDIT_ARRIVED ──► PUJA_IN_PROGRESS ──► COMPLETED
///
/// any non-terminal ──► CANCELLED | REFUNDED
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Created,
    PanditRequested,
    Confirmed,
    TravelBooked,
    PanditEnRoute,
    PanditArrived,
    PujaInProgress,
    Completed,
    Cancelled,
    Refunded,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 10] = [
        Self::Created,
        Self::PanditRequested,
        Self::Confirmed,
        Self::TravelBooked,
        Self::PanditEnRoute,
        Self::PanditArrived,
        Self::PujaInProgress,
        Self::Completed,
        Self::Cancelled,
        Self::Refunded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::PanditRequested => "PANDIT_REQUESTED",
            Self::Confirmed => "CONFIRMED",
            Self::TravelBooked => "TRAVEL_BOOKED",
            Self::PanditEnRoute => "PANDIT_EN_ROUTE",
            Self::PanditArrived => "PANDIT_ARRIVED",
            Self::PujaInProgress => "PUJA_IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
        }
    }

    /// `COMPLETED`, `CANCELLED` and `REFUNDED` accept no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Refunded)
    }

    /// Customer and pandit are frozen from confirmation onwards.
    pub fn parties_locked(self) -> bool {
        !matches!(self, Self::Created | Self::PanditRequested)
    }
}

impl core::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for BookingStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| EngineError::InvalidStatus(format!("unknown booking status: {value}")))
    }
}

/// Disbursement state of the pandit payout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutStatus {
    #[default]
    Pending,
    Completed,
}

impl PayoutStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
        }
    }
}

impl core::fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for PayoutStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            other => Err(EngineError::InvalidStatus(format!(
                "unknown payout status: {other}"
            ))),
        }
    }
}
