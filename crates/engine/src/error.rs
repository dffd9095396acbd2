//! The module contains the errors the engine can throw.
//!
//! Every variant is a local validation failure except [`Database`] and
//! [`Export`]; none of them is retried by the engine. Variants that refer to
//! a booking carry its booking number, so the caller can explain the failure
//! next to the row it came from.
//!
//!  [`Database`]: EngineError::Database
//!  [`Export`]: EngineError::Export
use sea_orm::DbErr;
use thiserror::Error;

use crate::BookingStatus;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("booking {booking}: cannot {action} while {current}")]
    InvalidTransition {
        booking: String,
        current: BookingStatus,
        action: &'static str,
    },
    #[error("\"{actor}\" is not allowed to {action}")]
    UnauthorizedActor { actor: String, action: &'static str },
    #[error("booking {booking}: missing {field}")]
    MissingPrecondition {
        booking: String,
        field: &'static str,
    },
    #[error("booking {booking}: review not allowed, {reason}")]
    ReviewNotAllowed {
        booking: String,
        reason: &'static str,
    },
    #[error("booking {booking}: payout blocked by an unresolved discrepancy")]
    DiscrepancyBlocked { booking: String },
    #[error("booking {booking}: payout not eligible, {reason}")]
    PayoutNotEligible {
        booking: String,
        reason: &'static str,
    },
    #[error("booking {0} was modified concurrently")]
    Conflict(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid rating: {0}")]
    InvalidRating(String),
    #[error("Invalid comment: {0}")]
    InvalidComment(String),
    #[error("Invalid status: {0}")]
    InvalidStatus(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Travel estimate failed: {0}")]
    TravelEstimate(String),
    #[error("background task failed: {0}")]
    TaskFailed(String),
    #[error(transparent)]
    Export(#[from] csv::Error),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Stable machine-readable code, one per variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::UnauthorizedActor { .. } => "unauthorized_actor",
            Self::MissingPrecondition { .. } => "missing_precondition",
            Self::ReviewNotAllowed { .. } => "review_not_allowed",
            Self::DiscrepancyBlocked { .. } => "discrepancy_blocked",
            Self::PayoutNotEligible { .. } => "payout_not_eligible",
            Self::Conflict(_) => "conflict",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::InvalidRating(_) => "invalid_rating",
            Self::InvalidComment(_) => "invalid_comment",
            Self::InvalidStatus(_) => "invalid_status",
            Self::KeyNotFound(_) => "not_found",
            Self::ExistingKey(_) => "already_exists",
            Self::TravelEstimate(_) => "travel_estimate_failed",
            Self::TaskFailed(_) => "task_failed",
            Self::Export(_) => "export_failed",
            Self::Database(_) => "database",
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::InvalidTransition {
                    booking: a,
                    current: ac,
                    action: aa,
                },
                Self::InvalidTransition {
                    booking: b,
                    current: bc,
                    action: ba,
                },
            ) => a == b && ac == bc && aa == ba,
            (
                Self::UnauthorizedActor {
                    actor: a,
                    action: aa,
                },
                Self::UnauthorizedActor {
                    actor: b,
                    action: ba,
                },
            ) => a == b && aa == ba,
            (
                Self::MissingPrecondition { booking: a, field: af },
                Self::MissingPrecondition { booking: b, field: bf },
            ) => a == b && af == bf,
            (
                Self::ReviewNotAllowed { booking: a, reason: ar },
                Self::ReviewNotAllowed { booking: b, reason: br },
            ) => a == b && ar == br,
            (Self::DiscrepancyBlocked { booking: a }, Self::DiscrepancyBlocked { booking: b }) => {
                a == b
            }
            (
                Self::PayoutNotEligible { booking: a, reason: ar },
                Self::PayoutNotEligible { booking: b, reason: br },
            ) => a == b && ar == br,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidRating(a), Self::InvalidRating(b)) => a == b,
            (Self::InvalidComment(a), Self::InvalidComment(b)) => a == b,
            (Self::InvalidStatus(a), Self::InvalidStatus(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::TravelEstimate(a), Self::TravelEstimate(b)) => a == b,
            (Self::TaskFailed(a), Self::TaskFailed(b)) => a == b,
            (Self::Export(a), Self::Export(b)) => a.to_string() == b.to_string(),
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
