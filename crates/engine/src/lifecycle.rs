//! Booking state machine.
//!
//! [`transition`] is the only way a booking changes status. It is a pure
//! function: given a snapshot, an action, the acting party and the current
//! time it returns the next snapshot, the history entry to append and the side
//! effects the caller must carry out (persisting, refunds, payouts,
//! notifications). Illegal requests fail closed and leave the snapshot as it
//! was.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Booking, BookingStatus, EngineError, Money, PayoutPolicy, RefundQuote, ResultEngine,
    StatusChange, compute_payout, compute_refund,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Customer,
    Pandit,
    Admin,
    /// Automated platform processes such as matching.
    System,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn customer(id: impl Into<String>) -> Self {
        Self::new(id, ActorRole::Customer)
    }

    pub fn pandit(id: impl Into<String>) -> Self {
        Self::new(id, ActorRole::Pandit)
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self::new(id, ActorRole::Admin)
    }

    pub fn system() -> Self {
        Self::new("system", ActorRole::System)
    }

    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Action {
    /// Offer the booking to a matched pandit.
    Request { pandit_id: String },
    Accept,
    /// The pandit turns the request down; the booking goes back to matching.
    Decline,
    BookTravel,
    Depart,
    Arrive,
    StartPuja,
    Complete,
    /// Cancellation with the time-based refund.
    Cancel,
    /// Full refund for a platform-side failure.
    Refund,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Request { .. } => "request",
            Self::Accept => "accept",
            Self::Decline => "decline",
            Self::BookTravel => "book-travel",
            Self::Depart => "depart",
            Self::Arrive => "arrive",
            Self::StartPuja => "start-puja",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
            Self::Refund => "refund",
        }
    }

    /// Status reached from `booking`'s current status, if the action is legal there.
    fn target(&self, booking: &Booking) -> Option<BookingStatus> {
        use BookingStatus::*;

        match (self, booking.status) {
            (_, status) if status.is_terminal() => None,
            (Self::Cancel, _) => Some(Cancelled),
            (Self::Refund, _) => Some(Refunded),
            (Self::Request { .. }, Created) => Some(PanditRequested),
            (Self::Accept, PanditRequested) => Some(Confirmed),
            (Self::Decline, PanditRequested) => Some(Created),
            (Self::BookTravel, Confirmed) if booking.travel_required => Some(TravelBooked),
            (Self::Depart, TravelBooked) => Some(PanditEnRoute),
            (Self::Depart, Confirmed) if !booking.travel_required => Some(PanditEnRoute),
            (Self::Arrive, PanditEnRoute) => Some(PanditArrived),
            (Self::StartPuja, PanditArrived) => Some(PujaInProgress),
            (Self::Complete, PujaInProgress) => Some(Completed),
            _ => None,
        }
    }

    fn permits(&self, booking: &Booking, actor: &Actor) -> bool {
        let assigned_pandit =
            actor.role == ActorRole::Pandit && booking.is_assigned_pandit(&actor.id);
        match self {
            Self::Request { .. } => matches!(actor.role, ActorRole::Admin | ActorRole::System),
            Self::Accept | Self::Decline => assigned_pandit,
            Self::BookTravel | Self::Refund => actor.is_admin(),
            Self::Depart | Self::Arrive | Self::StartPuja | Self::Complete => {
                assigned_pandit || actor.is_admin()
            }
            Self::Cancel => {
                (actor.role == ActorRole::Customer && actor.id == booking.customer_id)
                    || actor.is_admin()
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Customer,
    Pandit,
    Admin,
}

/// Work the caller has to carry out once the transition is persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SideEffect {
    PersistStatus {
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    },
    Notify {
        party: Party,
        recipient: String,
        event: String,
    },
    IssueRefund {
        booking_id: Uuid,
        percent: u8,
        amount: Money,
    },
    EnqueuePayout {
        booking_id: Uuid,
        amount: Money,
    },
    RequestReview {
        booking_id: Uuid,
        customer_id: String,
    },
    RequestRematch {
        booking_id: Uuid,
        declined_by: String,
    },
}

/// Inputs of a transition that do not come from the booking itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionContext {
    pub now: DateTime<Utc>,
    pub policy: PayoutPolicy,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    /// Next snapshot, with `change` appended to its history and its version bumped.
    pub booking: Booking,
    pub change: StatusChange,
    pub side_effects: Vec<SideEffect>,
}

/// Validates `action` against `booking` and computes its outcome.
///
/// Checks run in a fixed order: the status table first (so a repeated action
/// always reports [`EngineError::InvalidTransition`]), then the actor, then
/// action specific preconditions.
pub fn transition(
    booking: &Booking,
    action: &Action,
    actor: &Actor,
    note: Option<&str>,
    ctx: &TransitionContext,
) -> ResultEngine<Transition> {
    let from = booking.status;
    let to = action
        .target(booking)
        .ok_or_else(|| EngineError::InvalidTransition {
            booking: booking.booking_number.clone(),
            current: from,
            action: action.name(),
        })?;
    if !action.permits(booking, actor) {
        return Err(EngineError::UnauthorizedActor {
            actor: actor.id.clone(),
            action: action.name(),
        });
    }

    let mut next = booking.clone();
    next.status = to;
    let mut side_effects = vec![SideEffect::PersistStatus {
        booking_id: booking.id,
        from,
        to,
    }];
    let missing = |field| EngineError::MissingPrecondition {
        booking: booking.booking_number.clone(),
        field,
    };
    let notify = |party, recipient: &str, event: &str| SideEffect::Notify {
        party,
        recipient: recipient.to_string(),
        event: event.to_string(),
    };

    match action {
        Action::Request { pandit_id } => {
            let pandit_id = pandit_id.trim();
            if pandit_id.is_empty() {
                return Err(missing("pandit_id"));
            }
            next.pandit_id = Some(pandit_id.to_string());
            side_effects.push(notify(Party::Pandit, pandit_id, "booking_requested"));
        }
        Action::Accept => {
            next.platform_fee = Some(ctx.policy.platform_fee(booking.dakshina_amount)?);
            side_effects.push(notify(
                Party::Customer,
                &booking.customer_id,
                "booking_confirmed",
            ));
        }
        Action::Decline => {
            next.pandit_id = None;
            side_effects.push(SideEffect::RequestRematch {
                booking_id: booking.id,
                declined_by: actor.id.clone(),
            });
        }
        Action::BookTravel => {
            if booking.calculated_travel_cost.is_none() {
                return Err(missing("calculated_travel_cost"));
            }
            if let Some(pandit_id) = &booking.pandit_id {
                side_effects.push(notify(Party::Pandit, pandit_id, "travel_booked"));
            }
        }
        Action::Depart => {
            side_effects.push(notify(
                Party::Customer,
                &booking.customer_id,
                "pandit_en_route",
            ));
        }
        Action::Arrive => {
            side_effects.push(notify(
                Party::Customer,
                &booking.customer_id,
                "pandit_arrived",
            ));
        }
        Action::StartPuja => {}
        Action::Complete => {
            let breakdown = compute_payout(&next)?;
            next.payout.amount = Some(breakdown.net);
            side_effects.push(SideEffect::EnqueuePayout {
                booking_id: booking.id,
                amount: breakdown.net,
            });
            side_effects.push(SideEffect::RequestReview {
                booking_id: booking.id,
                customer_id: booking.customer_id.clone(),
            });
        }
        Action::Cancel | Action::Refund => {
            let quote = if *action == Action::Cancel {
                compute_refund(booking.event_date, ctx.now, booking.total_amount)?
            } else {
                RefundQuote {
                    percent: 100,
                    amount: booking.total_amount,
                }
            };
            next.apply_refund(quote, ctx.now);
            side_effects.push(SideEffect::IssueRefund {
                booking_id: booking.id,
                percent: quote.percent,
                amount: quote.amount,
            });
            let event = if to == BookingStatus::Cancelled {
                "booking_cancelled"
            } else {
                "booking_refunded"
            };
            side_effects.push(notify(Party::Customer, &booking.customer_id, event));
            if let Some(pandit_id) = &booking.pandit_id {
                side_effects.push(notify(Party::Pandit, pandit_id, event));
            }
        }
    }

    let change = StatusChange {
        id: Uuid::new_v4(),
        booking_id: booking.id,
        sequence: i64::try_from(booking.history.len()).unwrap_or(i64::MAX - 1) + 1,
        from_status: from,
        to_status: to,
        action: action.name().to_string(),
        actor_id: actor.id.clone(),
        note: note
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string),
        changed_at: ctx.now,
    };
    next.history.push(change.clone());
    next.version += 1;

    Ok(Transition {
        booking: next,
        change,
        side_effects,
    })
}
