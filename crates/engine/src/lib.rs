//! Booking lifecycle and financial reconciliation engine.
//!
//! The pure rules (state machine, refund policy, travel aggregation, payout
//! computation, rating aggregation) live in their own modules and can be used
//! without a database. [`Engine`] wraps them with persistence: it loads a
//! booking, applies a rule and writes the result back in a single database
//! transaction.

pub use bookings::{AppliedRefund, Booking, DiscrepancyResolution, NewBooking, PayoutRecord};
pub use error::EngineError;
pub use export::write_payouts_csv;
pub use lifecycle::{
    Action, Actor, ActorRole, Party, SideEffect, Transition, TransitionContext, transition,
};
pub use money::Money;
pub use ops::{Engine, EngineBuilder, TransitionOutcome};
pub use payout::{
    BatchFailure, BatchOutcome, LineItem, LineItemKind, PaymentDetails, PaymentMethod,
    PayoutBreakdown, PayoutPolicy, compute_payout, ensure_payout_eligible, flag_discrepancy,
};
pub use refund::{RefundQuote, compute_refund, refund_percent};
pub use reviews::{
    OverallRating, Ratings, Review, ensure_review_allowed, normalize_comment, MIN_COMMENT_CHARS,
};
pub use status::{BookingStatus, PayoutStatus};
pub use status_history::StatusChange;
pub use travel::{
    TravelCostComponents, TravelEstimator, TravelRequest, aggregate_travel_cost,
    estimate_travel_cost,
};

mod bookings;
mod error;
mod export;
mod lifecycle;
mod money;
mod ops;
mod payout;
mod refund;
mod reviews;
mod status;
mod status_history;
mod travel;

type ResultEngine<T> = Result<T, EngineError>;
