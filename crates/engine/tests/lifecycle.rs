use chrono::{DateTime, Duration, Utc};
use sea_orm::Database;

use engine::{
    Action, Actor, BookingStatus, Engine, EngineError, Money, NewBooking, Party, Ratings,
    SideEffect, TravelCostComponents,
};
use migration::MigratorTrait;
use uuid::Uuid;

const CUSTOMER: &str = "cust-asha";
const PANDIT: &str = "pandit-ramesh";

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

fn new_booking(number: &str, event_date: DateTime<Utc>, travel_required: bool) -> NewBooking {
    NewBooking {
        booking_number: number.to_string(),
        customer_id: CUSTOMER.to_string(),
        event_date,
        total_amount: Money::new(10_000),
        dakshina_amount: Money::new(2_100),
        travel_required,
        food_allowance_amount: Money::new(200),
        samagri_amount: Money::ZERO,
    }
}

async fn confirmed_booking(
    engine: &Engine,
    number: &str,
    event_date: DateTime<Utc>,
    travel_required: bool,
) -> Uuid {
    let now = Utc::now();
    let id = engine
        .create_booking(new_booking(number, event_date, travel_required), now)
        .await
        .unwrap();
    engine
        .transition(
            id,
            Action::Request {
                pandit_id: PANDIT.to_string(),
            },
            &Actor::system(),
            None,
            now,
        )
        .await
        .unwrap();
    engine
        .transition(id, Action::Accept, &Actor::pandit(PANDIT), None, now)
        .await
        .unwrap();
    id
}

#[tokio::test]
async fn happy_path_reaches_completed_with_full_history() {
    let engine = engine_with_db().await;
    let now = Utc::now();
    let admin = Actor::admin("ops-1");
    let pandit = Actor::pandit(PANDIT);
    let id = confirmed_booking(&engine, "HPJ-1001", now + Duration::days(7), true).await;

    let components =
        TravelCostComponents::from_inputs(Some("300"), Some("300"), Some("200"), None).unwrap();
    let estimate = engine
        .record_travel_estimate(id, &components, &admin)
        .await
        .unwrap();
    assert_eq!(estimate, Money::new(800));

    engine
        .transition(id, Action::BookTravel, &admin, Some("train booked"), now)
        .await
        .unwrap();
    for action in [Action::Depart, Action::Arrive, Action::StartPuja] {
        engine
            .transition(id, action, &pandit, None, now)
            .await
            .unwrap();
    }
    let outcome = engine
        .transition(id, Action::Complete, &pandit, None, now)
        .await
        .unwrap();

    assert_eq!(outcome.status, BookingStatus::Completed);
    // 2100 - 315 (15% fee) + 800 travel + 200 food
    assert!(outcome.side_effects.contains(&SideEffect::EnqueuePayout {
        booking_id: id,
        amount: Money::new(2_785),
    }));
    assert!(outcome.side_effects.contains(&SideEffect::RequestReview {
        booking_id: id,
        customer_id: CUSTOMER.to_string(),
    }));

    let booking = engine.booking_by_number("HPJ-1001").await.unwrap();
    assert_eq!(booking.platform_fee, Some(Money::new(315)));
    assert_eq!(booking.payout.amount, Some(Money::new(2_785)));

    let history = engine.status_history(id).await.unwrap();
    let path: Vec<_> = history.iter().map(|c| c.to_status).collect();
    assert_eq!(
        path,
        vec![
            BookingStatus::PanditRequested,
            BookingStatus::Confirmed,
            BookingStatus::TravelBooked,
            BookingStatus::PanditEnRoute,
            BookingStatus::PanditArrived,
            BookingStatus::PujaInProgress,
            BookingStatus::Completed,
        ]
    );
    assert!(
        history
            .iter()
            .enumerate()
            .all(|(i, change)| change.sequence == i as i64 + 1)
    );
    assert_eq!(history[2].note.as_deref(), Some("train booked"));
    assert_eq!(history[2].actor_id, "ops-1");
}

#[tokio::test]
async fn repeated_action_is_rejected_and_changes_nothing() {
    let engine = engine_with_db().await;
    let now = Utc::now();
    let id = confirmed_booking(&engine, "HPJ-1002", now + Duration::days(3), false).await;
    let before = engine.booking(id).await.unwrap();

    let err = engine
        .transition(id, Action::Accept, &Actor::pandit(PANDIT), None, now)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidTransition {
            booking: "HPJ-1002".to_string(),
            current: BookingStatus::Confirmed,
            action: "accept",
        }
    );

    let after = engine.booking(id).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn concurrent_accepts_apply_once() {
    let engine = engine_with_db().await;
    let now = Utc::now();
    let id = engine
        .create_booking(new_booking("HPJ-1003", now + Duration::days(5), false), now)
        .await
        .unwrap();
    engine
        .transition(
            id,
            Action::Request {
                pandit_id: PANDIT.to_string(),
            },
            &Actor::admin("ops-1"),
            None,
            now,
        )
        .await
        .unwrap();

    let pandit = Actor::pandit(PANDIT);
    let (first, second) = tokio::join!(
        engine.transition(id, Action::Accept, &pandit, None, now),
        engine.transition(id, Action::Accept, &pandit, None, now),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(EngineError::InvalidTransition { .. } | EngineError::Conflict(_))
    )));
    assert_eq!(engine.status_history(id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn only_assigned_pandit_may_accept() {
    let engine = engine_with_db().await;
    let now = Utc::now();
    let id = engine
        .create_booking(new_booking("HPJ-1004", now + Duration::days(5), false), now)
        .await
        .unwrap();
    engine
        .transition(
            id,
            Action::Request {
                pandit_id: PANDIT.to_string(),
            },
            &Actor::system(),
            None,
            now,
        )
        .await
        .unwrap();

    let err = engine
        .transition(id, Action::Accept, &Actor::pandit("pandit-other"), None, now)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "unauthorized_actor");
    assert_eq!(
        engine.booking(id).await.unwrap().status,
        BookingStatus::PanditRequested
    );
}

#[tokio::test]
async fn decline_returns_booking_to_matching() {
    let engine = engine_with_db().await;
    let now = Utc::now();
    let id = engine
        .create_booking(new_booking("HPJ-1005", now + Duration::days(5), false), now)
        .await
        .unwrap();
    engine
        .transition(
            id,
            Action::Request {
                pandit_id: PANDIT.to_string(),
            },
            &Actor::system(),
            None,
            now,
        )
        .await
        .unwrap();

    let outcome = engine
        .transition(id, Action::Decline, &Actor::pandit(PANDIT), None, now)
        .await
        .unwrap();
    assert_eq!(outcome.status, BookingStatus::Created);
    assert!(outcome.side_effects.contains(&SideEffect::RequestRematch {
        booking_id: id,
        declined_by: PANDIT.to_string(),
    }));
    assert_eq!(engine.booking(id).await.unwrap().pandit_id, None);
}

#[tokio::test]
async fn cancellation_applies_tiered_refund_once() {
    let engine = engine_with_db().await;
    let now = Utc::now();
    let id = confirmed_booking(&engine, "HPJ-1006", now + Duration::hours(36), false).await;

    let quote = engine.quote_refund(id, now).await.unwrap();
    assert_eq!((quote.percent, quote.amount), (75, Money::new(7_500)));

    let outcome = engine
        .transition(id, Action::Cancel, &Actor::customer(CUSTOMER), None, now)
        .await
        .unwrap();
    assert_eq!(outcome.status, BookingStatus::Cancelled);
    assert!(outcome.side_effects.contains(&SideEffect::IssueRefund {
        booking_id: id,
        percent: 75,
        amount: Money::new(7_500),
    }));
    assert!(outcome.side_effects.iter().any(|effect| matches!(
        effect,
        SideEffect::Notify {
            party: Party::Pandit,
            ..
        }
    )));

    let refund = engine.booking(id).await.unwrap().refund.unwrap();
    assert_eq!(refund.amount, Money::new(7_500));

    // A later retry is rejected, so the refund is never issued twice.
    let err = engine
        .transition(id, Action::Cancel, &Actor::customer(CUSTOMER), None, now)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_transition");
    assert!(engine.quote_refund(id, now).await.is_err());
}

#[tokio::test]
async fn cancellation_close_to_event_refunds_nothing() {
    let engine = engine_with_db().await;
    let now = Utc::now();
    let id = confirmed_booking(&engine, "HPJ-1007", now + Duration::hours(10), false).await;

    engine
        .transition(id, Action::Cancel, &Actor::admin("ops-1"), None, now)
        .await
        .unwrap();
    let refund = engine.booking(id).await.unwrap().refund.unwrap();
    assert_eq!((refund.percent, refund.amount), (0, Money::ZERO));
}

#[tokio::test]
async fn other_customer_cannot_cancel() {
    let engine = engine_with_db().await;
    let now = Utc::now();
    let id = confirmed_booking(&engine, "HPJ-1008", now + Duration::days(10), false).await;

    let err = engine
        .transition(id, Action::Cancel, &Actor::customer("cust-other"), None, now)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "unauthorized_actor");
}

#[tokio::test]
async fn duplicate_booking_number_is_rejected() {
    let engine = engine_with_db().await;
    let now = Utc::now();
    engine
        .create_booking(new_booking("HPJ-1009", now, false), now)
        .await
        .unwrap();
    let err = engine
        .create_booking(new_booking("HPJ-1009", now, false), now)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("HPJ-1009".to_string()));
}

#[tokio::test]
async fn travel_booking_needs_an_estimate() {
    let engine = engine_with_db().await;
    let now = Utc::now();
    let id = confirmed_booking(&engine, "HPJ-1010", now + Duration::days(10), true).await;

    let err = engine
        .transition(id, Action::BookTravel, &Actor::admin("ops-1"), None, now)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::MissingPrecondition {
            booking: "HPJ-1010".to_string(),
            field: "calculated_travel_cost",
        }
    );
}

#[tokio::test]
async fn one_review_per_completed_booking() {
    let engine = engine_with_db().await;
    let now = Utc::now();
    let pandit = Actor::pandit(PANDIT);
    let customer = Actor::customer(CUSTOMER);
    let id = confirmed_booking(&engine, "HPJ-1011", now + Duration::days(2), false).await;

    let ratings = Ratings {
        punctuality: 5,
        knowledge: 5,
        conduct: 5,
        accuracy: 4,
        samagri: 5,
    };
    let err = engine
        .submit_review(id, &customer, ratings, "Wonderful griha pravesh", false, now)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "review_not_allowed");

    for action in [
        Action::Depart,
        Action::Arrive,
        Action::StartPuja,
        Action::Complete,
    ] {
        engine
            .transition(id, action, &pandit, None, now)
            .await
            .unwrap();
    }

    let stranger = Actor::customer("cust-other");
    let err = engine
        .submit_review(id, &stranger, ratings, "Wonderful griha pravesh", false, now)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "unauthorized_actor");

    let overall = engine
        .submit_review(id, &customer, ratings, "  Wonderful griha pravesh  ", true, now)
        .await
        .unwrap();
    assert_eq!(overall.to_string(), "4.8");

    let review = engine.review(id).await.unwrap();
    assert_eq!(review.comment, "Wonderful griha pravesh");
    assert!(review.anonymous);
    assert!(engine.booking(id).await.unwrap().has_review);

    let err = engine
        .submit_review(id, &customer, ratings, "Second thoughts on it", false, now)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::ReviewNotAllowed {
            booking: "HPJ-1011".to_string(),
            reason: "booking already has a review",
        }
    );
}
