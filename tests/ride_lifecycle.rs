mod common;

use sea_orm::Set;

use common::{booked, create_car, create_contract, create_user, now, setup, trip};
use ride_booking_backend::booking::{lifecycle, repository, service, BookingError, Caller};
use ride_booking_backend::entities::ride::{self, RideStatus};
use ride_booking_backend::entities::user::UserRole;
use ride_booking_backend::notifications::{RideEvent, RideNotification};

struct Fixture {
    db: sea_orm::DatabaseConnection,
    rider: Caller,
    driver: Caller,
    ride_id: uuid::Uuid,
}

async fn pending_ride() -> Fixture {
    let db = setup().await;
    let rider = create_user(&db, UserRole::Rider, "rider").await;
    let driver = create_user(&db, UserRole::Driver, "driver").await;
    let car = create_car(&db, "ABC123", true).await;
    create_contract(&db, &rider, &car, 500.0, 0).await;

    let ride = booked(
        service::book(&db, &rider, trip("2026-10-20T09:00:00Z", 10.0), now())
            .await
            .unwrap(),
    );

    Fixture {
        db,
        rider,
        driver,
        ride_id: ride.ride.id,
    }
}

#[tokio::test]
async fn ride_runs_through_full_lifecycle() {
    let f = pending_ride().await;

    let accepted = lifecycle::accept(&f.db, &f.driver, f.ride_id, now()).await.unwrap();
    assert_eq!(accepted.status, RideStatus::Accepted);
    assert_eq!(accepted.driver_id, Some(f.driver.user_id));

    let started = lifecycle::start(&f.db, &f.driver, f.ride_id, now()).await.unwrap();
    assert_eq!(started.status, RideStatus::InProgress);
    assert_eq!(started.driver_id, Some(f.driver.user_id));

    let completed = lifecycle::complete(&f.db, &f.driver, f.ride_id, now()).await.unwrap();
    assert_eq!(completed.status, RideStatus::Completed);
}

#[tokio::test]
async fn second_accept_loses() {
    let f = pending_ride().await;
    let other_driver = create_user(&f.db, UserRole::Driver, "other-driver").await;

    lifecycle::accept(&f.db, &f.driver, f.ride_id, now()).await.unwrap();
    let err = lifecycle::accept(&f.db, &other_driver, f.ride_id, now())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::RideNoLongerAvailable));

    let ride = repository::find_ride(&f.db, f.ride_id).await.unwrap();
    assert_eq!(ride.driver_id, Some(f.driver.user_id));
}

// The test pool has a single connection, so the two calls run one after the
// other and the loser is turned away by the status read. The write-time
// check is covered by `conditional_update_applies_once`.
#[tokio::test]
async fn joined_accepts_have_one_winner() {
    let f = pending_ride().await;
    let other_driver = create_user(&f.db, UserRole::Driver, "other-driver").await;

    let (first, second) = tokio::join!(
        lifecycle::accept(&f.db, &f.driver, f.ride_id, now()),
        lifecycle::accept(&f.db, &other_driver, f.ride_id, now()),
    );

    assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let loser = if first.is_ok() { second } else { first };
    assert!(matches!(loser, Err(BookingError::RideNoLongerAvailable)));
}

#[tokio::test]
async fn only_assigned_driver_can_start() {
    let f = pending_ride().await;
    let other_driver = create_user(&f.db, UserRole::Driver, "other-driver").await;

    lifecycle::accept(&f.db, &f.driver, f.ride_id, now()).await.unwrap();
    let err = lifecycle::start(&f.db, &other_driver, f.ride_id, now())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotAssignedDriver));
}

#[tokio::test]
async fn skipping_accept_is_a_status_mismatch() {
    let f = pending_ride().await;

    let err = lifecycle::start(&f.db, &f.driver, f.ride_id, now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::StatusMismatch {
            expected: RideStatus::Accepted,
            actual: RideStatus::Pending
        }
    ));

    let err = lifecycle::complete(&f.db, &f.driver, f.ride_id, now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::StatusMismatch {
            expected: RideStatus::InProgress,
            actual: RideStatus::Pending
        }
    ));

    let ride = repository::find_ride(&f.db, f.ride_id).await.unwrap();
    assert_eq!(ride.status, RideStatus::Pending);
}

#[tokio::test]
async fn complete_before_start_is_a_status_mismatch() {
    let f = pending_ride().await;

    lifecycle::accept(&f.db, &f.driver, f.ride_id, now()).await.unwrap();
    let err = lifecycle::complete(&f.db, &f.driver, f.ride_id, now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::StatusMismatch {
            expected: RideStatus::InProgress,
            actual: RideStatus::Accepted
        }
    ));
}

#[tokio::test]
async fn cancel_checks_owner_and_status() {
    let f = pending_ride().await;
    let stranger = create_user(&f.db, UserRole::Rider, "stranger").await;

    let err = lifecycle::cancel(&f.db, &stranger, f.ride_id, now())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotRideOwner));

    let err = lifecycle::cancel(&f.db, &f.driver, f.ride_id, now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::WrongRole {
            required: UserRole::Rider
        }
    ));

    let cancelled = lifecycle::cancel(&f.db, &f.rider, f.ride_id, now()).await.unwrap();
    assert_eq!(cancelled.status, RideStatus::Cancelled);

    let err = lifecycle::cancel(&f.db, &f.rider, f.ride_id, now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::StatusMismatch {
            expected: RideStatus::Pending,
            actual: RideStatus::Cancelled
        }
    ));

    // Cancelled rides cannot be claimed
    let err = lifecycle::accept(&f.db, &f.driver, f.ride_id, now())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::RideNoLongerAvailable));
}

#[tokio::test]
async fn riders_cannot_drive() {
    let f = pending_ride().await;

    let err = lifecycle::accept(&f.db, &f.rider, f.ride_id, now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::WrongRole {
            required: UserRole::Driver
        }
    ));
}

#[tokio::test]
async fn unknown_ride_is_not_found() {
    let f = pending_ride().await;

    let err = lifecycle::accept(&f.db, &f.driver, uuid::Uuid::new_v4(), now())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::RideNotFound));
}

#[tokio::test]
async fn conditional_update_applies_once() {
    let f = pending_ride().await;

    let changes = || ride::ActiveModel {
        status: Set(RideStatus::Accepted),
        ..Default::default()
    };

    let first = repository::update_if_status(&f.db, f.ride_id, RideStatus::Pending, changes())
        .await
        .unwrap();
    let second = repository::update_if_status(&f.db, f.ride_id, RideStatus::Pending, changes())
        .await
        .unwrap();

    assert!(first);
    assert!(!second);
}

#[tokio::test]
async fn notification_carries_both_contacts_once_assigned() {
    let f = pending_ride().await;

    let pending = repository::find_ride(&f.db, f.ride_id).await.unwrap();
    let booked = RideNotification::load(&f.db, RideEvent::Booked, &pending)
        .await
        .unwrap();
    assert_eq!(booked.rider.as_ref().map(|c| c.id), Some(f.rider.user_id));
    assert!(booked.driver.is_none());

    let accepted = lifecycle::accept(&f.db, &f.driver, f.ride_id, now()).await.unwrap();
    let notification = RideNotification::load(&f.db, RideEvent::Accepted, &accepted)
        .await
        .unwrap();
    assert_eq!(notification.driver.as_ref().map(|c| c.id), Some(f.driver.user_id));

    let body = serde_json::to_value(&notification).unwrap();
    assert_eq!(body["event"], "accepted");
    assert_eq!(body["status"], "accepted");
    assert_eq!(body["driver"]["username"], "driver");
}
