//! Ride status notifications for riders and drivers.
//!
//! The engine never waits on delivery: notifications are logged and, when a
//! webhook is configured, posted from a background task.

use chrono::{DateTime, FixedOffset};
use sea_orm::{ConnectionTrait, DbErr, EntityTrait};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::ride::{self, RideStatus};
use crate::entities::user;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RideEvent {
    Booked,
    Updated,
    Cancelled,
    Accepted,
    Started,
    Completed,
}

#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub vehicle_type: Option<String>,
    pub license_plate: Option<String>,
}

impl From<user::Model> for Contact {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            vehicle_type: u.vehicle_type,
            license_plate: u.license_plate,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RideNotification {
    pub ride_id: Uuid,
    pub event: RideEvent,
    pub status: RideStatus,
    pub pickup_datetime: DateTime<FixedOffset>,
    pub fare: f64,
    pub rider: Option<Contact>,
    pub driver: Option<Contact>,
}

impl RideNotification {
    pub async fn load<C: ConnectionTrait>(
        conn: &C,
        event: RideEvent,
        ride: &ride::Model,
    ) -> Result<Self, DbErr> {
        let rider = user::Entity::find_by_id(ride.rider_id).one(conn).await?;
        let driver = match ride.driver_id {
            Some(driver_id) => user::Entity::find_by_id(driver_id).one(conn).await?,
            None => None,
        };

        Ok(Self {
            ride_id: ride.id,
            event,
            status: ride.status,
            pickup_datetime: ride.pickup_datetime,
            fare: ride.fare,
            rider: rider.map(Contact::from),
            driver: driver.map(Contact::from),
        })
    }
}

#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }

    pub fn dispatch(&self, notification: RideNotification) {
        tracing::info!(
            ride_id = %notification.ride_id,
            event = ?notification.event,
            status = %notification.status,
            rider = notification.rider.as_ref().map(|c| c.email.as_str()),
            driver = notification.driver.as_ref().map(|c| c.email.as_str()),
            "Ride notification"
        );

        let Some(url) = self.webhook_url.clone() else {
            return;
        };

        let client = self.client.clone();
        tokio::spawn(async move {
            let result = client
                .post(&url)
                .json(&notification)
                .send()
                .await
                .and_then(|response| response.error_for_status());

            if let Err(e) = result {
                tracing::warn!(
                    ride_id = %notification.ride_id,
                    error = %e,
                    "Failed to deliver ride notification"
                );
            }
        });
    }
}
