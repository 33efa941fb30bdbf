pub mod admin;
pub mod auth;
pub mod driver;
pub mod rider;

use crate::entities::ride;
use crate::notifications::{RideEvent, RideNotification};
use crate::AppState;

/// Build and hand off a notification. Failures are logged, never returned:
/// the ride change is already committed.
pub(crate) async fn notify(state: &AppState, event: RideEvent, ride: &ride::Model) {
    match RideNotification::load(&state.db, event, ride).await {
        Ok(notification) => state.notifier.dispatch(notification),
        Err(e) => tracing::warn!(
            ride_id = %ride.id,
            error = %e,
            "Failed to build ride notification"
        ),
    }
}
