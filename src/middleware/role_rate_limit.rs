use axum::http::Request;
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder,
    key_extractor::KeyExtractor,
    GovernorError, GovernorLayer,
};
use uuid::Uuid;

use crate::middleware::rate_limit::rate_limit_error_handler;
use crate::utils::jwt::Claims;

/// Keys the limiter on the authenticated user id (set by auth_middleware)
#[derive(Debug, Clone, Copy)]
pub struct UserIdExtractor;

impl KeyExtractor for UserIdExtractor {
    type Key = Uuid;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        req.extensions()
            .get::<Claims>()
            .map(|claims| claims.sub)
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

pub type RoleGovernorLayer = GovernorLayer<
    UserIdExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    axum::body::Body,
>;

/// Roles with a per-user budget. Admin routes are only IP-limited, so admins
/// are deliberately absent here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitedRole {
    Rider,
    Driver,
}

impl RateLimitedRole {
    /// (milliseconds per replenished token, burst size)
    pub fn quota(self) -> (u64, u32) {
        match self {
            // Drivers poll the pending pool, so they get 5x the rider budget
            RateLimitedRole::Driver => (120, 500),
            RateLimitedRole::Rider => (600, 100),
        }
    }
}

pub fn create_role_governor(role: RateLimitedRole) -> RoleGovernorLayer {
    let (per_ms, burst) = role.quota();

    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(burst)
            .key_extractor(UserIdExtractor)
            .finish()
            .expect("rate limit period and burst must be non-zero"),
    );

    GovernorLayer::new(config).error_handler(rate_limit_error_handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::user::UserRole;

    #[test]
    fn test_extracts_user_id_from_claims() {
        let id = Uuid::new_v4();
        let mut request = Request::new(());
        request.extensions_mut().insert(Claims {
            sub: id,
            email: "d@example.com".to_string(),
            role: UserRole::Driver,
            exp: 0,
            iat: 0,
        });

        assert_eq!(UserIdExtractor.extract(&request).unwrap(), id);
    }

    #[test]
    fn test_missing_claims_cannot_be_keyed() {
        let request = Request::new(());
        assert!(UserIdExtractor.extract(&request).is_err());
    }

    #[test]
    fn test_driver_budget_exceeds_rider_budget() {
        let (_, driver_burst) = RateLimitedRole::Driver.quota();
        let (_, rider_burst) = RateLimitedRole::Rider.quota();
        assert!(driver_burst > rider_burst);
    }
}
