use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid, // user id
    pub email: String,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn for_user(user: &user::Model, expiration_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            exp: (now + Duration::hours(expiration_hours)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Sign a session token for `user` with the configured secret and lifetime
pub fn issue_token(user: &user::Model, config: &Config) -> AppResult<String> {
    let claims = Claims::for_user(user, config.jwt_expiration_hours);
    sign(&claims, &config.jwt_secret)
}

fn sign(claims: &Claims, secret: &str) -> AppResult<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
}

pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            username: "someone".to_string(),
            password_hash: String::new(),
            role,
            is_active: true,
            vehicle_type: None,
            license_plate: None,
            current_location_lat: None,
            current_location_lng: None,
            created_at: Utc::now().fixed_offset(),
        }
    }

    #[test]
    fn test_token_keeps_identity_and_role() {
        let rider = user(UserRole::Rider);
        let token = sign(&Claims::for_user(&rider, 1), "secret").unwrap();

        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, rider.id);
        assert_eq!(claims.role, UserRole::Rider);
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let token = sign(&Claims::for_user(&user(UserRole::Driver), 1), "a").unwrap();
        assert!(matches!(
            verify_token(&token, "b"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = sign(&Claims::for_user(&user(UserRole::Admin), -2), "secret").unwrap();
        assert!(verify_token(&token, "secret").is_err());
    }
}
