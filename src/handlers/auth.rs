use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::utils::jwt::issue_token;
use crate::utils::password::{hash_password, verify_password};
use crate::AppState;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: UserRole,
    #[serde(default)]
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub license_plate: Option<String>,
}

fn default_role() -> UserRole {
    UserRole::Rider
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub role: UserRole,
}

impl From<&user::Model> for UserInfo {
    fn from(u: &user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            username: u.username.clone(),
            role: u.role,
        }
    }
}

fn validate_registration(payload: &RegisterRequest) -> AppResult<()> {
    if payload.role == UserRole::Admin {
        return Err(AppError::Forbidden(
            "Admin accounts cannot be self-registered".to_string(),
        ));
    }
    if !payload.email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".to_string()));
    }
    if payload.username.trim().is_empty() {
        return Err(AppError::BadRequest("Username is required".to_string()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Register a rider or driver account
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    validate_registration(&payload)?;

    let email = payload.email.trim().to_lowercase();
    let username = payload.username.trim().to_string();

    if user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    if user::Entity::find()
        .filter(user::Column::Username.eq(&username))
        .one(&state.db)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Username already taken".to_string()));
    }

    // Vehicle details only make sense for drivers
    let (vehicle_type, license_plate) = match payload.role {
        UserRole::Driver => (payload.vehicle_type, payload.license_plate),
        _ => (None, None),
    };

    let user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        username: Set(username),
        password_hash: Set(hash_password(&payload.password)?),
        role: Set(payload.role),
        is_active: Set(true),
        vehicle_type: Set(vehicle_type),
        license_plate: Set(license_plate),
        current_location_lat: Set(None),
        current_location_lng: Set(None),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(&state.db)
    .await?;

    tracing::info!(user_id = %user.id, role = ?user.role, "User registered");

    let token = issue_token(&user, &state.config)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserInfo::from(&user),
        }),
    ))
}

/// Login with email and password
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = user::Entity::find()
        .filter(user::Column::Email.eq(payload.email.trim().to_lowercase()))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid email or password".to_string()));
    }

    if !user.is_active {
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }

    let token = issue_token(&user, &state.config)?;
    Ok(Json(AuthResponse {
        token,
        user: UserInfo::from(&user),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(role: UserRole) -> RegisterRequest {
        RegisterRequest {
            email: "new@example.com".to_string(),
            username: "newbie".to_string(),
            password: "longenough".to_string(),
            role,
            vehicle_type: None,
            license_plate: None,
        }
    }

    #[test]
    fn test_admin_cannot_self_register() {
        assert!(matches!(
            validate_registration(&registration(UserRole::Admin)),
            Err(AppError::Forbidden(_))
        ));
        assert!(validate_registration(&registration(UserRole::Driver)).is_ok());
    }

    #[test]
    fn test_short_password_rejected() {
        let mut payload = registration(UserRole::Rider);
        payload.password = "abc".to_string();
        assert!(matches!(
            validate_registration(&payload),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_role_defaults_to_rider() {
        let payload: RegisterRequest = serde_json::from_str(
            r#"{"email":"a@b.c","username":"a","password":"secret1"}"#,
        )
        .unwrap();
        assert_eq!(payload.role, UserRole::Rider);
    }
}
