use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::handlers::{admin, auth, driver, rider};
use crate::middleware::auth::{auth_middleware, require_admin, require_driver, require_rider};
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::role_rate_limit::{create_role_governor, RateLimitedRole};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let rider_governor = create_role_governor(RateLimitedRole::Rider);
    let driver_governor = create_role_governor(RateLimitedRole::Driver);

    // Public routes, limited per IP
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(create_public_governor());

    // Rider routes (requires auth + rider role)
    // Rate limit: 100 requests per minute per user
    let rider_routes = Router::new()
        .route("/dashboard", get(rider::dashboard))
        .route("/contracts/availability", get(rider::contract_availability))
        .route("/rides", post(rider::book_ride))
        .route("/rides/{id}", get(rider::get_ride).put(rider::edit_ride))
        .route("/rides/{id}/cancel", post(rider::cancel_ride))
        .layer(rider_governor)
        .layer(middleware::from_fn(require_rider))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Driver routes (requires auth + driver role)
    // Rate limit: 500 requests per minute per user
    let driver_routes = Router::new()
        .route("/dashboard", get(driver::dashboard))
        .route("/rides/{id}", get(driver::get_ride))
        .route("/rides/{id}/accept", post(driver::accept_ride))
        .route("/rides/{id}/start", post(driver::start_ride))
        .route("/rides/{id}/complete", post(driver::complete_ride))
        .layer(driver_governor)
        .layer(middleware::from_fn(require_driver))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Admin routes, covered by the global limiter only
    let admin_routes = Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/cars", get(admin::list_cars).post(admin::create_car))
        .route("/cars/{id}", put(admin::update_car))
        .route("/cars/{id}/toggle", post(admin::toggle_car))
        .route(
            "/contracts",
            get(admin::list_contracts).post(admin::create_contract),
        )
        .route("/contracts/{id}", put(admin::update_contract))
        .route("/contracts/{id}/rides", get(admin::contract_rides))
        .route("/users/{id}/toggle-active", post(admin::toggle_user_active))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/rider", rider_routes)
        .nest("/api/driver", driver_routes)
        .nest("/api/admin", admin_routes)
        .with_state(state)
}
