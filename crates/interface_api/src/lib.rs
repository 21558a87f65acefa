//! HTTP API Layer
//!
//! This crate provides the REST API for the clinic booking system using
//! Axum.
//!
//! # Architecture
//!
//! - **Handlers**: payment and appointment endpoints plus health probes
//! - **Middleware**: JWT authentication, audit logging, tracing
//! - **DTOs**: request/response data transfer objects, including the
//!   raw-card-field rejection on the payment request
//! - **Error Handling**: consistent structured error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, config::ApiConfig};
//!
//! let app = create_router(pool, config)?;
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use core_kernel::CoreError;
use domain_booking::{BookingOrchestrator, DispatchNotifier, PrerequisiteApiGate};
use domain_payments::adapters::{AltGatewayAdapter, CardGatewayAdapter, LocalRailsAdapter};
use domain_payments::{PaymentRouter, PaymentService};
use infra_db::{
    PostgresAppointmentStore, PostgresPaymentStore, PostgresReconciliationQueue,
    PostgresUserDirectory,
};

use crate::config::ApiConfig;
use crate::handlers::{appointments, health, payments};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: ApiConfig,
    pub payments: Arc<PaymentService>,
    pub booking: Arc<BookingOrchestrator>,
}

/// Creates the main API router
///
/// Wires the provider adapters, the payment router, the database-backed
/// stores, and the booking orchestrator from configuration.
///
/// # Errors
///
/// Returns an error when the configured business rules are invalid
/// (unknown currency, non-positive fee or window).
pub fn create_router(pool: PgPool, config: ApiConfig) -> Result<Router, CoreError> {
    let policy = config.booking_policy()?;

    let payment_router = PaymentRouter::new()
        .with_provider(Arc::new(CardGatewayAdapter::new(config.card_gateway_config())))
        .with_provider(Arc::new(AltGatewayAdapter::new(config.alt_gateway_config())))
        .with_provider(Arc::new(LocalRailsAdapter::new()));
    tracing::info!(providers = ?payment_router.registered(), "payment router ready");

    let payment_store = Arc::new(PostgresPaymentStore::new(pool.clone()));
    let user_directory = Arc::new(PostgresUserDirectory::new(pool.clone()));
    let payment_service = Arc::new(PaymentService::new(
        Arc::new(payment_router),
        payment_store.clone(),
        user_directory,
    ));

    let booking = Arc::new(BookingOrchestrator::new(
        Arc::new(PrerequisiteApiGate::new(config.gate_config())),
        Arc::new(PostgresAppointmentStore::new(pool.clone())),
        payment_store,
        Arc::new(DispatchNotifier::new(config.notifier_config())),
        Arc::new(PostgresReconciliationQueue::new(pool.clone())),
        policy,
    ));

    let state = AppState {
        pool,
        config,
        payments: payment_service,
        booking,
    };

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    // Payment routes
    let payment_routes = Router::new()
        .route("/", post(payments::create_payment))
        .route("/:id", get(payments::get_payment));

    // Appointment routes
    let appointment_routes = Router::new()
        .route("/", post(appointments::create_appointment))
        .route("/", get(appointments::list_appointments))
        .route("/:id", get(appointments::get_appointment))
        .route("/:id", patch(appointments::update_appointment));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/payments", payment_routes)
        .nest("/appointments", appointment_routes)
        .layer(axum_middleware::from_fn_with_state(state.clone(), audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Ok(Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state))
}
