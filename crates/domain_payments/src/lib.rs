//! Payments Domain - Provider adapters, routing, and the payment lifecycle
//!
//! This crate implements the payment half of the booking flow:
//!
//! - **Provider adapters**: one per external rail (card gateway hosted
//!   checkout and push charges, the synchronous alternative gateway, and
//!   the deployment-local rails), all behind one contract
//! - **Payment router**: deterministic method-to-adapter dispatch with a
//!   registry allow-list
//! - **Payment record manager**: idempotent persistence keyed by
//!   (user, provider transaction reference), with user-projection
//!   synthesis and raw-card rejection
//! - **Settlement poller**: bounded polling loop for asynchronous rails
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_payments::{PaymentRouter, PaymentService};
//! use domain_payments::adapters::{CardGatewayAdapter, LocalRailsAdapter};
//!
//! let router = PaymentRouter::new()
//!     .with_provider(Arc::new(CardGatewayAdapter::new(card_config)))
//!     .with_provider(Arc::new(LocalRailsAdapter::new()));
//!
//! let service = PaymentService::new(Arc::new(router), payments, users);
//! let payment = service.record_payment(&claims, request, None).await?;
//! ```

pub mod payment;
pub mod provider;
pub mod adapters;
pub mod router;
pub mod ports;
pub mod service;
pub mod poller;
pub mod error;

pub use payment::{Payment, PaymentMethod, PaymentStatus, ProviderKind};
pub use provider::{
    BankDetails, ChargeOutcome, ChargeRequest, CustomerDetails, PaymentProvider, ProviderError,
    RAW_CARD_FIELDS,
};
pub use router::PaymentRouter;
pub use ports::{IdentityClaims, PaymentStore, User, UserDirectory};
pub use service::PaymentService;
pub use poller::{PaymentStatusSource, PollConfig, PollOutcome, SettlementPoller};
pub use error::PaymentError;
