//! Provider adapters
//!
//! One adapter per external payment rail, all conforming to the
//! `PaymentProvider` contract defined in [`crate::provider`].

pub mod card_gateway;
pub mod alt_gateway;
pub mod local_rails;

pub use card_gateway::{CardGatewayAdapter, CardGatewayConfig};
pub use alt_gateway::{AltGatewayAdapter, AltGatewayConfig};
pub use local_rails::LocalRailsAdapter;
