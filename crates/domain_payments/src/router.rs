//! Payment router
//!
//! Maps a payment method to the adapter responsible for it and exposes
//! the provider contract behind a single dispatch point. Routing is a
//! pure decision: the router performs no work beyond validating the
//! dispatch and invoking the selected adapter.
//!
//! # Routing policy
//!
//! - `card` -> card gateway (hosted checkout)
//! - mobile money -> local rails by default; an explicit caller override
//!   may route it to the card gateway's push-charge path instead
//! - bank transfer, GhQR, wallet, cash-on-delivery -> local rails
//!
//! A resolved provider must also be present in the registry; an
//! unregistered provider is a hard error, not a lookup miss.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use core_kernel::Money;

use crate::payment::{PaymentMethod, ProviderKind};
use crate::provider::{ChargeOutcome, ChargeRequest, PaymentProvider, ProviderError};

/// Registry of provider adapters plus the dispatch rules
pub struct PaymentRouter {
    providers: HashMap<ProviderKind, Arc<dyn PaymentProvider>>,
}

impl PaymentRouter {
    /// Creates an empty router
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Registers an adapter under its own kind
    pub fn with_provider(mut self, provider: Arc<dyn PaymentProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    /// Returns the registered provider kinds
    pub fn registered(&self) -> Vec<ProviderKind> {
        self.providers.keys().copied().collect()
    }

    /// Resolves the adapter responsible for a method
    ///
    /// The override is honored only where policy allows it: the three
    /// mobile-money variants may be pushed through the card gateway.
    /// Restating the default route is accepted; anything else is an
    /// unsupported combination.
    pub fn resolve(
        &self,
        method: PaymentMethod,
        override_provider: Option<ProviderKind>,
    ) -> Result<ProviderKind, ProviderError> {
        let default = match method {
            PaymentMethod::Card => ProviderKind::CardGateway,
            _ => ProviderKind::LocalRails,
        };

        let resolved = match override_provider {
            None => default,
            Some(requested) if requested == default => default,
            Some(ProviderKind::CardGateway) if method.is_mobile_money() => {
                ProviderKind::CardGateway
            }
            Some(requested) => {
                return Err(ProviderError::UnsupportedMethod(format!(
                    "{} cannot be routed through {}",
                    method, requested
                )));
            }
        };

        Ok(resolved)
    }

    fn provider(&self, kind: ProviderKind) -> Result<&Arc<dyn PaymentProvider>, ProviderError> {
        self.providers
            .get(&kind)
            .ok_or(ProviderError::UnregisteredProvider(kind))
    }

    /// Routes a charge to the responsible adapter
    ///
    /// Returns the provider the charge was dispatched to alongside the
    /// normalized outcome.
    pub async fn process_payment(
        &self,
        request: &ChargeRequest,
        override_provider: Option<ProviderKind>,
    ) -> Result<(ProviderKind, ChargeOutcome), ProviderError> {
        let kind = self.resolve(request.method, override_provider)?;
        let provider = self.provider(kind)?;

        debug!(method = %request.method, provider = %kind, "routing charge");
        let outcome = provider.process_payment(request).await?;
        Ok((kind, outcome))
    }

    /// Routes a verification to the provider that handled the charge
    pub async fn verify_payment(
        &self,
        kind: ProviderKind,
        transaction_ref: &str,
    ) -> Result<ChargeOutcome, ProviderError> {
        self.provider(kind)?.verify_payment(transaction_ref).await
    }

    /// Routes a refund to the provider that handled the charge
    pub async fn refund_payment(
        &self,
        kind: ProviderKind,
        transaction_ref: &str,
        amount: Money,
    ) -> Result<ChargeOutcome, ProviderError> {
        self.provider(kind)?
            .refund_payment(transaction_ref, amount)
            .await
    }
}

impl Default for PaymentRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_router() -> PaymentRouter {
        PaymentRouter::new()
    }

    #[test]
    fn test_card_routes_to_card_gateway() {
        let router = empty_router();
        assert_eq!(
            router.resolve(PaymentMethod::Card, None).unwrap(),
            ProviderKind::CardGateway
        );
    }

    #[test]
    fn test_local_methods_route_to_local_rails() {
        let router = empty_router();
        for method in [
            PaymentMethod::MtnMomo,
            PaymentMethod::VodafoneCash,
            PaymentMethod::AirtelTigoMoney,
            PaymentMethod::BankTransfer,
            PaymentMethod::GhQr,
            PaymentMethod::Wallet,
            PaymentMethod::CashOnDelivery,
        ] {
            assert_eq!(
                router.resolve(method, None).unwrap(),
                ProviderKind::LocalRails,
                "{} should default to local rails",
                method
            );
        }
    }

    #[test]
    fn test_mobile_money_override_to_push_charge() {
        let router = empty_router();
        assert_eq!(
            router
                .resolve(PaymentMethod::MtnMomo, Some(ProviderKind::CardGateway))
                .unwrap(),
            ProviderKind::CardGateway
        );
    }

    #[test]
    fn test_non_mobile_override_rejected() {
        let router = empty_router();
        let err = router
            .resolve(PaymentMethod::BankTransfer, Some(ProviderKind::CardGateway))
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedMethod(_)));

        let err = router
            .resolve(PaymentMethod::Card, Some(ProviderKind::AltGateway))
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedMethod(_)));
    }

    #[test]
    fn test_restating_the_default_is_accepted() {
        let router = empty_router();
        assert_eq!(
            router
                .resolve(PaymentMethod::Wallet, Some(ProviderKind::LocalRails))
                .unwrap(),
            ProviderKind::LocalRails
        );
    }
}
