//! Payment record manager
//!
//! Persists normalized adapter results as durable payment rows, honoring
//! idempotency and referential integrity:
//!
//! - raw card data is rejected here regardless of method, independent of
//!   the adapter-level check
//! - the authenticated principal must exist as a user row before insert;
//!   a missing projection is synthesized from identity claims, and a lost
//!   synthesis race is success
//! - once an adapter returns a provider transaction reference, a second
//!   request resolving to the same reference returns the existing payment
//!   unchanged instead of inserting a duplicate

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use core_kernel::{Money, PaymentId, PortError};

use crate::error::PaymentError;
use crate::payment::{Payment, PaymentStatus, ProviderKind};
use crate::poller::PaymentStatusSource;
use crate::ports::{IdentityClaims, PaymentStore, User, UserDirectory};
use crate::provider::{ChargeOutcome, ChargeRequest};
use crate::router::PaymentRouter;

/// Application service for recording and settling payments
pub struct PaymentService {
    router: Arc<PaymentRouter>,
    payments: Arc<dyn PaymentStore>,
    users: Arc<dyn UserDirectory>,
}

impl PaymentService {
    /// Creates a new payment service
    pub fn new(
        router: Arc<PaymentRouter>,
        payments: Arc<dyn PaymentStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            router,
            payments,
            users,
        }
    }

    /// Accepts a charge request, routes it to a provider, and persists
    /// the result as a payment row
    ///
    /// Returns the existing payment unchanged when the provider reference
    /// has been seen before for this user (client retry after a timeout
    /// that actually succeeded server-side).
    #[instrument(skip(self, claims, request), fields(user_id = %claims.user_id, method = %request.method))]
    pub async fn record_payment(
        &self,
        claims: &IdentityClaims,
        request: ChargeRequest,
        override_provider: Option<ProviderKind>,
    ) -> Result<Payment, PaymentError> {
        let raw_fields = request.raw_card_fields();
        if !raw_fields.is_empty() {
            warn!(fields = ?raw_fields, "rejected request carrying raw card data");
            return Err(PaymentError::RawCardData { fields: raw_fields });
        }
        if !request.amount.is_positive() {
            return Err(PaymentError::AmountNotPositive);
        }

        self.ensure_user(claims).await?;

        let (provider, outcome) = self.router.process_payment(&request, override_provider).await?;

        if let Some(reference) = &outcome.provider_transaction_id {
            if let Some(existing) = self
                .payments
                .find_by_provider_reference(request.user_id, reference)
                .await?
            {
                info!(payment_id = %existing.id, reference = %reference, "duplicate charge request, returning existing payment");
                return Ok(existing);
            }
        }

        let payment = Self::build_payment(&request, provider, outcome);

        match self.payments.insert(&payment).await {
            Ok(()) => {
                info!(payment_id = %payment.id, provider = %provider, status = %payment.status, "payment recorded");
                Ok(payment)
            }
            // The user row vanished between synthesis and insert; the
            // projection will catch up, the caller should retry.
            Err(PortError::Validation { field: Some(field), .. }) if field == "user_id" => {
                Err(PaymentError::AccountNotProvisioned)
            }
            // Lost an idempotency race with a concurrent retry: the row
            // that won is the payment of record.
            Err(PortError::Conflict { .. }) => {
                let reference = payment
                    .provider_transaction_id
                    .as_deref()
                    .unwrap_or_default();
                self.payments
                    .find_by_provider_reference(payment.user_id, reference)
                    .await?
                    .ok_or_else(|| {
                        PortError::internal("payment conflict but no existing row found").into()
                    })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Loads a payment by id
    pub async fn payment(&self, id: PaymentId) -> Result<Payment, PaymentError> {
        self.payments
            .find_by_id(id)
            .await?
            .ok_or(PaymentError::NotFound(id))
    }

    /// Re-verifies a pending payment with its provider and applies any
    /// settlement state change
    ///
    /// Terminal payments are returned as-is; a pending payment without a
    /// provider reference has nothing to verify yet.
    #[instrument(skip(self))]
    pub async fn verify_and_refresh(&self, id: PaymentId) -> Result<Payment, PaymentError> {
        let mut payment = self.payment(id).await?;
        if payment.status.is_terminal() {
            return Ok(payment);
        }
        let Some(reference) = payment.provider_transaction_id.clone() else {
            return Ok(payment);
        };

        let outcome = self
            .router
            .verify_payment(payment.provider, &reference)
            .await?;

        match outcome.status {
            PaymentStatus::Completed => {
                payment.complete();
                self.payments
                    .update_status(payment.id, PaymentStatus::Completed, payment.completed_at, None)
                    .await?;
                info!(payment_id = %payment.id, "payment settled");
            }
            PaymentStatus::Failed => {
                let reason = outcome
                    .display_text
                    .as_deref()
                    .unwrap_or("declined by provider");
                payment.fail(reason);
                self.payments
                    .update_status(payment.id, PaymentStatus::Failed, None, Some(reason))
                    .await?;
                info!(payment_id = %payment.id, "payment failed");
            }
            _ => {}
        }

        Ok(payment)
    }

    /// Administrative refund flow
    #[instrument(skip(self))]
    pub async fn refund(
        &self,
        id: PaymentId,
        amount: Money,
        reason: &str,
    ) -> Result<Payment, PaymentError> {
        let mut payment = self.payment(id).await?;
        let Some(reference) = payment.provider_transaction_id.clone() else {
            return Err(PortError::validation("payment has no provider reference to refund").into());
        };

        self.router
            .refund_payment(payment.provider, &reference, amount)
            .await?;

        payment.refund(reason)?;
        self.payments
            .update_status(payment.id, PaymentStatus::Refunded, None, payment.notes.as_deref())
            .await?;
        info!(payment_id = %payment.id, "payment refunded");
        Ok(payment)
    }

    /// Ensures the authenticated principal has a user row, synthesizing
    /// one from identity claims when replication has not caught up
    async fn ensure_user(&self, claims: &IdentityClaims) -> Result<User, PaymentError> {
        if let Some(user) = self.users.find_user(claims.user_id).await? {
            return Ok(user);
        }

        info!(user_id = %claims.user_id, "user projection missing, synthesizing from identity claims");
        match self.users.create_user(claims).await {
            Ok(user) => Ok(user),
            // Lost the creation race; whoever won wrote the same principal.
            Err(e) if e.is_conflict() => self
                .users
                .find_user(claims.user_id)
                .await?
                .ok_or(PaymentError::AccountNotProvisioned),
            Err(e) => Err(e.into()),
        }
    }

    fn build_payment(
        request: &ChargeRequest,
        provider: ProviderKind,
        outcome: ChargeOutcome,
    ) -> Payment {
        let mut metadata = request.metadata.clone();
        metadata.insert("email".to_string(), request.customer.email.clone());
        if let Some(name) = &request.customer.name {
            metadata.insert("name".to_string(), name.clone());
        }
        if let Some(phone) = &request.customer.phone {
            metadata.insert("phone".to_string(), phone.clone());
        }
        if let Some(bank) = &request.bank {
            metadata.insert("bank_name".to_string(), bank.bank_name.clone());
            metadata.insert("account_number".to_string(), bank.account_number.clone());
            if let Some(notes) = &bank.notes {
                metadata.insert("bank_notes".to_string(), notes.clone());
            }
        }
        metadata.extend(outcome.metadata.clone());

        let mut payment = Payment::new(request.user_id, request.amount, request.method, provider)
            .with_metadata(metadata);
        payment.provider_transaction_id = outcome.provider_transaction_id;
        payment.payment_url = outcome.payment_url;
        payment.display_text = outcome.display_text;
        payment.status = outcome.status;
        if payment.status == PaymentStatus::Completed {
            payment.completed_at = Some(Utc::now());
        }
        payment
    }
}

/// The settlement poller reads status through the verify-and-refresh
/// path, so each poll also applies any state change the provider reports.
#[async_trait]
impl PaymentStatusSource for PaymentService {
    async fn payment_status(&self, id: PaymentId) -> Result<PaymentStatus, PortError> {
        match self.verify_and_refresh(id).await {
            Ok(payment) => Ok(payment.status),
            Err(PaymentError::Store(e)) => Err(e),
            Err(other) => Err(PortError::internal(other.to_string())),
        }
    }
}
