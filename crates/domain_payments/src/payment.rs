//! Payment records
//!
//! This module defines the durable Payment entity and its lifecycle. A
//! payment is created when a provider accepts a charge, settles through
//! provider verification, and may later be linked to exactly one
//! appointment. Payments are never hard-deleted; a refund is a status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use core_kernel::{AppointmentId, CoreError, Money, PaymentId, UserId};

/// Payment method accepted at booking time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card via hosted checkout page
    Card,
    /// MTN mobile money
    MtnMomo,
    /// Vodafone Cash
    VodafoneCash,
    /// AirtelTigo Money
    AirtelTigoMoney,
    /// Direct bank transfer
    BankTransfer,
    /// GhQR code payment
    GhQr,
    /// Digital wallet
    Wallet,
    /// Cash on arrival
    CashOnDelivery,
}

impl PaymentMethod {
    /// Returns true for the mobile-money variants eligible for the
    /// push-charge routing override
    pub fn is_mobile_money(&self) -> bool {
        matches!(
            self,
            PaymentMethod::MtnMomo | PaymentMethod::VodafoneCash | PaymentMethod::AirtelTigoMoney
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::MtnMomo => "mtn_momo",
            PaymentMethod::VodafoneCash => "vodafone_cash",
            PaymentMethod::AirtelTigoMoney => "airtel_tigo_money",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::GhQr => "gh_qr",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(PaymentMethod::Card),
            "mtn_momo" => Ok(PaymentMethod::MtnMomo),
            "vodafone_cash" => Ok(PaymentMethod::VodafoneCash),
            "airtel_tigo_money" => Ok(PaymentMethod::AirtelTigoMoney),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "gh_qr" => Ok(PaymentMethod::GhQr),
            "wallet" => Ok(PaymentMethod::Wallet),
            "cash_on_delivery" => Ok(PaymentMethod::CashOnDelivery),
            other => Err(CoreError::validation(format!(
                "unknown payment method: {}",
                other
            ))),
        }
    }
}

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting settlement on the provider side
    Pending,
    /// Settled successfully
    Completed,
    /// Settlement failed
    Failed,
    /// Reversed by the administrative refund flow
    Refunded,
}

impl PaymentStatus {
    /// Returns true once the provider has reported an irreversible outcome
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(CoreError::validation(format!(
                "unknown payment status: {}",
                other
            ))),
        }
    }
}

/// The provider adapter a payment was processed through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    CardGateway,
    AltGateway,
    LocalRails,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::CardGateway => "card_gateway",
            ProviderKind::AltGateway => "alt_gateway",
            ProviderKind::LocalRails => "local_rails",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card_gateway" => Ok(ProviderKind::CardGateway),
            "alt_gateway" => Ok(ProviderKind::AltGateway),
            "local_rails" => Ok(ProviderKind::LocalRails),
            other => Err(CoreError::validation(format!(
                "unknown provider: {}",
                other
            ))),
        }
    }
}

/// A durable payment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// Paying user
    pub user_id: UserId,
    /// Amount charged
    pub amount: Money,
    /// Payment method
    pub method: PaymentMethod,
    /// Provider the charge was routed to
    pub provider: ProviderKind,
    /// Status
    pub status: PaymentStatus,
    /// Provider transaction reference; the idempotency key once set
    pub provider_transaction_id: Option<String>,
    /// Appointment funded by this payment, set only after booking succeeds
    pub appointment_id: Option<AppointmentId>,
    /// Hosted checkout URL, when the provider uses a redirect flow
    pub payment_url: Option<String>,
    /// Human-readable instruction from the provider (push charges)
    pub display_text: Option<String>,
    /// Opaque key-value bag: email, name, phone, bank details
    pub metadata: HashMap<String, String>,
    /// Notes (failure reasons, refund reasons)
    pub notes: Option<String>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// When status changed to completed
    pub completed_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Creates a new pending payment
    pub fn new(user_id: UserId, amount: Money, method: PaymentMethod, provider: ProviderKind) -> Self {
        Self {
            id: PaymentId::new_v7(),
            user_id,
            amount,
            method,
            provider,
            status: PaymentStatus::Pending,
            provider_transaction_id: None,
            appointment_id: None,
            payment_url: None,
            display_text: None,
            metadata: HashMap::new(),
            notes: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Sets the provider transaction reference
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.provider_transaction_id = Some(reference.into());
        self
    }

    /// Attaches metadata entries
    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Marks the payment as completed
    pub fn complete(&mut self) {
        self.status = PaymentStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Marks the payment as failed
    pub fn fail(&mut self, reason: &str) {
        self.status = PaymentStatus::Failed;
        self.notes = Some(reason.to_string());
    }

    /// Reverses the payment through the administrative refund flow
    ///
    /// Only a completed payment can be refunded.
    pub fn refund(&mut self, reason: &str) -> Result<(), CoreError> {
        if self.status != PaymentStatus::Completed {
            return Err(CoreError::invalid_state(format!(
                "cannot refund payment in status {}",
                self.status
            )));
        }
        self.status = PaymentStatus::Refunded;
        self.notes = Some(format!("Refunded: {}", reason));
        Ok(())
    }

    /// Links the payment to the appointment it funds
    ///
    /// The payment must be completed and not already linked; once set the
    /// link is immutable outside the administrative refund flow.
    pub fn link_appointment(&mut self, appointment_id: AppointmentId) -> Result<(), CoreError> {
        if self.status != PaymentStatus::Completed {
            return Err(CoreError::invalid_state(format!(
                "cannot link payment in status {}",
                self.status
            )));
        }
        if let Some(existing) = self.appointment_id {
            return Err(CoreError::invalid_state(format!(
                "payment already linked to appointment {}",
                existing
            )));
        }
        self.appointment_id = Some(appointment_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn payment() -> Payment {
        Payment::new(
            UserId::new(),
            Money::new(dec!(100.00), Currency::GHS),
            PaymentMethod::MtnMomo,
            ProviderKind::LocalRails,
        )
    }

    #[test]
    fn test_new_payment_is_pending() {
        let p = payment();
        assert_eq!(p.status, PaymentStatus::Pending);
        assert!(p.appointment_id.is_none());
        assert!(p.completed_at.is_none());
    }

    #[test]
    fn test_complete_sets_timestamp() {
        let mut p = payment();
        p.complete();
        assert_eq!(p.status, PaymentStatus::Completed);
        assert!(p.completed_at.is_some());
    }

    #[test]
    fn test_link_requires_completed() {
        let mut p = payment();
        let err = p.link_appointment(AppointmentId::new()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidStateTransition(_)));
    }

    #[test]
    fn test_link_is_immutable_once_set() {
        let mut p = payment();
        p.complete();
        p.link_appointment(AppointmentId::new()).unwrap();

        let err = p.link_appointment(AppointmentId::new()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidStateTransition(_)));
    }

    #[test]
    fn test_refund_requires_completed() {
        let mut p = payment();
        assert!(p.refund("customer request").is_err());

        p.complete();
        p.refund("customer request").unwrap();
        assert_eq!(p.status, PaymentStatus::Refunded);
        assert!(p.notes.as_deref().unwrap().contains("customer request"));
    }

    #[test]
    fn test_method_roundtrip() {
        for method in [
            PaymentMethod::Card,
            PaymentMethod::MtnMomo,
            PaymentMethod::VodafoneCash,
            PaymentMethod::AirtelTigoMoney,
            PaymentMethod::BankTransfer,
            PaymentMethod::GhQr,
            PaymentMethod::Wallet,
            PaymentMethod::CashOnDelivery,
        ] {
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), method);
        }
    }

    #[test]
    fn test_mobile_money_classification() {
        assert!(PaymentMethod::MtnMomo.is_mobile_money());
        assert!(PaymentMethod::VodafoneCash.is_mobile_money());
        assert!(PaymentMethod::AirtelTigoMoney.is_mobile_money());
        assert!(!PaymentMethod::Card.is_mobile_money());
        assert!(!PaymentMethod::BankTransfer.is_mobile_money());
    }
}
