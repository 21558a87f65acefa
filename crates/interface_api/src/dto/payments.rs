//! Payments DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use domain_payments::Payment;

/// Request body for creating a payment
///
/// The four `card_*` fields exist only so their presence can be detected
/// and rejected with a field-level error; card entry happens exclusively
/// on the gateway's hosted page.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub amount: Decimal,
    pub currency: Option<String>,
    #[validate(length(min = 1))]
    pub payment_method: String,
    pub provider: Option<String>,
    pub phone_number: Option<String>,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub bank_notes: Option<String>,
    /// Opaque booking details the client carries through the payment flow
    pub appointment_data: Option<serde_json::Value>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    // Rejected outright when present.
    pub card_number: Option<String>,
    pub card_expiry: Option<String>,
    pub card_name: Option<String>,
    pub card_pin: Option<String>,
}

impl CreatePaymentRequest {
    /// Returns the names of any raw card fields present in the request
    pub fn raw_card_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.card_number.is_some() {
            fields.push("card_number");
        }
        if self.card_expiry.is_some() {
            fields.push("card_expiry");
        }
        if self.card_name.is_some() {
            fields.push("card_name");
        }
        if self.card_pin.is_some() {
            fields.push("card_pin");
        }
        fields
    }
}

/// A payment as returned by the API
#[derive(Debug, Serialize)]
pub struct PaymentDto {
    pub id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub payment_method: String,
    pub provider: String,
    pub status: String,
    pub provider_transaction_id: Option<String>,
    pub appointment_id: Option<Uuid>,
    pub display_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Payment> for PaymentDto {
    fn from(payment: &Payment) -> Self {
        Self {
            id: *payment.id.as_uuid(),
            amount: payment.amount.amount(),
            currency: payment.amount.currency().code().to_string(),
            payment_method: payment.method.as_str().to_string(),
            provider: payment.provider.as_str().to_string(),
            status: payment.status.as_str().to_string(),
            provider_transaction_id: payment.provider_transaction_id.clone(),
            appointment_id: payment.appointment_id.map(|id| *id.as_uuid()),
            display_text: payment.display_text.clone(),
            created_at: payment.created_at,
            completed_at: payment.completed_at,
        }
    }
}

/// Response body for payment creation
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub payment: PaymentDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            payment_url: payment.payment_url.clone(),
            payment: PaymentDto::from(payment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request_json(extra: &str) -> CreatePaymentRequest {
        let body = format!(
            r#"{{"amount": "100.00", "payment_method": "mtn_momo"{}}}"#,
            extra
        );
        serde_json::from_str(&body).unwrap()
    }

    #[test]
    fn test_clean_request_has_no_card_fields() {
        let request = request_json("");
        assert!(request.raw_card_fields().is_empty());
        assert_eq!(request.amount, dec!(100.00));
    }

    #[test]
    fn test_card_fields_detected() {
        let request = request_json(
            r#", "card_number": "4111111111111111", "card_expiry": "12/27""#,
        );
        let fields = request.raw_card_fields();
        assert_eq!(fields, vec!["card_number", "card_expiry"]);
    }

    #[test]
    fn test_pin_alone_is_detected() {
        let request = request_json(r#", "card_pin": "1234""#);
        assert_eq!(request.raw_card_fields(), vec!["card_pin"]);
    }
}
