//! Authentication and authorization

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use core_kernel::UserId;
use domain_payments::IdentityClaims;

/// JWT claims
///
/// Carries the identity attributes the payment layer needs to synthesize
/// a missing user projection (email, name, phone, verification flag).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User's email address
    pub email: String,
    /// User's display name
    #[serde(default)]
    pub name: Option<String>,
    /// User's phone number
    #[serde(default)]
    pub phone: Option<String>,
    /// Whether the identity provider verified the email
    #[serde(default)]
    pub email_verified: bool,
    /// User's roles
    pub roles: Vec<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid subject claim")]
    InvalidSubject,
    #[error("Missing permission: {0}")]
    MissingPermission(String),
}

impl Claims {
    /// Extracts the identity claims used for user-row synthesis
    pub fn identity_claims(&self) -> Result<IdentityClaims, AuthError> {
        let uuid = Uuid::parse_str(&self.sub).map_err(|_| AuthError::InvalidSubject)?;
        Ok(IdentityClaims {
            user_id: UserId::from(uuid),
            email: self.email.clone(),
            full_name: self.name.clone(),
            phone: self.phone.clone(),
            email_verified: self.email_verified,
        })
    }

    /// Returns the authenticated user id
    pub fn user_id(&self) -> Result<UserId, AuthError> {
        let uuid = Uuid::parse_str(&self.sub).map_err(|_| AuthError::InvalidSubject)?;
        Ok(UserId::from(uuid))
    }
}

/// Creates a new JWT token
///
/// # Arguments
///
/// * `user_id` - User identifier
/// * `email` - User's email address
/// * `roles` - User's roles
/// * `secret` - JWT secret key
/// * `expiration_secs` - Token validity in seconds
pub fn create_token(
    user_id: &str,
    email: &str,
    roles: Vec<String>,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        name: None,
        phone: None,
        email_verified: false,
        roles,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
///
/// # Arguments
///
/// * `token` - The JWT token to validate
/// * `secret` - JWT secret key
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        if e.to_string().contains("ExpiredSignature") {
            AuthError::TokenExpired
        } else {
            AuthError::InvalidToken
        }
    })?;

    Ok(token_data.claims)
}

/// Checks if user has required role
pub fn has_role(claims: &Claims, required_role: &str) -> bool {
    claims.roles.iter().any(|r| r == required_role || r == "admin")
}

/// Permission definitions
pub mod permissions {
    pub const PAYMENT_READ: &str = "payment:read";
    pub const PAYMENT_WRITE: &str = "payment:write";
    pub const PAYMENT_REFUND: &str = "payment:refund";
    pub const APPOINTMENT_READ: &str = "appointment:read";
    pub const APPOINTMENT_WRITE: &str = "appointment:write";
    pub const APPOINTMENT_ADMIN: &str = "appointment:admin";
}
