//! Idempotency scopes and keys.
//!
//! A checkout is identified by `(scope, key)`. The scope is the customer id,
//! or for guests a fingerprint of their normalized email, else normalized
//! phone, else a shared anonymous marker. The order table enforces the pair
//! as unique.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::checkout::GuestContact;
use crate::error::OrderError;
use crate::ids::CustomerId;

const MAX_KEY_LENGTH: usize = 255;

/// Who is checking out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Buyer {
    Customer { id: CustomerId },
    Guest { contact: GuestContact },
}

impl Buyer {
    pub fn customer(id: impl Into<CustomerId>) -> Self {
        Buyer::Customer { id: id.into() }
    }

    pub fn guest(contact: GuestContact) -> Self {
        Buyer::Guest { contact }
    }

    pub fn customer_id(&self) -> Option<&CustomerId> {
        match self {
            Buyer::Customer { id } => Some(id),
            Buyer::Guest { .. } => None,
        }
    }

    pub fn guest_contact(&self) -> Option<&GuestContact> {
        match self {
            Buyer::Customer { .. } => None,
            Buyer::Guest { contact } => Some(contact),
        }
    }

    /// Identity boundary for idempotency keys.
    pub fn scope(&self) -> IdempotencyScope {
        match self {
            Buyer::Customer { id } => IdempotencyScope(format!("customer:{}", id)),
            Buyer::Guest { contact } => {
                if let Some(email) = contact.normalized_email() {
                    IdempotencyScope(format!("guest:email:{}", email))
                } else if let Some(phone) = contact.normalized_phone() {
                    IdempotencyScope(format!("guest:phone:{}", phone))
                } else {
                    IdempotencyScope("guest:anonymous".to_string())
                }
            }
        }
    }
}

/// Identity boundary within which a key must be unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyScope(String);

impl IdempotencyScope {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-supplied idempotency token, trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Validate a raw key. Blank input means "no key".
    pub fn parse(raw: Option<&str>) -> Result<Option<Self>, OrderError> {
        let Some(raw) = raw else {
            return Ok(None);
        };
        let key = raw.trim();
        if key.is_empty() {
            return Ok(None);
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(OrderError::Validation(format!(
                "idempotency key must be {} characters or fewer",
                MAX_KEY_LENGTH
            )));
        }
        if key.chars().any(|c| c.is_control()) {
            return Err(OrderError::Validation(
                "idempotency key must not contain control characters".to_string(),
            ));
        }
        Ok(Some(Self(key.to_string())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
