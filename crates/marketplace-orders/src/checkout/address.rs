//! Address and guest contact snapshots.

use serde::{Deserialize, Serialize};

/// A postal address, copied onto the order at commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    /// Apartment, suite, landmark.
    #[serde(default)]
    pub address2: Option<String>,
    pub city: String,
    /// State/province name.
    #[serde(default)]
    pub province: Option<String>,
    pub country: String,
    /// Country code (e.g., "IN").
    pub country_code: String,
    /// Postal/PIN/ZIP code.
    pub zip: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Address {
    /// Create a new address.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        address1: impl Into<String>,
        city: impl Into<String>,
        country: impl Into<String>,
        country_code: impl Into<String>,
        zip: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            address1: address1.into(),
            address2: None,
            city: city.into(),
            province: None,
            country: country.into(),
            country_code: country_code.into(),
            zip: zip.into(),
            phone: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let required = [
            ("first_name", &self.first_name),
            ("address1", &self.address1),
            ("city", &self.city),
            ("country_code", &self.country_code),
            ("zip", &self.zip),
        ];
        required
            .iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(name, _)| *name)
            .collect()
    }

    /// Check if address is complete.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// Contact details supplied by a guest at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GuestContact {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl GuestContact {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
            phone: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Lower-cased, trimmed email if present and non-blank.
    pub fn normalized_email(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
    }

    /// Digits of the phone number (a leading `+` is kept) if any remain.
    pub fn normalized_phone(&self) -> Option<String> {
        let raw = self.phone.as_deref()?.trim();
        let mut out = String::with_capacity(raw.len());
        for (i, ch) in raw.chars().enumerate() {
            if ch.is_ascii_digit() || (i == 0 && ch == '+') {
                out.push(ch);
            }
        }
        if out.trim_start_matches('+').is_empty() {
            None
        } else {
            Some(out)
        }
    }

    pub fn has_contact(&self) -> bool {
        self.normalized_email().is_some() || self.normalized_phone().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_completeness() {
        let addr = Address::new("Asha", "Rao", "12 MG Road", "Bengaluru", "India", "IN", "560001");
        assert!(addr.is_complete());
        assert_eq!(addr.full_name(), "Asha Rao");

        let mut partial = addr.clone();
        partial.zip = "  ".to_string();
        partial.city.clear();
        assert_eq!(partial.missing_fields(), vec!["city", "zip"]);
    }

    #[test]
    fn test_guest_normalization() {
        let guest = GuestContact::new("Asha")
            .with_email("  Asha@Example.COM ")
            .with_phone("+91 98450-12345");
        assert_eq!(guest.normalized_email().as_deref(), Some("asha@example.com"));
        assert_eq!(guest.normalized_phone().as_deref(), Some("+919845012345"));
    }

    #[test]
    fn test_guest_without_contact() {
        let guest = GuestContact::new("Anon").with_email("   ").with_phone("--");
        assert!(!guest.has_contact());
    }
}
