//! Billing Form Model
//!
//! Holds the values a visitor types into the billing form. Fields are plain
//! text; the only check is the required-field test run by the flow at submit
//! time.

use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, Result};

/// Billing form fields, named as the form surface names them
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BillingField {
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "cardNumber")]
    CardNumber,
    #[serde(rename = "expiryDate")]
    ExpiryDate,
    #[serde(rename = "cvv")]
    Cvv,
    #[serde(rename = "name")]
    CardholderName,
    #[serde(rename = "country")]
    Country,
    #[serde(rename = "zipCode")]
    ZipCode,
}

impl BillingField {
    /// All fields in form order
    pub const ALL: [Self; 7] = [
        Self::Email,
        Self::CardNumber,
        Self::ExpiryDate,
        Self::Cvv,
        Self::CardholderName,
        Self::Country,
        Self::ZipCode,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::CardNumber => "cardNumber",
            Self::ExpiryDate => "expiryDate",
            Self::Cvv => "cvv",
            Self::CardholderName => "name",
            Self::Country => "country",
            Self::ZipCode => "zipCode",
        }
    }
}

impl std::str::FromStr for BillingField {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| CheckoutError::UnknownField(s.to_string()))
    }
}

impl std::fmt::Display for BillingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Countries offered by the billing form's country picker (code, display name)
pub const SUPPORTED_COUNTRIES: &[(&str, &str)] = &[
    ("US", "United States"),
    ("CA", "Canada"),
    ("UK", "United Kingdom"),
    ("DE", "Germany"),
    ("FR", "France"),
    ("AE", "United Arab Emirates"),
    ("SA", "Saudi Arabia"),
];

/// Mutable billing details for one checkout session
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingForm {
    pub email: String,
    pub card_number: String,
    pub expiry_date: String,
    pub cvv: String,
    #[serde(rename = "name")]
    pub cardholder_name: String,
    pub country: String,
    pub zip_code: String,
}

impl BillingForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a single field
    pub fn set(&mut self, field: BillingField, value: impl Into<String>) {
        *self.slot_mut(field) = value.into();
    }

    /// Builder-style `set`
    #[must_use]
    pub fn with(mut self, field: BillingField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: BillingField) -> &str {
        match field {
            BillingField::Email => &self.email,
            BillingField::CardNumber => &self.card_number,
            BillingField::ExpiryDate => &self.expiry_date,
            BillingField::Cvv => &self.cvv,
            BillingField::CardholderName => &self.cardholder_name,
            BillingField::Country => &self.country,
            BillingField::ZipCode => &self.zip_code,
        }
    }

    fn slot_mut(&mut self, field: BillingField) -> &mut String {
        match field {
            BillingField::Email => &mut self.email,
            BillingField::CardNumber => &mut self.card_number,
            BillingField::ExpiryDate => &mut self.expiry_date,
            BillingField::Cvv => &mut self.cvv,
            BillingField::CardholderName => &mut self.cardholder_name,
            BillingField::Country => &mut self.country,
            BillingField::ZipCode => &mut self.zip_code,
        }
    }

    /// Clear every field
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        BillingField::ALL.iter().all(|f| self.get(*f).is_empty())
    }

    /// Required fields that are empty; any typed value, spaces included, counts
    pub fn missing_fields(&self) -> Vec<BillingField> {
        BillingField::ALL
            .into_iter()
            .filter(|field| self.get(*field).is_empty())
            .collect()
    }

    /// Last four digits of the card, for receipts and logs
    pub fn card_last4(&self) -> String {
        let digits: Vec<char> = self.card_number.chars().filter(char::is_ascii_digit).collect();
        digits[digits.len().saturating_sub(4)..].iter().collect()
    }
}

// Card number and CVV never reach logs.
impl std::fmt::Debug for BillingForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let masked = format!("****{}", self.card_last4());
        f.debug_struct("BillingForm")
            .field("email", &self.email)
            .field("card_number", &masked)
            .field("expiry_date", &self.expiry_date)
            .field("cvv", &"***")
            .field("cardholder_name", &self.cardholder_name)
            .field("country", &self.country)
            .field("zip_code", &self.zip_code)
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn filled_form() -> BillingForm {
    BillingForm::new()
        .with(BillingField::Email, "ada@example.com")
        .with(BillingField::CardNumber, "4242 4242 4242 4242")
        .with(BillingField::ExpiryDate, "12/29")
        .with(BillingField::Cvv, "123")
        .with(BillingField::CardholderName, "Ada Lovelace")
        .with(BillingField::Country, "UK")
        .with(BillingField::ZipCode, "12345")
}
