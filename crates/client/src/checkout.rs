//! Checkout request payload.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::api::types::serialize_secret;

/// A postal address used for billing or shipping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Address {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

impl Address {
    fn missing_fields(&self, prefix: &str, missing: &mut Vec<String>) {
        let fields = [
            ("name", &self.name),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("zip", &self.zip),
            ("country", &self.country),
        ];
        missing.extend(
            fields
                .iter()
                .filter(|(_, value)| value.trim().is_empty())
                .map(|(field, _)| format!("{prefix}.{field}")),
        );
    }
}

/// Payment card details. Card number and CVC never appear in `Debug` output.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCard {
    #[serde(serialize_with = "serialize_secret")]
    pub card_number: SecretString,
    pub card_expiry: String,
    #[serde(rename = "cardCVC", serialize_with = "serialize_secret")]
    pub card_cvc: SecretString,
}

impl fmt::Debug for PaymentCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentCard")
            .field("card_number", &"[REDACTED]")
            .field("card_expiry", &self.card_expiry)
            .field("card_cvc", &"[REDACTED]")
            .finish()
    }
}

/// Body of `POST checkout/`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    pub billing: Address,
    pub shipping: Address,
    pub payment: PaymentCard,
}

impl CheckoutRequest {
    /// Names of required fields that are blank, as `section.field`.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        self.billing.missing_fields("billing", &mut missing);
        self.shipping.missing_fields("shipping", &mut missing);

        if self.payment.card_number.expose_secret().trim().is_empty() {
            missing.push("payment.cardNumber".to_string());
        }
        if self.payment.card_expiry.trim().is_empty() {
            missing.push("payment.cardExpiry".to_string());
        }
        if self.payment.card_cvc.expose_secret().trim().is_empty() {
            missing.push("payment.cardCVC".to_string());
        }
        missing
    }

    /// Check that every required field is filled in.
    ///
    /// # Errors
    ///
    /// Returns a message naming the blank fields.
    pub fn validate(&self) -> Result<(), String> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!(
                "Please fill in all required fields: {}",
                missing.join(", ")
            ))
        }
    }
}
