//! Marketplace API wire types.
//!
//! These mirror the JSON the REST API produces and accepts. Cart payloads
//! are deliberately absent: their shape varies, and the cart store
//! normalizes them itself (see [`crate::cart::Cart::from_payload`]).

use chrono::{DateTime, Utc};
use craftify_core::{ItemId, OrderId, SellerId, line_total};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

// =============================================================================
// Catalog
// =============================================================================

/// An item listed for sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Item ID.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Long description.
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price.
    pub price: Decimal,
    /// Units in stock.
    #[serde(default)]
    pub quantity: Option<u32>,
    /// Seller's user ID.
    #[serde(default)]
    pub seller: Option<SellerId>,
    /// Seller's username.
    #[serde(default)]
    pub seller_username: Option<String>,
    /// Category label.
    #[serde(default)]
    pub category: Option<String>,
    /// Image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// When the item was listed.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Fields a seller submits when listing or editing an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ItemDraft {
    /// A draft with the defaults a new listing starts from: one unit, no
    /// description or category.
    #[must_use]
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            name: name.into(),
            description: None,
            price,
            quantity: 1,
            category: None,
        }
    }

    /// Check the draft before it is sent.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Item name is required".to_string());
        }
        if self.price.is_sign_negative() {
            return Err("Price cannot be negative".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Orders
// =============================================================================

/// A line in a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Item ID, when the server includes it.
    #[serde(default)]
    pub item: Option<ItemId>,
    /// Item name at the time of purchase.
    pub name: String,
    /// Quantity purchased.
    pub quantity: u32,
    /// Unit price at the time of purchase.
    pub price: Decimal,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order ID.
    #[serde(alias = "orderId")]
    pub id: OrderId,
    /// When the order was placed.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Purchased lines.
    #[serde(default)]
    pub items: Vec<OrderLine>,
    /// Server-declared order total.
    #[serde(default)]
    pub total_amount: Option<Decimal>,
}

impl Order {
    /// Order total: the server-declared amount, or the sum of the lines when
    /// the server omitted it.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.total_amount.unwrap_or_else(|| {
            self.items
                .iter()
                .map(|line| line_total(line.price, line.quantity))
                .sum()
        })
    }
}

// =============================================================================
// Accounts
// =============================================================================

/// Login response body. Token endpoints disagree on the field name.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(alias = "token", alias = "access_token")]
    pub access: String,
}

/// Login request body.
#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    #[serde(serialize_with = "serialize_secret")]
    pub password: &'a SecretString,
}

/// Account registration form.
#[derive(Debug, Clone, Serialize)]
pub struct SignUp {
    /// Login name.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Chosen password.
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
    /// Phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// ISO country code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

impl SignUp {
    /// Names of required fields that are blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.username.trim().is_empty() {
            missing.push("username");
        }
        if self.email.trim().is_empty() {
            missing.push("email");
        }
        if self.password.expose_secret().is_empty() {
            missing.push("password");
        }
        missing
    }
}

/// A user's public profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// User ID.
    #[serde(default)]
    pub id: Option<i64>,
    /// Login name.
    #[serde(default)]
    pub username: String,
    /// Contact email.
    #[serde(default)]
    pub email: Option<String>,
    /// Free-form biography.
    #[serde(default)]
    pub bio: Option<String>,
    /// Personal website.
    #[serde(default)]
    pub website: Option<String>,
    /// ISO country code.
    #[serde(default)]
    pub country_code: Option<String>,
    /// Postal address.
    #[serde(default)]
    pub address: Option<String>,
    /// Phone number.
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// Partial profile update. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl ProfileUpdate {
    /// Whether the update would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.bio.is_none()
            && self.website.is_none()
            && self.country_code.is_none()
            && self.address.is_none()
            && self.phone_number.is_none()
    }
}

// =============================================================================
// Community
// =============================================================================

/// Users per page of [`UserPage`].
pub const USERS_PAGE_SIZE: u64 = 20;

/// A comment left on a user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: Option<i64>,
    /// Comment body. Older endpoints call it `comment`.
    #[serde(alias = "comment")]
    pub text: String,
    /// Author's username, absent for anonymous comments.
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One entry in the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

/// One page of the user directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPage {
    /// Users across all pages.
    pub count: u64,
    pub results: Vec<UserSummary>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}

impl UserPage {
    /// Number of pages at [`USERS_PAGE_SIZE`] users each.
    #[must_use]
    pub const fn total_pages(&self) -> u64 {
        self.count.div_ceil(USERS_PAGE_SIZE)
    }
}

/// Serialize a secret by exposing it. Only used for request bodies.
pub(crate) fn serialize_secret<S: Serializer>(
    secret: &SecretString,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
