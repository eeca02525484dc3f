//! Normalized cart values.
//!
//! The server answers cart requests with either a cart object or a list
//! holding zero or one carts, and is not consistent about whether totals are
//! included. [`Cart::from_payload`] folds all of that into one shape.

use craftify_core::{CartLineId, ItemId, SellerId, line_total};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::api::ApiError;

/// The item referenced by a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Catalog item ID.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Decimal,
    /// Seller's user ID.
    #[serde(default, rename = "seller", alias = "seller_id")]
    pub seller_id: Option<SellerId>,
}

/// One entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    /// Cart-line ID used for removal. Distinct from the item ID.
    pub line_id: Option<CartLineId>,
    /// Referenced item.
    pub item: CartItem,
    /// Units of the item, at least 1.
    pub quantity: u32,
    /// Subtotal for this line.
    pub line_total: Decimal,
}

/// The signed-in user's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cart {
    /// Lines in server order.
    pub items: Vec<CartLine>,
    /// Cart total.
    pub total_price: Decimal,
}

#[derive(Deserialize)]
struct WireCart {
    #[serde(default, alias = "cart_items")]
    items: Vec<WireLine>,
    #[serde(default, alias = "totalPrice", alias = "total")]
    total_price: Option<Decimal>,
}

#[derive(Deserialize)]
struct WireLine {
    #[serde(default, alias = "line_id", alias = "lineId")]
    id: Option<CartLineId>,
    item: CartItem,
    quantity: u32,
    #[serde(default, alias = "lineTotal", alias = "subtotal")]
    line_total: Option<Decimal>,
}

impl Cart {
    /// Normalize a cart response.
    ///
    /// - an object is parsed as the cart
    /// - an empty list is an empty cart
    /// - a list takes its first cart (extra entries are logged and ignored)
    ///
    /// Server-declared totals are trusted. Where the server omits one it is
    /// computed from the lines.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::UnexpectedShape` for any other JSON value and
    /// `ApiError::Parse` when the object does not look like a cart.
    pub fn from_payload(payload: Value) -> Result<Self, ApiError> {
        let object = match payload {
            Value::Object(_) => payload,
            Value::Array(carts) => {
                if carts.len() > 1 {
                    warn!(count = carts.len(), "Cart response held several carts, using the first");
                }
                match carts.into_iter().next() {
                    Some(first @ Value::Object(_)) => first,
                    Some(other) => {
                        return Err(ApiError::UnexpectedShape(format!(
                            "cart list entry is {}",
                            shape_name(&other)
                        )));
                    }
                    None => return Ok(Self::default()),
                }
            }
            other => {
                return Err(ApiError::UnexpectedShape(format!(
                    "cart is {}",
                    shape_name(&other)
                )));
            }
        };

        let wire: WireCart = serde_json::from_value(object)?;
        Ok(Self::from_wire(wire))
    }

    fn from_wire(wire: WireCart) -> Self {
        let items: Vec<CartLine> = wire.items.into_iter().map(CartLine::from_wire).collect();
        let computed: Decimal = items.iter().map(|line| line.line_total).sum();

        let total_price = match wire.total_price {
            Some(declared) => {
                if declared != computed {
                    warn!(
                        declared = %declared,
                        computed = %computed,
                        "Server cart total disagrees with line totals, keeping server value"
                    );
                }
                declared
            }
            None => computed,
        };

        Self { items, total_price }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    /// Find the line holding a catalog item.
    #[must_use]
    pub fn line_for_item(&self, item_id: ItemId) -> Option<&CartLine> {
        self.items.iter().find(|line| line.item.id == item_id)
    }
}

impl CartLine {
    fn from_wire(wire: WireLine) -> Self {
        let computed = line_total(wire.item.price, wire.quantity);
        let line_total = match wire.line_total {
            Some(declared) => {
                if declared != computed {
                    warn!(
                        item_id = %wire.item.id,
                        declared = %declared,
                        computed = %computed,
                        "Server line total disagrees with quantity x price, keeping server value"
                    );
                }
                declared
            }
            None => computed,
        };

        Self {
            line_id: wire.id,
            item: wire.item,
            quantity: wire.quantity,
            line_total,
        }
    }
}

const fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
