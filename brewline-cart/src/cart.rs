use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::delivery::{DeliveryFeePolicy, DeliverySettings};

/// A product line in a franchise supply cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    /// `None` when the catalog price could not be resolved
    pub unit_price: Option<Decimal>,
    pub quantity: i32,
    #[serde(default = "empty_attributes")]
    pub attributes: serde_json::Value,
}

fn empty_attributes() -> serde_json::Value {
    serde_json::json!({})
}

impl CartItem {
    pub fn new(product_id: impl Into<String>, name: impl Into<String>, unit_price: Decimal, quantity: i32) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            unit_price: Some(unit_price),
            quantity,
            attributes: empty_attributes(),
        }
    }

    pub fn with_attributes(mut self, attributes: serde_json::Value) -> Self {
        self.attributes = attributes;
        self
    }

    /// Positive quantity, and a non-negative price in whole minor units whose
    /// line total fits in a `Decimal`.
    pub fn is_valid(&self) -> bool {
        self.quantity > 0
            && matches!(self.unit_price, Some(p) if p >= Decimal::ZERO && p.normalize().scale() <= PRICE_SCALE)
            && self.line_total().is_some()
    }

    /// Price times quantity. Unresolved prices and non-positive quantities count
    /// as zero; `None` on overflow.
    pub fn line_total(&self) -> Option<Decimal> {
        match self.unit_price {
            Some(price) if self.quantity > 0 => price.checked_mul(Decimal::from(self.quantity)),
            _ => Some(Decimal::ZERO),
        }
    }
}

/// Prices are charged in minor units (1/100), so finer prices cannot be paid exactly.
const PRICE_SCALE: u32 = 2;

/// Derived totals. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSummary {
    pub item_count: u32,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
}

impl CartSummary {
    /// Totals for a set of lines. `None` when a line total, the subtotal or the
    /// total overflows.
    pub fn compute(items: &[CartItem], policy: &DeliveryFeePolicy) -> Option<Self> {
        let subtotal = items
            .iter()
            .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.line_total()?))?;
        let delivery_fee = policy.fee_for(subtotal);

        Some(Self {
            item_count: item_count(items),
            subtotal,
            delivery_fee,
            total: subtotal.checked_add(delivery_fee)?,
        })
    }

    /// Stand-in for a cart whose money cannot be represented. Such a cart is never valid.
    fn unpriced(items: &[CartItem]) -> Self {
        Self {
            item_count: item_count(items),
            subtotal: Decimal::ZERO,
            delivery_fee: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }
}

fn item_count(items: &[CartItem]) -> u32 {
    items
        .iter()
        .fold(0u32, |acc, item| acc.saturating_add(item.quantity.max(0) as u32))
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CartError {
    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    #[error("Product not in cart: {0}")]
    ItemNotFound(String),
}

/// Cart owned by a single session.
///
/// Every mutation recomputes the summary before returning.
#[derive(Debug, Clone)]
pub struct Cart {
    items: Vec<CartItem>,
    policy: DeliveryFeePolicy,
    summary: CartSummary,
    priced: bool,
}

impl Cart {
    pub fn new(settings: DeliverySettings) -> Self {
        Self::restore(Vec::new(), settings)
    }

    /// Rebuild a cart from a stored snapshot as-is.
    ///
    /// Lines are not normalised, so a stale snapshot with a zero quantity or a
    /// missing price shows up through [`Cart::is_cart_valid`].
    pub fn restore(items: Vec<CartItem>, settings: DeliverySettings) -> Self {
        let mut cart = Self {
            items,
            policy: DeliveryFeePolicy::new(settings),
            summary: CartSummary::unpriced(&[]),
            priced: true,
        };
        cart.recompute();
        cart
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn summary(&self) -> &CartSummary {
        &self.summary
    }

    pub fn policy(&self) -> &DeliveryFeePolicy {
        &self.policy
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Gate for checkout entry points.
    pub fn is_cart_valid(&self) -> bool {
        self.priced && self.items.iter().all(CartItem::is_valid)
    }

    /// Add a line, merging with an existing line for the same product.
    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.quantity < 1 {
            return Err(CartError::InvalidQuantity(item.quantity));
        }

        match self.items.iter_mut().find(|i| i.product_id == item.product_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(item.quantity);
                existing.unit_price = item.unit_price.or(existing.unit_price);
                existing.name = item.name;
                existing.attributes = item.attributes;
            }
            None => self.items.push(item),
        }

        self.recompute();
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: &str) -> Option<CartItem> {
        let index = self.items.iter().position(|i| i.product_id == product_id)?;
        let removed = self.items.remove(index);
        self.recompute();
        Some(removed)
    }

    /// Set a line's quantity. Zero or less removes the line.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i32) -> Result<(), CartError> {
        if quantity < 1 {
            return self
                .remove_item(product_id)
                .map(|_| ())
                .ok_or_else(|| CartError::ItemNotFound(product_id.to_string()));
        }

        let item = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or_else(|| CartError::ItemNotFound(product_id.to_string()))?;
        item.quantity = quantity;

        self.recompute();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.recompute();
    }

    /// Swap in freshly loaded delivery settings.
    pub fn set_settings(&mut self, settings: DeliverySettings) {
        self.policy = DeliveryFeePolicy::new(settings);
        self.recompute();
    }

    fn recompute(&mut self) {
        match CartSummary::compute(&self.items, &self.policy) {
            Some(summary) => {
                self.summary = summary;
                self.priced = true;
            }
            None => {
                tracing::warn!("Cart total overflows; marking cart invalid");
                self.summary = CartSummary::unpriced(&self.items);
                self.priced = false;
            }
        }
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new(DeliverySettings::default())
    }
}
