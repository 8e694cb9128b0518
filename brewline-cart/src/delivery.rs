use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Delivery pricing configuration.
///
/// One active row is expected in storage. When it is missing, inactive or
/// unreadable the documented default (`50` flat fee, free from `2000`,
/// `100` express) applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySettings {
    pub base_delivery_fee: Decimal,
    pub free_delivery_threshold: Decimal,
    pub express_delivery_fee: Decimal,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            base_delivery_fee: Decimal::from(50),
            free_delivery_threshold: Decimal::from(2000),
            express_delivery_fee: Decimal::from(100),
            active: true,
        }
    }
}

/// Standard delivery fee for a subtotal.
///
/// Free delivery starts AT the threshold, not above it.
pub fn compute_fee(subtotal: Decimal, settings: Option<&DeliverySettings>) -> Decimal {
    let fallback;
    let settings = match settings {
        Some(s) => s,
        None => {
            fallback = DeliverySettings::default();
            &fallback
        }
    };

    if subtotal >= settings.free_delivery_threshold {
        Decimal::ZERO
    } else {
        settings.base_delivery_fee
    }
}

/// Fee policy bound to one settings snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryFeePolicy {
    settings: DeliverySettings,
}

impl DeliveryFeePolicy {
    pub fn new(settings: DeliverySettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DeliverySettings {
        &self.settings
    }

    pub fn fee_for(&self, subtotal: Decimal) -> Decimal {
        compute_fee(subtotal, Some(&self.settings))
    }

    /// Express surcharge, shown alongside the settings. Never part of the cart total.
    pub fn express_fee(&self) -> Decimal {
        self.settings.express_delivery_fee
    }

    /// How much more the customer has to add before delivery is free.
    pub fn remaining_for_free_delivery(&self, subtotal: Decimal) -> Decimal {
        self.settings
            .free_delivery_threshold
            .checked_sub(subtotal)
            .map_or(Decimal::ZERO, |remaining| remaining.max(Decimal::ZERO))
    }
}
