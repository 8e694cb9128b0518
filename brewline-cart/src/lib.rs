pub mod delivery;
pub mod cart;

pub use delivery::{compute_fee, DeliveryFeePolicy, DeliverySettings};
pub use cart::{Cart, CartError, CartItem, CartSummary};
