pub mod models;
pub mod broker;
pub mod gateway;
pub mod signature;
pub mod client;
pub mod checkout;

pub use models::{CheckoutState, CheckoutTicket, Notice, NoticeLevel};
pub use broker::PaymentOrderBroker;
pub use gateway::RazorpayGateway;
pub use client::{ApiClient, ConfirmOrderRequest};
pub use checkout::{CheckoutOrchestrator, OrderPersistence, RepositoryPersistence};
