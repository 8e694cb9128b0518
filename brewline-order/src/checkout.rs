use std::sync::Arc;

use async_trait::async_trait;
use brewline_cart::{Cart, CartItem, CartSummary};
use brewline_core::order::NewOrder;
use brewline_core::payment::{
    to_minor_units, PaymentOrder, PaymentOrderHandle, PaymentOrderSource, PaymentOrderStatus, PaymentSuccess,
};
use brewline_core::repository::OrderRepository;
use brewline_core::session::SessionContext;
use brewline_core::CheckoutError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{CheckoutState, CheckoutTicket, Notice};

/// Where a paid order gets written
#[async_trait]
pub trait OrderPersistence: Send + Sync {
    async fn persist(
        &self,
        order: &NewOrder,
        proof: &PaymentSuccess,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>>;
}

/// Writes straight into an [`OrderRepository`]
pub struct RepositoryPersistence {
    repo: Arc<dyn OrderRepository>,
}

impl RepositoryPersistence {
    pub fn new(repo: Arc<dyn OrderRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl OrderPersistence for RepositoryPersistence {
    async fn persist(
        &self,
        order: &NewOrder,
        _proof: &PaymentSuccess,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.repo.create_order(order).await?.id)
    }
}

/// A paid order that still has to be saved
#[derive(Debug, Clone)]
struct PendingConfirmation {
    order: NewOrder,
    proof: PaymentSuccess,
}

/// Drives one cart through payment.
///
/// `Idle -> AwaitingPaymentOrder -> AwaitingUserPayment -> Confirming -> Completed | Failed`
///
/// Network results arrive through `on_*` callbacks carrying the
/// [`CheckoutTicket`] handed out by [`CheckoutOrchestrator::begin`]. A callback
/// whose ticket is not the current attempt, or that arrives in the wrong
/// state, is ignored. The cart is only ever cleared after the order is saved.
pub struct CheckoutOrchestrator {
    state: CheckoutState,
    attempt: u64,
    currency: String,
    session: Option<SessionContext>,
    snapshot: Option<(Vec<CartItem>, CartSummary)>,
    handle: Option<PaymentOrderHandle>,
    payment_order: Option<PaymentOrder>,
    pending: Option<PendingConfirmation>,
    last_error: Option<CheckoutError>,
    notices: Vec<Notice>,
}

impl CheckoutOrchestrator {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            state: CheckoutState::Idle,
            attempt: 0,
            currency: currency.into(),
            session: None,
            snapshot: None,
            handle: None,
            payment_order: None,
            pending: None,
            last_error: None,
            notices: Vec::new(),
        }
    }

    pub fn with_session(mut self, session: SessionContext) -> Self {
        self.session = Some(session);
        self
    }

    pub fn state(&self) -> CheckoutState {
        self.state
    }

    pub fn payment_order(&self) -> Option<&PaymentOrder> {
        self.payment_order.as_ref()
    }

    pub fn last_error(&self) -> Option<&CheckoutError> {
        self.last_error.as_ref()
    }

    /// Ticket of the attempt in flight, if any.
    pub fn current_ticket(&self) -> Option<CheckoutTicket> {
        match self.state {
            CheckoutState::AwaitingPaymentOrder
            | CheckoutState::AwaitingUserPayment
            | CheckoutState::Confirming => self.snapshot.as_ref().map(|(_, summary)| CheckoutTicket {
                attempt: self.attempt,
                amount: summary.total,
            }),
            _ => None,
        }
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Start a checkout for the cart's current total.
    ///
    /// Refuses without changing state when the cart is empty or invalid, when
    /// the user is already in the payment widget, or when a paid order is
    /// still waiting to be saved.
    pub fn begin(&mut self, cart: &Cart) -> Result<CheckoutTicket, CheckoutError> {
        if let Some(pending) = &self.pending {
            let err = CheckoutError::PersistenceError {
                payment_id: pending.proof.payment_id.clone(),
                message: "a paid order is still waiting to be saved".to_string(),
            };
            return Err(self.refuse(err));
        }
        if !self.state.can_begin() {
            return Err(self.refuse(CheckoutError::Busy));
        }
        if cart.is_empty() {
            return Err(self.refuse(CheckoutError::EmptyCart));
        }
        if !cart.is_cart_valid() {
            return Err(self.refuse(CheckoutError::InvalidCart));
        }

        self.attempt += 1;
        let summary = *cart.summary();
        self.snapshot = Some((cart.items().to_vec(), summary));
        self.handle = None;
        self.payment_order = None;
        self.last_error = None;
        self.state = CheckoutState::AwaitingPaymentOrder;

        info!("Checkout attempt {} started for {} {}", self.attempt, summary.total, self.currency);
        Ok(CheckoutTicket {
            attempt: self.attempt,
            amount: summary.total,
        })
    }

    /// Broker answered. Returns the handle for the widget, or `None` if the
    /// answer belongs to an abandoned attempt.
    pub fn on_payment_order(
        &mut self,
        ticket: CheckoutTicket,
        result: Result<PaymentOrderHandle, CheckoutError>,
    ) -> Result<Option<PaymentOrderHandle>, CheckoutError> {
        if !self.is_current(ticket, CheckoutState::AwaitingPaymentOrder) {
            return Ok(None);
        }

        let handle = result.map_err(|e| self.fail(e))?;

        if to_minor_units(ticket.amount).ok() != Some(handle.amount_minor_units) {
            let err = CheckoutError::gateway(
                None,
                format!(
                    "payment order amount {} does not match cart total {}",
                    handle.amount_minor_units, ticket.amount
                ),
            );
            return Err(self.fail(err));
        }

        let mut order = PaymentOrder::from_handle(&handle);
        if let Err(e) = order.transition(PaymentOrderStatus::Attempted) {
            return Err(self.fail(CheckoutError::gateway(None, e.to_string())));
        }

        self.payment_order = Some(order);
        self.handle = Some(handle.clone());
        self.state = CheckoutState::AwaitingUserPayment;
        Ok(Some(handle))
    }

    /// `begin` plus the broker round trip, for callers that own the flow end to end.
    pub async fn request_payment_order(
        &mut self,
        cart: &Cart,
        source: &dyn PaymentOrderSource,
    ) -> Result<PaymentOrderHandle, CheckoutError> {
        let ticket = self.begin(cart)?;
        let result = source.request_payment_order(ticket.amount).await;
        self.on_payment_order(ticket, result)?.ok_or(CheckoutError::Busy)
    }

    /// User closed the widget. No order is saved and no new gateway order is made.
    pub fn on_payment_dismissed(&mut self, ticket: CheckoutTicket) -> bool {
        if !self.is_current(ticket, CheckoutState::AwaitingUserPayment) {
            return false;
        }

        info!("Checkout attempt {} cancelled by user", self.attempt);
        self.state = CheckoutState::Failed;
        self.notices.push(Notice::info(CheckoutError::Cancelled.user_message()));
        self.last_error = Some(CheckoutError::Cancelled);
        true
    }

    /// Widget reported a declined or failed payment.
    pub fn on_payment_failed(&mut self, ticket: CheckoutTicket, reason: &str) -> bool {
        if !self.is_current(ticket, CheckoutState::AwaitingUserPayment) {
            return false;
        }

        if let Some(order) = self.payment_order.as_mut() {
            if let Err(e) = order.transition(PaymentOrderStatus::Failed) {
                warn!("Ignoring payment failure for {}: {}", order.gateway_order_id, e);
            }
        }
        self.fail(CheckoutError::gateway(None, reason));
        true
    }

    /// Widget reported a successful payment; save the order.
    ///
    /// Returns the saved order id, or `None` for a stale callback. On a save
    /// failure the cart is left untouched and the paid order is kept for
    /// [`CheckoutOrchestrator::retry_confirmation`].
    pub async fn on_payment_success(
        &mut self,
        ticket: CheckoutTicket,
        success: PaymentSuccess,
        cart: &mut Cart,
        persistence: &dyn OrderPersistence,
    ) -> Result<Option<Uuid>, CheckoutError> {
        if !self.is_current(ticket, CheckoutState::AwaitingUserPayment) {
            return Ok(None);
        }
        let expected_order = self.handle.as_ref().map(|h| h.gateway_order_id.as_str());
        if expected_order != Some(success.gateway_order_id.as_str()) {
            warn!(
                "Payment success for unexpected gateway order {}, ignoring",
                success.gateway_order_id
            );
            return Ok(None);
        }

        self.state = CheckoutState::Confirming;
        if let Some(order) = self.payment_order.as_mut() {
            if let Err(e) = order.transition(PaymentOrderStatus::Paid) {
                warn!("Payment order status not updated: {}", e);
            }
        }

        let Some((items, summary)) = self.snapshot.clone() else {
            let err = CheckoutError::PersistenceError {
                payment_id: success.payment_id.clone(),
                message: "checkout lost its cart snapshot".to_string(),
            };
            return Err(self.fail(err));
        };

        let mut order = NewOrder::from_cart(
            &items,
            &summary,
            &self.currency,
            &success.gateway_order_id,
            &success.payment_id,
        );
        if let Some(session) = &self.session {
            order = order.placed_by(&session.user_id, session.franchise_id);
        }

        self.pending = Some(PendingConfirmation { order, proof: success });
        self.confirm(cart, persistence).await.map(Some)
    }

    /// Try saving a paid order again after a `PersistenceError`.
    pub async fn retry_confirmation(
        &mut self,
        cart: &mut Cart,
        persistence: &dyn OrderPersistence,
    ) -> Result<Uuid, CheckoutError> {
        if self.pending.is_none() {
            return Err(self.refuse(CheckoutError::Busy));
        }
        self.state = CheckoutState::Confirming;
        self.confirm(cart, persistence).await
    }

    /// Back to `Idle`. Any response still in flight becomes stale.
    pub fn reset(&mut self) -> Result<(), CheckoutError> {
        if self.state == CheckoutState::Confirming {
            return Err(CheckoutError::Busy);
        }
        if let Some(pending) = self.pending.take() {
            error!(
                "Abandoning unsaved paid order (gateway order {}, payment {})",
                pending.order.gateway_order_id, pending.proof.payment_id
            );
        }

        self.attempt += 1;
        self.state = CheckoutState::Idle;
        self.snapshot = None;
        self.handle = None;
        self.payment_order = None;
        self.last_error = None;
        Ok(())
    }

    async fn confirm(&mut self, cart: &mut Cart, persistence: &dyn OrderPersistence) -> Result<Uuid, CheckoutError> {
        let Some(pending) = self.pending.clone() else {
            return Err(self.fail(CheckoutError::Busy));
        };

        match persistence.persist(&pending.order, &pending.proof).await {
            Ok(order_id) => {
                info!(
                    "Order {} saved for payment {} ({} {})",
                    order_id, pending.proof.payment_id, pending.order.total, pending.order.currency
                );
                self.pending = None;
                self.snapshot = None;
                self.last_error = None;
                self.state = CheckoutState::Completed;
                cart.clear();
                self.notices.push(Notice::success("Order placed. Thank you!"));
                Ok(order_id)
            }
            Err(e) => {
                error!(
                    "Order could not be saved after payment {} on gateway order {}: {}",
                    pending.proof.payment_id, pending.order.gateway_order_id, e
                );
                let err = CheckoutError::PersistenceError {
                    payment_id: pending.proof.payment_id.clone(),
                    message: e.to_string(),
                };
                Err(self.fail(err))
            }
        }
    }

    fn is_current(&self, ticket: CheckoutTicket, expected: CheckoutState) -> bool {
        let current = ticket.attempt == self.attempt && self.state == expected;
        if !current {
            debug!(
                "Ignoring stale checkout callback (attempt {} vs {}, state {:?})",
                ticket.attempt, self.attempt, self.state
            );
        }
        current
    }

    /// Report without changing state.
    fn refuse(&mut self, err: CheckoutError) -> CheckoutError {
        self.notices.push(Notice::error(err.user_message()));
        err
    }

    fn fail(&mut self, err: CheckoutError) -> CheckoutError {
        warn!("Checkout attempt {} failed: {}", self.attempt, err);
        let mut notice = Notice::error(err.user_message());
        notice.support_reference = err.support_reference().map(str::to_string);
        self.notices.push(notice);
        self.state = CheckoutState::Failed;
        self.last_error = Some(err.clone());
        err
    }
}
