//! Broker collaborator contract.
//!
//! The engine owns order ids and state; the broker executes. Credentials
//! and endpoints are injected into the concrete implementation at
//! construction — there is no process-wide client.

use crate::domain::{Order, OrderId};
use thiserror::Error;

/// Errors from broker calls. Network and rejection are distinct: a network
/// failure may leave the order state unknown, a rejection is definitive.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The call failed in transit; the broker-side outcome is unknown.
    #[error("network failure: {0}")]
    Network(String),

    /// The call timed out after submission; treat order state as unknown
    /// and resolve by re-querying on the next cycle.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The broker refused the request.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The broker does not know the referenced order.
    #[error("unknown order {0}")]
    UnknownOrder(OrderId),
}

impl BrokerError {
    /// Whether retrying the same call can possibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BrokerError::Network(_) | BrokerError::Timeout(_))
    }
}

/// The broker collaborator.
///
/// `submit_order` and `cancel_order` are synchronous acknowledgements only;
/// fills, rejections, and trade closes arrive later through the
/// notification channel (`BrokerEvent`s).
pub trait Broker {
    /// Hand an order to the broker. `Ok` means accepted for working, not
    /// filled.
    fn submit_order(&mut self, order: &Order) -> Result<(), BrokerError>;

    /// Cancel a working order. `Ok` confirms the cancel.
    fn cancel_order(&mut self, order_id: OrderId) -> Result<(), BrokerError>;

    /// Broker-side signed position for a symbol — ground truth when local
    /// state is suspect.
    fn position(&self, symbol: &str) -> Result<i64, BrokerError>;
}
