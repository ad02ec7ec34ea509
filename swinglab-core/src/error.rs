//! Engine error taxonomy.

use crate::domain::OrderId;
use thiserror::Error;

/// Errors surfaced by the decision/order path.
///
/// Rejections and network failures free the outstanding-order slot and are
/// never retried automatically — the next decision cycle re-evaluates.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Zero/negative/overflowing quantity or otherwise malformed request.
    /// Reconciliation short-circuits to a no-op on these.
    #[error("validation: {0}")]
    Validation(String),

    /// The broker refused the order (rejected or margin).
    #[error("order {id} rejected by broker: {reason}")]
    BrokerRejection { id: OrderId, reason: String },

    /// A submit/cancel call failed or timed out.
    #[error("network: {0}")]
    Network(String),

    /// Local position disagrees with the broker-reported position. The next
    /// reconciliation pass must use the broker's number as ground truth.
    #[error("stale state for {symbol}: local {local}, broker {broker}")]
    StaleState {
        symbol: String,
        local: i64,
        broker: i64,
    },

    /// An order is already outstanding; a second live entry is not allowed.
    #[error("order {0} is already outstanding")]
    OrderOutstanding(OrderId),

    /// Unknown order id in a notification or cancel request.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let err = EngineError::StaleState {
            symbol: "BTC".into(),
            local: 5,
            broker: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("BTC"));
        assert!(msg.contains('5'));
        assert!(msg.contains('3'));
    }
}
