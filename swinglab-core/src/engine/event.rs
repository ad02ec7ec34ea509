//! Broker notification events.
//!
//! One explicit enum replaces callback-style status hooks: every order
//! status change and trade close arrives as a value, dispatched to the
//! order manager, bracket table, and ledger in arrival order.

use crate::domain::{OrderId, Symbol};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single notification from the broker collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BrokerEvent {
    /// Order reached the broker.
    Submitted { order_id: OrderId },
    /// Order acknowledged and working.
    Accepted { order_id: OrderId },
    /// Order completely filled.
    Filled {
        order_id: OrderId,
        price: f64,
        quantity: u32,
    },
    /// Order refused (margin rejections included).
    Rejected { order_id: OrderId, reason: String },
    /// Order cancelled.
    Cancelled { order_id: OrderId },
    /// A round-trip closed; P/L is final.
    TradeClosed {
        symbol: Symbol,
        date: NaiveDate,
        quantity: u32,
        gross_pnl: f64,
        commission: f64,
    },
}

impl BrokerEvent {
    /// The order this event refers to, if any.
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            BrokerEvent::Submitted { order_id }
            | BrokerEvent::Accepted { order_id }
            | BrokerEvent::Filled { order_id, .. }
            | BrokerEvent::Rejected { order_id, .. }
            | BrokerEvent::Cancelled { order_id } => Some(*order_id),
            BrokerEvent::TradeClosed { .. } => None,
        }
    }
}
