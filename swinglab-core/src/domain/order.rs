//! Order types, lifecycle states, and OCO bracket groups.

use super::ids::{BracketGroupId, OrderId};
use serde::{Deserialize, Serialize};

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The side that closes a position opened on this side.
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    /// Signed multiplier applied to fill quantities: +1 buy, -1 sell.
    pub fn sign(self) -> i64 {
        match self {
            OrderSide::Buy => 1,
            OrderSide::Sell => -1,
        }
    }
}

/// What kind of order and its price parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Fill at the next processed bar's open.
    Market,
    /// Fill at the limit price or better.
    Limit { limit_price: f64 },
    /// Triggers when price reaches the trigger level, then fills as market.
    StopMarket { trigger_price: f64 },
}

impl OrderKind {
    pub fn trigger_price(&self) -> Option<f64> {
        match self {
            OrderKind::StopMarket { trigger_price } => Some(*trigger_price),
            _ => None,
        }
    }

    pub fn limit_price(&self) -> Option<f64> {
        match self {
            OrderKind::Limit { limit_price } => Some(*limit_price),
            _ => None,
        }
    }
}

/// How long the order stays working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    Day,
    GoodTillCancelled,
}

/// Order lifecycle states. Transitions to a terminal state come only from
/// broker notifications; a terminal order is never revived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Sent to the broker, not yet acknowledged.
    Submitted,
    /// Acknowledged by the broker, working.
    Accepted,
    /// Completely filled (terminal).
    Filled,
    /// Refused by the broker, margin included (terminal).
    Rejected { reason: String },
    /// Cancelled with a reason: OCO sibling filled, replaced, explicit close (terminal).
    Cancelled { reason: String },
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Rejected { .. } | OrderStatus::Cancelled { .. }
        )
    }
}

/// A single order. Owned exclusively by the order manager until terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub quantity: u32,
    pub time_in_force: TimeInForce,
    pub status: OrderStatus,
    /// Set on the two stop legs of a protective pair; entry orders carry None.
    pub bracket_group_id: Option<BracketGroupId>,
    /// Bar index when the order was created.
    pub created_bar: usize,
}

impl Order {
    pub fn is_live(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Signed quantity this order contributes to the position when filled.
    pub fn signed_quantity(&self) -> i64 {
        self.side.sign() * self.quantity as i64
    }
}

/// The two stop legs of a one-cancels-other pair, resolved by group id
/// lookup rather than by references between the orders themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BracketGroup {
    pub id: BracketGroupId,
    pub leg_ids: Vec<OrderId>,
}

impl BracketGroup {
    /// The other leg of the pair. None when `order_id` is not a member.
    pub fn sibling_of(&self, order_id: OrderId) -> Option<OrderId> {
        if !self.leg_ids.contains(&order_id) {
            return None;
        }
        self.leg_ids.iter().copied().find(|&id| id != order_id)
    }
}
