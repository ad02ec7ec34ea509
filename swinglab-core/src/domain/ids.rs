//! Integer id newtypes and the deterministic id generator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order id. Never reused: a replacement order always gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Id shared by the two stop legs of a one-cancels-other pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BracketGroupId(pub u64);

impl fmt::Display for BracketGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed-trade id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradeId(pub u64);

/// Monotonic id source. Single writer per run; replaying the same event
/// sequence yields the same ids.
#[derive(Debug, Default)]
pub struct IdGen {
    next_order: u64,
    next_bracket_group: u64,
    next_trade: u64,
}

impl IdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_order_id(&mut self) -> OrderId {
        self.next_order += 1;
        OrderId(self.next_order)
    }

    pub fn next_bracket_group_id(&mut self) -> BracketGroupId {
        self.next_bracket_group += 1;
        BracketGroupId(self.next_bracket_group)
    }

    pub fn next_trade_id(&mut self) -> TradeId {
        self.next_trade += 1;
        TradeId(self.next_trade)
    }
}
