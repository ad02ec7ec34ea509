//! ClosedTrade — a completed round-trip with realized P/L.

use super::ids::TradeId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A closed round-trip trade as reported by the broker collaborator.
///
/// Net P/L is gross minus commission on both legs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub id: TradeId,
    pub symbol: String,
    pub close_date: NaiveDate,
    pub quantity: u32,
    pub gross_pnl: f64,
    pub commission: f64,
    pub net_pnl: f64,
}

impl ClosedTrade {
    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }
}
