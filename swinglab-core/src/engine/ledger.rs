//! TradeLedger — realized P/L bookkeeping and the end-of-run summary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{ClosedTrade, TradeId};
use crate::engine::event::BrokerEvent;

/// End-of-run account summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub starting_value: f64,
    pub ending_value: f64,
    pub pnl: f64,
}

/// Records closed trades as the broker reports them.
#[derive(Debug)]
pub struct TradeLedger {
    starting_value: f64,
    trades: Vec<ClosedTrade>,
    next_trade: u64,
}

impl TradeLedger {
    pub fn new(starting_value: f64) -> Self {
        Self {
            starting_value,
            trades: Vec::new(),
            next_trade: 0,
        }
    }

    /// Route a broker notification; only trade closes are recorded.
    pub fn on_event(&mut self, event: &BrokerEvent) {
        if let BrokerEvent::TradeClosed {
            symbol,
            date,
            quantity,
            gross_pnl,
            commission,
        } = event
        {
            self.record_close(symbol.clone(), *date, *quantity, *gross_pnl, *commission);
        }
    }

    pub fn record_close(
        &mut self,
        symbol: String,
        close_date: NaiveDate,
        quantity: u32,
        gross_pnl: f64,
        commission: f64,
    ) {
        self.next_trade += 1;
        let trade = ClosedTrade {
            id: TradeId(self.next_trade),
            symbol,
            close_date,
            quantity,
            gross_pnl,
            commission,
            net_pnl: gross_pnl - commission,
        };
        info!(
            symbol = %trade.symbol,
            gross = trade.gross_pnl,
            net = trade.net_pnl,
            "trade closed"
        );
        self.trades.push(trade);
    }

    pub fn trades(&self) -> &[ClosedTrade] {
        &self.trades
    }

    pub fn starting_value(&self) -> f64 {
        self.starting_value
    }

    /// Sum of net P/L over all closed trades.
    pub fn realized_net(&self) -> f64 {
        self.trades.iter().map(|t| t.net_pnl).sum()
    }

    /// Final summary. `ending_value` comes from the account (it includes any
    /// still-open position marked to market), not from the trade list.
    pub fn summary(&self, ending_value: f64) -> RunSummary {
        RunSummary {
            starting_value: self.starting_value,
            ending_value,
            pnl: ending_value - self.starting_value,
        }
    }
}
