//! Human-readable run reporting.

use std::fmt::Write;

use crate::runner::BacktestResult;

/// Render the end-of-run account summary.
pub fn format_summary(result: &BacktestResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Backtest Result ===");
    let _ = writeln!(out, "Symbol:          {}", result.symbol);
    let _ = writeln!(
        out,
        "Bars:            {} ({} warmup)",
        result.bar_count, result.warmup_bars
    );
    let _ = writeln!(out, "Trades:          {}", result.trades.len());
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Starting Portfolio Value: {:.2}",
        result.summary.starting_value
    );
    let _ = writeln!(
        out,
        "Final Portfolio Value:    {:.2}",
        result.summary.ending_value
    );
    let _ = writeln!(out, "PnL:                      {:.2}", result.summary.pnl);
    out
}

/// Render one line per closed trade (gross and net of commission).
pub fn format_trades(result: &BacktestResult) -> String {
    let mut out = String::new();
    for trade in &result.trades {
        let _ = writeln!(
            out,
            "{} {} x{}  gross: {:.2}  net: {:.2}",
            trade.close_date, trade.symbol, trade.quantity, trade.gross_pnl, trade.net_pnl
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use swinglab_core::engine::RunSummary;

    #[test]
    fn summary_contains_the_three_account_lines() {
        let result = BacktestResult {
            run_id: "abc".into(),
            symbol: "BTC".into(),
            summary: RunSummary {
                starting_value: 100_000.0,
                ending_value: 101_234.5,
                pnl: 1_234.5,
            },
            trades: Vec::new(),
            bar_count: 200,
            warmup_bars: 29,
        };
        let text = format_summary(&result);
        assert!(text.contains("Starting Portfolio Value: 100000.00"));
        assert!(text.contains("Final Portfolio Value:    101234.50"));
        assert!(text.contains("PnL:                      1234.50"));
    }
}
