//! Position — signed holdings for one symbol.

use serde::{Deserialize, Serialize};

/// Signed position for a single symbol.
///
/// `quantity > 0` is long, `< 0` is short, `0` is flat. Mutated only by the
/// order manager when a fill notification arrives; sign flips across chained
/// fills are legal, but a single fill is never split across the flip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: i64,
    pub avg_price: f64,
}

impl Position {
    pub fn flat(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            quantity: 0,
            avg_price: 0.0,
        }
    }

    pub fn is_long(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0
    }

    pub fn market_value(&self, current_price: f64) -> f64 {
        self.quantity as f64 * current_price
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.quantity as f64 * (current_price - self.avg_price)
    }

    /// Apply a signed fill at `price`, returning the realized P/L of any
    /// closed portion.
    ///
    /// Three cases: extend (same sign), reduce/close (opposite sign, within
    /// the held quantity), flip (opposite sign beyond the held quantity —
    /// the old position is fully realized and the remainder opens the new
    /// one at the fill price).
    pub fn apply_fill(&mut self, signed_quantity: i64, price: f64) -> f64 {
        if signed_quantity == 0 {
            return 0.0;
        }

        let same_direction = self.quantity == 0 || (self.quantity > 0) == (signed_quantity > 0);
        if same_direction {
            // Extend: average the entry price over the combined size.
            let old_abs = self.quantity.abs() as f64;
            let add_abs = signed_quantity.abs() as f64;
            self.avg_price =
                (self.avg_price * old_abs + price * add_abs) / (old_abs + add_abs);
            self.quantity += signed_quantity;
            return 0.0;
        }

        let closing = signed_quantity.abs().min(self.quantity.abs());
        // Realized P/L has the sign of the held direction.
        let direction = if self.quantity > 0 { 1.0 } else { -1.0 };
        let realized = direction * closing as f64 * (price - self.avg_price);

        self.quantity += signed_quantity;
        if self.quantity == 0 {
            self.avg_price = 0.0;
        } else if (self.quantity > 0) != (direction > 0.0) {
            // Sign flipped: remainder is a fresh position at the fill price.
            self.avg_price = price;
        }
        realized
    }
}
