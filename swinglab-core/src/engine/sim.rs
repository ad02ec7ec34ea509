//! SimBroker — deterministic broker collaborator for backtests.
//!
//! Fill model, applied once per bar in submission order:
//! - Market orders fill at the bar's open.
//! - Limit buys fill at the open when it is at or below the limit,
//!   otherwise at the limit when the bar's low reaches it (sells mirrored).
//! - Stop-market buys trigger when the bar's high reaches the trigger and
//!   fill at max(trigger, open) — gap-adjusted; sell stops mirrored.
//!
//! OCO is enforced broker-side, as real brokers do: filling one leg of a
//! bracket group drops its pending siblings and queues their Cancelled
//! notifications in the same batch. Time-in-force expiry is not simulated;
//! working orders stay working until filled or cancelled.
//!
//! All notifications for bar t are returned from `process_bar(t)` before the
//! caller makes the bar-t decision, which keeps replays bit-identical.

use std::collections::VecDeque;

use chrono::NaiveDate;

use crate::domain::{Bar, Order, OrderId, OrderKind, OrderSide, Position};
use crate::engine::broker::{Broker, BrokerError};
use crate::engine::event::BrokerEvent;

pub struct SimBroker {
    commission_rate: f64,
    cash: f64,
    starting_cash: f64,
    /// The broker's own book, independent of the engine's local state.
    book: Position,
    pending: Vec<Order>,
    queued: VecDeque<BrokerEvent>,
    /// Forces the next processed order to reject (margin simulation, tests).
    reject_reason: Option<String>,
    // Running totals for the currently open round trip.
    open_trade_gross: f64,
    open_trade_commission: f64,
    open_trade_closed_qty: u32,
}

impl SimBroker {
    pub fn new(commission_rate: f64) -> Self {
        Self::with_cash(commission_rate, 1_000_000.0)
    }

    pub fn with_cash(commission_rate: f64, cash: f64) -> Self {
        Self {
            commission_rate,
            cash,
            starting_cash: cash,
            book: Position::flat(""),
            pending: Vec::new(),
            queued: VecDeque::new(),
            reject_reason: None,
            open_trade_gross: 0.0,
            open_trade_commission: 0.0,
            open_trade_closed_qty: 0,
        }
    }

    pub fn starting_value(&self) -> f64 {
        self.starting_cash
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Cash plus the book marked at `price`.
    pub fn account_value(&self, price: f64) -> f64 {
        self.cash + self.book.market_value(price)
    }

    /// Force the next order processed by `process_bar` to reject.
    pub fn reject_next_fill(&mut self, reason: &str) {
        self.reject_reason = Some(reason.to_string());
    }

    /// Working orders still on the book.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Process one bar: drain queued acknowledgements, then attempt fills.
    /// Returns every notification for this bar, in deterministic order.
    pub fn process_bar(&mut self, bar: &Bar, _bar_index: usize) -> Vec<BrokerEvent> {
        let mut events: Vec<BrokerEvent> = self.queued.drain(..).collect();

        let working = std::mem::take(&mut self.pending);
        for order in working {
            if let Some(reason) = self.reject_reason.take() {
                events.push(BrokerEvent::Rejected {
                    order_id: order.id,
                    reason,
                });
                continue;
            }

            match fill_price(&order, bar) {
                Some(price) => {
                    // Margin check on the cash needed to buy.
                    if order.side == OrderSide::Buy {
                        let cost = price * order.quantity as f64;
                        if cost * (1.0 + self.commission_rate) > self.cash
                            && self.book.quantity >= 0
                        {
                            events.push(BrokerEvent::Rejected {
                                order_id: order.id,
                                reason: "margin".into(),
                            });
                            continue;
                        }
                    }
                    self.apply_fill(&order, price, bar.date, &mut events);
                }
                None => self.pending.push(order),
            }
        }

        events
    }

    fn apply_fill(
        &mut self,
        order: &Order,
        price: f64,
        date: NaiveDate,
        events: &mut Vec<BrokerEvent>,
    ) {
        let quantity = order.quantity;
        let signed = order.side.sign() * quantity as i64;
        let commission = self.commission_rate * price * quantity as f64;

        let before = self.book.quantity;
        let realized = self.book.apply_fill(signed, price);
        let after = self.book.quantity;

        self.cash -= signed as f64 * price;
        self.cash -= commission;

        events.push(BrokerEvent::Filled {
            order_id: order.id,
            price,
            quantity,
        });

        // OCO: a filled leg drops its pending siblings.
        if let Some(group) = order.bracket_group_id {
            let mut cancelled = Vec::new();
            self.pending.retain(|o| {
                if o.bracket_group_id == Some(group) {
                    cancelled.push(o.id);
                    false
                } else {
                    true
                }
            });
            for order_id in cancelled {
                events.push(BrokerEvent::Cancelled { order_id });
            }
        }

        let closing = (signed.unsigned_abs()).min(before.unsigned_abs()) as u32;
        self.open_trade_gross += realized;
        self.open_trade_commission += commission;
        self.open_trade_closed_qty += closing;

        let flat = after == 0;
        let flipped = before != 0 && after != 0 && (before > 0) != (after > 0);
        if (flat || flipped) && before != 0 {
            events.push(BrokerEvent::TradeClosed {
                symbol: order.symbol.clone(),
                date,
                quantity: self.open_trade_closed_qty,
                gross_pnl: self.open_trade_gross,
                commission: self.open_trade_commission,
            });
            self.open_trade_gross = 0.0;
            self.open_trade_commission = 0.0;
            self.open_trade_closed_qty = 0;
        }
    }
}

/// The price an order fills at on this bar, or None when it stays working.
fn fill_price(order: &Order, bar: &Bar) -> Option<f64> {
    match order.kind {
        OrderKind::Market => Some(bar.open),
        OrderKind::Limit { limit_price } => match order.side {
            OrderSide::Buy => {
                if bar.open <= limit_price {
                    Some(bar.open)
                } else if bar.low <= limit_price {
                    Some(limit_price)
                } else {
                    None
                }
            }
            OrderSide::Sell => {
                if bar.open >= limit_price {
                    Some(bar.open)
                } else if bar.high >= limit_price {
                    Some(limit_price)
                } else {
                    None
                }
            }
        },
        OrderKind::StopMarket { trigger_price } => match order.side {
            OrderSide::Buy => {
                if bar.open >= trigger_price {
                    Some(bar.open)
                } else if bar.high >= trigger_price {
                    Some(trigger_price)
                } else {
                    None
                }
            }
            OrderSide::Sell => {
                if bar.open <= trigger_price {
                    Some(bar.open)
                } else if bar.low <= trigger_price {
                    Some(trigger_price)
                } else {
                    None
                }
            }
        },
    }
}

impl Broker for SimBroker {
    fn submit_order(&mut self, order: &Order) -> Result<(), BrokerError> {
        if order.quantity == 0 {
            return Err(BrokerError::Rejected("zero quantity".into()));
        }
        self.queued.push_back(BrokerEvent::Submitted { order_id: order.id });
        self.queued.push_back(BrokerEvent::Accepted { order_id: order.id });
        self.pending.push(order.clone());
        Ok(())
    }

    fn cancel_order(&mut self, order_id: OrderId) -> Result<(), BrokerError> {
        let before = self.pending.len();
        self.pending.retain(|o| o.id != order_id);
        if self.pending.len() == before {
            return Err(BrokerError::UnknownOrder(order_id));
        }
        self.queued.push_back(BrokerEvent::Cancelled { order_id });
        Ok(())
    }

    fn position(&self, _symbol: &str) -> Result<i64, BrokerError> {
        Ok(self.book.quantity)
    }
}
