//! Per-symbol order manager — the single writer for order and position
//! state.
//!
//! Owns the order table, the outstanding-order slot, and the position for
//! one symbol. At most one order is outstanding at a time: an entry is
//! refused while the slot is occupied, and a replacement requires a
//! confirmed cancel first. Orders reach terminal status only through broker
//! notifications; ids are never reused.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::domain::{
    BracketGroupId, IdGen, Order, OrderId, OrderKind, OrderSide, OrderStatus, Position, Symbol,
    TimeInForce,
};
use crate::engine::bracket::{build_protective_legs, BracketBook};
use crate::engine::broker::{Broker, BrokerError};
use crate::engine::event::BrokerEvent;
use crate::error::EngineError;
use crate::strategy::{PositionState, Protection};

/// Snapshot of the per-symbol strategy state.
#[derive(Debug, Clone)]
pub struct StrategyState {
    pub position: Position,
    pub outstanding_order_id: Option<OrderId>,
    pub bracket_group_id: Option<BracketGroupId>,
}

pub struct OrderManager {
    symbol: Symbol,
    position: Position,
    orders: HashMap<OrderId, Order>,
    outstanding: Option<OrderId>,
    /// Protection plan for the in-flight entry, consumed on its fill.
    pending_protection: Option<Protection>,
    /// Live protective stop legs (one or two).
    stop_leg_ids: Vec<OrderId>,
    bracket_group: Option<BracketGroupId>,
    brackets: BracketBook,
}

impl OrderManager {
    pub fn new(symbol: impl Into<Symbol>) -> Self {
        let symbol = symbol.into();
        Self {
            position: Position::flat(symbol.clone()),
            symbol,
            orders: HashMap::new(),
            outstanding: None,
            pending_protection: None,
            stop_leg_ids: Vec::new(),
            bracket_group: None,
            brackets: BracketBook::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn position_state(&self) -> PositionState {
        PositionState::from_quantity(self.position.quantity)
    }

    pub fn outstanding_order_id(&self) -> Option<OrderId> {
        self.outstanding
    }

    pub fn bracket_group_id(&self) -> Option<BracketGroupId> {
        self.bracket_group
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    /// Ids of protective stop legs that are still live.
    pub fn live_stop_legs(&self) -> Vec<OrderId> {
        self.stop_leg_ids
            .iter()
            .copied()
            .filter(|id| self.orders.get(id).is_some_and(Order::is_live))
            .collect()
    }

    pub fn state(&self) -> StrategyState {
        StrategyState {
            position: self.position.clone(),
            outstanding_order_id: self.outstanding,
            bracket_group_id: self.bracket_group,
        }
    }

    /// Override the local position with a broker-reported quantity.
    ///
    /// Used when stale state was detected; the broker's number is ground
    /// truth. The average price of the surviving quantity is kept.
    pub fn adopt_broker_position(&mut self, quantity: i64) {
        if self.position.quantity != quantity {
            warn!(
                symbol = %self.symbol,
                local = self.position.quantity,
                broker = quantity,
                "overriding local position with broker-reported quantity"
            );
            self.position.quantity = quantity;
            if quantity == 0 {
                self.position.avg_price = 0.0;
            }
        }
    }

    fn map_submit_err(&self, id: OrderId, err: BrokerError) -> EngineError {
        match err {
            BrokerError::Rejected(reason) => EngineError::BrokerRejection { id, reason },
            other => EngineError::Network(other.to_string()),
        }
    }

    /// Submit an entry order. Refused while another order is outstanding.
    pub fn submit_entry(
        &mut self,
        broker: &mut dyn Broker,
        id_gen: &mut IdGen,
        side: OrderSide,
        kind: OrderKind,
        quantity: u32,
        protection: Option<Protection>,
        bar_index: usize,
    ) -> Result<OrderId, EngineError> {
        if let Some(id) = self.outstanding {
            return Err(EngineError::OrderOutstanding(id));
        }
        if quantity == 0 {
            return Err(EngineError::Validation("entry quantity is zero".into()));
        }

        let order = Order {
            id: id_gen.next_order_id(),
            symbol: self.symbol.clone(),
            side,
            kind,
            quantity,
            time_in_force: TimeInForce::Day,
            status: OrderStatus::Submitted,
            bracket_group_id: None,
            created_bar: bar_index,
        };
        let id = order.id;

        broker
            .submit_order(&order)
            .map_err(|e| self.map_submit_err(id, e))?;

        info!(
            symbol = %self.symbol,
            order = %id,
            ?side,
            quantity,
            "entry order submitted"
        );
        self.orders.insert(id, order);
        self.outstanding = Some(id);
        self.pending_protection = protection;
        Ok(id)
    }

    /// Explicitly close the position: cancel any live protective legs, then
    /// submit a market order for the full held quantity.
    pub fn submit_exit(
        &mut self,
        broker: &mut dyn Broker,
        id_gen: &mut IdGen,
        bar_index: usize,
    ) -> Result<Option<OrderId>, EngineError> {
        if let Some(id) = self.outstanding {
            return Err(EngineError::OrderOutstanding(id));
        }
        if self.position.is_flat() {
            return Ok(None);
        }

        // The pending legs come out first, as part of the close.
        self.cancel_stop_legs(broker, "explicit close")?;

        let side = if self.position.is_long() {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        };
        let quantity = self.position.quantity.unsigned_abs() as u32;

        let order = Order {
            id: id_gen.next_order_id(),
            symbol: self.symbol.clone(),
            side,
            kind: OrderKind::Market,
            quantity,
            time_in_force: TimeInForce::Day,
            status: OrderStatus::Submitted,
            bracket_group_id: None,
            created_bar: bar_index,
        };
        let id = order.id;

        broker
            .submit_order(&order)
            .map_err(|e| self.map_submit_err(id, e))?;

        info!(symbol = %self.symbol, order = %id, ?side, quantity, "exit order submitted");
        self.orders.insert(id, order);
        self.outstanding = Some(id);
        Ok(Some(id))
    }

    /// Cancel a live order, confirming with the broker first. Cancelling
    /// one leg of an OCO pair retires the pair: the sibling goes too.
    ///
    /// On a network failure nothing local changes and the error
    /// propagates — the caller aborts its cycle rather than guessing.
    pub fn cancel(
        &mut self,
        broker: &mut dyn Broker,
        order_id: OrderId,
        reason: &str,
    ) -> Result<(), EngineError> {
        let order = self.require_known(order_id)?;
        if !order.is_live() {
            return Ok(());
        }
        let group = order.bracket_group_id;

        broker
            .cancel_order(order_id)
            .map_err(|e| EngineError::Network(e.to_string()))?;

        self.mark_cancelled(order_id, reason);
        if self.outstanding == Some(order_id) {
            self.outstanding = None;
            self.pending_protection = None;
        }
        self.forget_stop_leg(order_id);
        if let Some(group_id) = group {
            self.cancel_sibling(broker, group_id, order_id, "oco sibling cancelled")?;
        }
        info!(symbol = %self.symbol, order = %order_id, reason, "order cancelled");
        Ok(())
    }

    /// Cancel the outstanding order if one exists. Returns true when an
    /// order was actually cancelled.
    pub fn cancel_outstanding(
        &mut self,
        broker: &mut dyn Broker,
        reason: &str,
    ) -> Result<bool, EngineError> {
        match self.outstanding {
            Some(id) => self.cancel(broker, id, reason).map(|()| true),
            None => Ok(false),
        }
    }

    /// Dispatch one broker notification.
    pub fn on_event(
        &mut self,
        broker: &mut dyn Broker,
        id_gen: &mut IdGen,
        event: &BrokerEvent,
        bar_index: usize,
    ) -> Result<(), EngineError> {
        match event {
            BrokerEvent::Submitted { order_id } => {
                // No state change: the order is already tracked as Submitted.
                self.require_known(*order_id)?;
                Ok(())
            }
            BrokerEvent::Accepted { order_id } => {
                let order = self.require_known_mut(*order_id)?;
                if order.status == OrderStatus::Submitted {
                    order.status = OrderStatus::Accepted;
                }
                Ok(())
            }
            BrokerEvent::Filled {
                order_id,
                price,
                quantity,
            } => self.on_filled(broker, id_gen, *order_id, *price, *quantity, bar_index),
            BrokerEvent::Rejected { order_id, reason } => {
                let order = self.require_known_mut(*order_id)?;
                if order.status.is_terminal() {
                    return Ok(());
                }
                order.status = OrderStatus::Rejected {
                    reason: reason.clone(),
                };
                warn!(
                    symbol = %self.symbol,
                    order = %order_id,
                    reason,
                    "order rejected; slot freed, no automatic retry"
                );
                if self.outstanding == Some(*order_id) {
                    self.outstanding = None;
                    self.pending_protection = None;
                }
                self.forget_stop_leg(*order_id);
                Ok(())
            }
            BrokerEvent::Cancelled { order_id } => {
                let order = self.require_known_mut(*order_id)?;
                if order.status.is_terminal() {
                    // Echo of a cancel this side already confirmed.
                    return Ok(());
                }
                let group = order.bracket_group_id;
                order.status = OrderStatus::Cancelled {
                    reason: "cancelled by broker".into(),
                };
                if self.outstanding == Some(*order_id) {
                    self.outstanding = None;
                    self.pending_protection = None;
                }
                self.forget_stop_leg(*order_id);
                // A cancelled leg retires its pair: the sibling goes too.
                if let Some(group_id) = group {
                    self.cancel_sibling(broker, group_id, *order_id, "oco sibling cancelled")?;
                }
                Ok(())
            }
            // Trade closes are routed to the ledger by the caller.
            BrokerEvent::TradeClosed { .. } => Ok(()),
        }
    }

    // ── internals ──────────────────────────────────────────────────────

    fn on_filled(
        &mut self,
        broker: &mut dyn Broker,
        id_gen: &mut IdGen,
        order_id: OrderId,
        price: f64,
        quantity: u32,
        bar_index: usize,
    ) -> Result<(), EngineError> {
        let (side, group) = {
            let order = self.require_known_mut(order_id)?;
            if order.status.is_terminal() {
                return Ok(());
            }
            order.status = OrderStatus::Filled;
            (order.side, order.bracket_group_id)
        };

        let signed = side.sign() * quantity as i64;
        let realized = self.position.apply_fill(signed, price);
        info!(
            symbol = %self.symbol,
            order = %order_id,
            ?side,
            quantity,
            price,
            realized,
            "order filled"
        );

        let was_outstanding = self.outstanding == Some(order_id);
        if was_outstanding {
            self.outstanding = None;
        }

        // A filled OCO leg cancels its sibling in this same cycle.
        if let Some(group_id) = group {
            self.cancel_sibling(broker, group_id, order_id, "oco sibling filled")?;
        }
        self.forget_stop_leg(order_id);

        // An entry fill arms its protection at the fill price.
        if was_outstanding {
            if let Some(protection) = self.pending_protection.take() {
                if !self.position.is_flat() {
                    self.arm_protection(broker, id_gen, side, price, quantity, protection, bar_index)?;
                }
            }
        }
        Ok(())
    }

    fn arm_protection(
        &mut self,
        broker: &mut dyn Broker,
        id_gen: &mut IdGen,
        entry_side: OrderSide,
        fill_price: f64,
        quantity: u32,
        protection: Protection,
        bar_index: usize,
    ) -> Result<(), EngineError> {
        let (legs, group_id) = build_protective_legs(
            id_gen,
            &self.symbol,
            entry_side,
            fill_price,
            quantity,
            protection,
            bar_index,
        );

        let mut leg_ids = Vec::with_capacity(legs.len());
        for leg in legs {
            let id = leg.id;
            broker
                .submit_order(&leg)
                .map_err(|e| self.map_submit_err(id, e))?;
            info!(
                symbol = %self.symbol,
                order = %id,
                trigger = ?leg.kind.trigger_price(),
                "protective stop submitted"
            );
            self.orders.insert(id, leg);
            leg_ids.push(id);
        }

        if let Some(group_id) = group_id {
            self.brackets.register(crate::domain::BracketGroup {
                id: group_id,
                leg_ids: leg_ids.clone(),
            });
        }
        self.stop_leg_ids = leg_ids;
        self.bracket_group = group_id;
        Ok(())
    }

    /// Cancel the OCO sibling of a resolved leg and retire the group.
    fn cancel_sibling(
        &mut self,
        broker: &mut dyn Broker,
        group_id: BracketGroupId,
        resolved: OrderId,
        reason: &str,
    ) -> Result<(), EngineError> {
        let sibling = match self.brackets.resolve_leg(group_id, resolved) {
            Some(id) => id,
            None => return Ok(()), // group already retired
        };
        if self.orders.get(&sibling).is_some_and(Order::is_live) {
            self.cancel_at_broker_lenient(broker, sibling)?;
            self.mark_cancelled(sibling, reason);
        }
        self.forget_stop_leg(sibling);
        Ok(())
    }

    /// Cancel a protective leg, tolerating a broker that already dropped it
    /// (OCO enforced server-side removes the sibling before our cancel
    /// arrives).
    fn cancel_at_broker_lenient(
        &mut self,
        broker: &mut dyn Broker,
        id: OrderId,
    ) -> Result<(), EngineError> {
        match broker.cancel_order(id) {
            Ok(()) | Err(BrokerError::UnknownOrder(_)) => Ok(()),
            Err(e) => Err(EngineError::Network(e.to_string())),
        }
    }

    /// Cancel all live protective legs (explicit close path).
    fn cancel_stop_legs(
        &mut self,
        broker: &mut dyn Broker,
        reason: &str,
    ) -> Result<(), EngineError> {
        for id in self.live_stop_legs() {
            self.cancel_at_broker_lenient(broker, id)?;
            self.mark_cancelled(id, reason);
        }
        if let Some(group_id) = self.bracket_group.take() {
            // Retire whichever pair is still registered.
            if let Some(&first) = self.stop_leg_ids.first() {
                self.brackets.resolve_leg(group_id, first);
            }
        }
        self.stop_leg_ids.clear();
        Ok(())
    }

    fn mark_cancelled(&mut self, id: OrderId, reason: &str) {
        if let Some(order) = self.orders.get_mut(&id) {
            if !order.status.is_terminal() {
                order.status = OrderStatus::Cancelled {
                    reason: reason.to_string(),
                };
            }
        }
    }

    fn forget_stop_leg(&mut self, id: OrderId) {
        self.stop_leg_ids.retain(|&leg| leg != id);
        if self.stop_leg_ids.is_empty() {
            self.bracket_group = None;
        }
    }

    fn require_known(&self, id: OrderId) -> Result<&Order, EngineError> {
        self.orders.get(&id).ok_or(EngineError::OrderNotFound(id))
    }

    fn require_known_mut(&mut self, id: OrderId) -> Result<&mut Order, EngineError> {
        self.orders
            .get_mut(&id)
            .ok_or(EngineError::OrderNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sim::SimBroker;
    use crate::indicators::make_bars;

    fn manager_and_broker() -> (OrderManager, SimBroker, IdGen) {
        (OrderManager::new("BTC"), SimBroker::new(0.0), IdGen::new())
    }

    #[test]
    fn entry_refused_while_outstanding() {
        let (mut om, mut broker, mut ids) = manager_and_broker();
        om.submit_entry(
            &mut broker,
            &mut ids,
            OrderSide::Sell,
            OrderKind::Market,
            10,
            None,
            0,
        )
        .unwrap();

        let err = om
            .submit_entry(
                &mut broker,
                &mut ids,
                OrderSide::Sell,
                OrderKind::Market,
                10,
                None,
                0,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::OrderOutstanding(_)));
    }

    #[test]
    fn zero_quantity_entry_is_validation_error() {
        let (mut om, mut broker, mut ids) = manager_and_broker();
        let err = om
            .submit_entry(
                &mut broker,
                &mut ids,
                OrderSide::Buy,
                OrderKind::Market,
                0,
                None,
                0,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn fill_updates_position_and_frees_slot() {
        let (mut om, mut broker, mut ids) = manager_and_broker();
        let id = om
            .submit_entry(
                &mut broker,
                &mut ids,
                OrderSide::Buy,
                OrderKind::Market,
                10,
                None,
                0,
            )
            .unwrap();

        let bars = make_bars(&[100.0, 101.0]);
        let events = broker.process_bar(&bars[1], 1);
        for event in &events {
            om.on_event(&mut broker, &mut ids, event, 1).unwrap();
        }

        assert_eq!(om.position().quantity, 10);
        assert!(om.outstanding_order_id().is_none());
        assert_eq!(om.order(id).unwrap().status, OrderStatus::Filled);
    }

    #[test]
    fn entry_fill_arms_oco_protection() {
        let (mut om, mut broker, mut ids) = manager_and_broker();
        om.submit_entry(
            &mut broker,
            &mut ids,
            OrderSide::Sell,
            OrderKind::Market,
            10,
            Some(Protection::OcoStops {
                loss_offset: 2.0,
                channel_stop: 108.0,
            }),
            0,
        )
        .unwrap();

        let bars = make_bars(&[100.0, 100.0]);
        for event in broker.process_bar(&bars[1], 1) {
            om.on_event(&mut broker, &mut ids, &event, 1).unwrap();
        }

        assert_eq!(om.position().quantity, -10);
        let legs = om.live_stop_legs();
        assert_eq!(legs.len(), 2);
        assert!(om.bracket_group_id().is_some());
        for id in legs {
            let leg = om.order(id).unwrap();
            assert_eq!(leg.side, OrderSide::Buy);
            assert!(leg.bracket_group_id.is_some());
        }
    }

    #[test]
    fn rejected_entry_frees_slot_without_retry() {
        let (mut om, mut broker, mut ids) = manager_and_broker();
        broker.reject_next_fill("margin");
        om.submit_entry(
            &mut broker,
            &mut ids,
            OrderSide::Buy,
            OrderKind::Market,
            10,
            None,
            0,
        )
        .unwrap();

        let bars = make_bars(&[100.0, 100.0]);
        for event in broker.process_bar(&bars[1], 1) {
            om.on_event(&mut broker, &mut ids, &event, 1).unwrap();
        }

        assert!(om.outstanding_order_id().is_none());
        assert!(om.position().is_flat());
    }

    #[test]
    fn cancel_outstanding_confirms_before_freeing() {
        let (mut om, mut broker, mut ids) = manager_and_broker();
        let id = om
            .submit_entry(
                &mut broker,
                &mut ids,
                OrderSide::Buy,
                OrderKind::Limit { limit_price: 90.0 },
                10,
                None,
                0,
            )
            .unwrap();

        assert!(om.cancel_outstanding(&mut broker, "stale target").unwrap());
        assert!(om.outstanding_order_id().is_none());
        assert!(matches!(
            om.order(id).unwrap().status,
            OrderStatus::Cancelled { .. }
        ));

        // Nothing left to cancel.
        assert!(!om.cancel_outstanding(&mut broker, "noop").unwrap());
    }

    #[test]
    fn cancelling_one_leg_cancels_its_sibling() {
        let (mut om, mut broker, mut ids) = manager_and_broker();
        om.submit_entry(
            &mut broker,
            &mut ids,
            OrderSide::Sell,
            OrderKind::Market,
            10,
            Some(Protection::OcoStops {
                loss_offset: 2.0,
                channel_stop: 108.0,
            }),
            0,
        )
        .unwrap();
        let bars = make_bars(&[100.0, 100.0]);
        for event in broker.process_bar(&bars[1], 1) {
            om.on_event(&mut broker, &mut ids, &event, 1).unwrap();
        }
        let legs = om.live_stop_legs();
        assert_eq!(legs.len(), 2);

        om.cancel(&mut broker, legs[0], "manual").unwrap();

        for id in legs {
            assert!(matches!(
                om.order(id).unwrap().status,
                OrderStatus::Cancelled { .. }
            ));
        }
        assert!(om.bracket_group_id().is_none());
        assert!(om.live_stop_legs().is_empty());
    }

    #[test]
    fn adopt_broker_position_overrides_local() {
        let (mut om, _, _) = manager_and_broker();
        om.adopt_broker_position(-7);
        assert_eq!(om.position().quantity, -7);
        om.adopt_broker_position(0);
        assert!(om.position().is_flat());
        assert_eq!(om.position().avg_price, 0.0);
    }
}
