//! Bracket table — protective stop legs and their OCO pairing.
//!
//! Legs are looked up through a table keyed by `BracketGroupId`; the two
//! orders of a pair never reference each other directly. When one leg
//! resolves (fill or cancel), the sibling must be cancelled within the same
//! processing cycle and the group retired.

use std::collections::HashMap;

use crate::domain::{
    BracketGroup, BracketGroupId, IdGen, Order, OrderId, OrderKind, OrderSide, OrderStatus,
    TimeInForce,
};
use crate::strategy::Protection;

/// Specification of the protective legs for a filled entry.
///
/// For a short entry the protection buys back; for a long entry it sells.
/// `OcoStops` yields two legs sharing a fresh group id; `SingleStop` yields
/// one ungrouped leg.
pub fn build_protective_legs(
    id_gen: &mut IdGen,
    symbol: &str,
    entry_side: OrderSide,
    entry_fill_price: f64,
    quantity: u32,
    protection: Protection,
    created_bar: usize,
) -> (Vec<Order>, Option<BracketGroupId>) {
    let stop_side = entry_side.opposite();
    let make_stop = |id_gen: &mut IdGen, trigger_price: f64, group: Option<BracketGroupId>| Order {
        id: id_gen.next_order_id(),
        symbol: symbol.to_string(),
        side: stop_side,
        kind: OrderKind::StopMarket { trigger_price },
        quantity,
        time_in_force: TimeInForce::GoodTillCancelled,
        status: OrderStatus::Submitted,
        bracket_group_id: group,
        created_bar,
    };

    match protection {
        Protection::OcoStops {
            loss_offset,
            channel_stop,
        } => {
            let group_id = id_gen.next_bracket_group_id();
            // Max-loss stop sits on the adverse side of the fill.
            let max_loss_price = match stop_side {
                OrderSide::Buy => entry_fill_price + loss_offset,
                OrderSide::Sell => entry_fill_price - loss_offset,
            };
            let legs = vec![
                make_stop(id_gen, max_loss_price, Some(group_id)),
                make_stop(id_gen, channel_stop, Some(group_id)),
            ];
            (legs, Some(group_id))
        }
        Protection::SingleStop { stop_price } => {
            (vec![make_stop(id_gen, stop_price, None)], None)
        }
    }
}

/// Registry of live OCO groups.
#[derive(Debug, Default)]
pub struct BracketBook {
    groups: HashMap<BracketGroupId, BracketGroup>,
}

impl BracketBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly created pair.
    pub fn register(&mut self, group: BracketGroup) {
        debug_assert!(
            group.leg_ids.len() == 2,
            "an OCO group pairs exactly two legs"
        );
        self.groups.insert(group.id, group);
    }

    pub fn group(&self, id: BracketGroupId) -> Option<&BracketGroup> {
        self.groups.get(&id)
    }

    pub fn is_live(&self, id: BracketGroupId) -> bool {
        self.groups.contains_key(&id)
    }

    /// The sibling of `order_id` within a live group.
    pub fn sibling(&self, id: BracketGroupId, order_id: OrderId) -> Option<OrderId> {
        self.groups.get(&id).and_then(|g| g.sibling_of(order_id))
    }

    /// Resolve a leg: returns the sibling to cancel and retires the group.
    /// Returns None when the group is already retired (the second leg's
    /// terminal notification arrives after the first resolved it).
    pub fn resolve_leg(&mut self, id: BracketGroupId, order_id: OrderId) -> Option<OrderId> {
        let sibling = self.sibling(id, order_id);
        if sibling.is_some() {
            self.groups.remove(&id);
        }
        sibling
    }

    pub fn live_count(&self) -> usize {
        self.groups.len()
    }
}
