//! Position-target reconciliation — size an order from the delta between a
//! desired signed position and the held one.
//!
//! The plan is pure; driving it through the order manager (cancel any stale
//! outstanding order first, then submit) is `reconcile_position`.

use crate::domain::{IdGen, OrderId, OrderKind, OrderSide};
use crate::engine::broker::Broker;
use crate::engine::order_manager::OrderManager;
use crate::error::EngineError;

/// The order a reconciliation step wants placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderSpec {
    pub side: OrderSide,
    pub quantity: u32,
    pub kind: OrderKind,
}

/// Plan the order that moves `current` toward `target`.
///
/// Capping rule: an order never crosses through flat in one step. Buying
/// against a short covers at most the short; selling against a long sells
/// at most the long. The remaining delta waits for the next reconciliation
/// cycle. (Whether the original intent was risk control or an oversight is
/// unknowable; the behavior is preserved as documented.)
///
/// The limit price is the last price observed at planning time and is
/// deliberately not re-queried at submission — a known staleness window.
pub fn plan(target: i64, current: i64, last_price: f64) -> Result<Option<OrderSpec>, EngineError> {
    if !last_price.is_finite() || last_price <= 0.0 {
        return Err(EngineError::Validation(format!(
            "last price {last_price} is not a usable limit price"
        )));
    }

    let delta = target.checked_sub(current).ok_or_else(|| {
        EngineError::Validation(format!("target {target} - current {current} overflows"))
    })?;
    if delta == 0 {
        return Ok(None);
    }

    let (side, mut quantity) = if delta > 0 {
        (OrderSide::Buy, delta.unsigned_abs())
    } else {
        (OrderSide::Sell, delta.unsigned_abs())
    };

    // Cover-only cap against an opposing position.
    if side == OrderSide::Buy && current < 0 {
        quantity = quantity.min(current.unsigned_abs());
    } else if side == OrderSide::Sell && current > 0 {
        quantity = quantity.min(current.unsigned_abs());
    }

    let quantity = u32::try_from(quantity)
        .map_err(|_| EngineError::Validation(format!("quantity {quantity} exceeds order size")))?;
    if quantity == 0 {
        return Ok(None);
    }

    Ok(Some(OrderSpec {
        side,
        quantity,
        kind: OrderKind::Limit {
            limit_price: last_price,
        },
    }))
}

/// Drive one reconciliation cycle through the order manager.
///
/// A stale target invalidates any in-flight order, so an outstanding order
/// is cancelled — and the cancel confirmed — before the replacement is
/// submitted. If the cancel fails the whole cycle aborts with the error and
/// is retried on the next tick; two live orders are never risked.
pub fn reconcile_position(
    manager: &mut OrderManager,
    broker: &mut dyn Broker,
    id_gen: &mut IdGen,
    target: i64,
    last_price: f64,
    bar_index: usize,
) -> Result<Option<OrderId>, EngineError> {
    manager.cancel_outstanding(broker, "stale target")?;

    let current = manager.position().quantity;
    let spec = match plan(target, current, last_price)? {
        Some(spec) => spec,
        None => return Ok(None),
    };

    manager
        .submit_entry(
            broker,
            id_gen,
            spec.side,
            spec.kind,
            spec.quantity,
            None,
            bar_index,
        )
        .map(Some)
}
