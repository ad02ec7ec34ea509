//! Live reconciliation — blocking broker calls from the decision path.
//!
//! Every network call is wrapped in bounded exponential backoff
//! (`RetryingBroker`). Each symbol's state sits behind its own mutex so two
//! externally-triggered reconciliations can never race on the
//! outstanding-order slot. A submit that fails in transit leaves the order
//! state unknown; the next cycle re-queries the broker-side position and
//! adopts it as ground truth before planning.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use backoff::{retry, Error as BackoffError, ExponentialBackoff, ExponentialBackoffBuilder};
use tracing::warn;

use crate::domain::{IdGen, Order, OrderId, Symbol};
use crate::engine::broker::{Broker, BrokerError};
use crate::engine::event::BrokerEvent;
use crate::engine::order_manager::{OrderManager, StrategyState};
use crate::engine::reconcile::reconcile_position;
use crate::error::EngineError;

/// Wraps a broker so every call retries transient failures with bounded
/// exponential backoff. Rejections are permanent and surface immediately.
pub struct RetryingBroker<B> {
    inner: B,
    initial_interval: Duration,
    max_elapsed: Duration,
}

impl<B: Broker> RetryingBroker<B> {
    pub fn new(inner: B) -> Self {
        Self::with_policy(inner, Duration::from_millis(250), Duration::from_secs(5))
    }

    pub fn with_policy(inner: B, initial_interval: Duration, max_elapsed: Duration) -> Self {
        Self {
            inner,
            initial_interval,
            max_elapsed,
        }
    }

    fn policy(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_elapsed_time(Some(self.max_elapsed))
            .build()
    }
}

fn classify(err: BrokerError) -> BackoffError<BrokerError> {
    if err.is_retryable() {
        BackoffError::transient(err)
    } else {
        BackoffError::permanent(err)
    }
}

fn unwrap_backoff(err: BackoffError<BrokerError>) -> BrokerError {
    match err {
        BackoffError::Permanent(e) => e,
        BackoffError::Transient { err, .. } => err,
    }
}

impl<B: Broker> Broker for RetryingBroker<B> {
    fn submit_order(&mut self, order: &Order) -> Result<(), BrokerError> {
        let policy = self.policy();
        let inner = &mut self.inner;
        retry(policy, || inner.submit_order(order).map_err(classify)).map_err(unwrap_backoff)
    }

    fn cancel_order(&mut self, order_id: OrderId) -> Result<(), BrokerError> {
        let policy = self.policy();
        let inner = &mut self.inner;
        retry(policy, || inner.cancel_order(order_id).map_err(classify)).map_err(unwrap_backoff)
    }

    fn position(&self, symbol: &str) -> Result<i64, BrokerError> {
        let policy = self.policy();
        retry(policy, || self.inner.position(symbol).map_err(classify)).map_err(unwrap_backoff)
    }
}

struct SymbolSlot {
    manager: OrderManager,
    id_gen: IdGen,
    last_price: Option<f64>,
    /// Set when a network failure may have left an order broker-side that
    /// the local table does not know about.
    state_unknown: bool,
}

/// Target-quantity reconciliation against a live broker.
pub struct LiveReconciler<B> {
    broker: Mutex<B>,
    slots: Mutex<HashMap<Symbol, Arc<Mutex<SymbolSlot>>>>,
}

impl<B: Broker> LiveReconciler<B> {
    pub fn new(broker: B) -> Self {
        Self {
            broker: Mutex::new(broker),
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, symbol: &str) -> Arc<Mutex<SymbolSlot>> {
        let mut slots = self.slots.lock().expect("slot map poisoned");
        slots
            .entry(symbol.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(SymbolSlot {
                    manager: OrderManager::new(symbol),
                    id_gen: IdGen::new(),
                    last_price: None,
                    state_unknown: false,
                }))
            })
            .clone()
    }

    /// Record the latest observed trade/close price for a symbol. The next
    /// reconciliation prices its limit order here.
    pub fn observe_price(&self, symbol: &str, price: f64) {
        let slot = self.slot(symbol);
        let mut slot = slot.lock().expect("symbol slot poisoned");
        slot.last_price = Some(price);
    }

    /// Current per-symbol strategy state, if the symbol has been touched.
    pub fn state(&self, symbol: &str) -> Option<StrategyState> {
        let slots = self.slots.lock().expect("slot map poisoned");
        slots
            .get(symbol)
            .map(|s| s.lock().expect("symbol slot poisoned").manager.state())
    }

    /// Route one broker notification to the owning symbol's manager.
    pub fn handle_event(&self, symbol: &str, event: &BrokerEvent) -> Result<(), EngineError> {
        let slot = self.slot(symbol);
        let mut slot = slot.lock().expect("symbol slot poisoned");
        let mut broker = self.broker.lock().expect("broker poisoned");
        let SymbolSlot {
            manager, id_gen, ..
        } = &mut *slot;
        manager.on_event(&mut *broker, id_gen, event, 0)
    }

    /// Re-query the broker-side position and adopt it as ground truth.
    pub fn resync(&self, symbol: &str) -> Result<i64, EngineError> {
        let slot = self.slot(symbol);
        let mut slot = slot.lock().expect("symbol slot poisoned");
        let broker = self.broker.lock().expect("broker poisoned");
        let broker_qty = broker
            .position(symbol)
            .map_err(|e| EngineError::Network(e.to_string()))?;
        if broker_qty != slot.manager.position().quantity {
            warn!(
                symbol,
                local = slot.manager.position().quantity,
                broker = broker_qty,
                "resync found stale local position"
            );
        }
        slot.manager.adopt_broker_position(broker_qty);
        slot.state_unknown = false;
        Ok(broker_qty)
    }

    /// One reconciliation cycle: resync if state is suspect, cancel any
    /// stale outstanding order (confirming first), then submit the capped
    /// delta as a limit order at the last observed price.
    pub fn reconcile(&self, symbol: &str, target: i64) -> Result<Option<OrderId>, EngineError> {
        let slot_arc = self.slot(symbol);
        let mut slot = slot_arc.lock().expect("symbol slot poisoned");
        let mut broker = self.broker.lock().expect("broker poisoned");

        if slot.state_unknown {
            let broker_qty = broker
                .position(symbol)
                .map_err(|e| EngineError::Network(e.to_string()))?;
            slot.manager.adopt_broker_position(broker_qty);
            slot.state_unknown = false;
        }

        let last_price = slot.last_price.ok_or_else(|| {
            EngineError::Validation(format!("no observed price for {symbol}"))
        })?;

        let SymbolSlot {
            manager,
            id_gen,
            state_unknown,
            ..
        } = &mut *slot;
        let result = reconcile_position(manager, &mut *broker, id_gen, target, last_price, 0);

        if let Err(EngineError::Network(_)) = &result {
            // The call may have landed broker-side; trust nothing local
            // until the next cycle re-queries.
            *state_unknown = true;
        }
        result
    }
}
