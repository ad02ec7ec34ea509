//! Domain types for swinglab.

pub mod bar;
pub mod ids;
pub mod order;
pub mod position;
pub mod trade;

pub use bar::Bar;
pub use ids::{BracketGroupId, IdGen, OrderId, TradeId};
pub use order::{BracketGroup, Order, OrderKind, OrderSide, OrderStatus, TimeInForce};
pub use position::Position;
pub use trade::ClosedTrade;

/// Symbol type alias
pub type Symbol = String;
