//! In-memory limit order book matching engine plus the realtime
//! orderbook-fanout pipeline that republishes its mutations to subscribed
//! websocket clients.

pub mod activity;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod hub;
pub mod queue;
pub mod replica;
pub mod session;
pub mod wire;

pub mod prelude {
    pub use crate::activity::*;
    pub use crate::config::*;
    pub use crate::dispatcher::*;
    pub use crate::engine::prelude::*;
    pub use crate::hub::*;
    pub use crate::queue::*;
    pub use crate::replica::*;
    pub use crate::wire::*;
}
