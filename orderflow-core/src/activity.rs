//! Bridges committed book mutations to the websocket-facing activity
//! stream. This is the concrete realization of the `§9` migration from
//! ad hoc plugin callbacks to a typed observer: `ActivityCollector` is a
//! `BookObserver` that turns every insert/remove/change into a level-2
//! update `ChannelMessage`, buffered per market-handler call and drained
//! by the dispatcher once the call returns.

use crate::engine::observer::BookObserver;
use crate::engine::types::Order;
use crate::wire::{ChannelMessage, ChannelPayload, market_channel_id};
use parking_lot::Mutex;
use rust_decimal::Decimal;

#[derive(Default)]
pub struct ActivityCollector {
    buffer: Mutex<Vec<ChannelMessage>>,
}

impl ActivityCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes every buffered message, leaving the collector empty for the
    /// next call.
    pub fn drain(&self) -> Vec<ChannelMessage> {
        std::mem::take(&mut *self.buffer.lock())
    }

    fn push(&self, order: &Order, sequence: u64, delta: Decimal) {
        self.buffer.lock().push(ChannelMessage {
            channel_id: market_channel_id(&order.market_id),
            payload: ChannelPayload::Level2Update {
                sequence,
                side: order.side,
                price: order.price,
                amount: delta,
            },
        });
    }
}

impl BookObserver for ActivityCollector {
    fn on_insert(&self, sequence: u64, order: &Order) {
        self.push(order, sequence, order.amount());
    }

    fn on_remove(&self, sequence: u64, order: &Order, removed_amount: Decimal) {
        self.push(order, sequence, -removed_amount);
    }

    fn on_change(&self, sequence: u64, order: &Order, delta: Decimal) {
        self.push(order, sequence, delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{MarketId, OrderKind, Side};

    fn order(id: &str, market_id: &MarketId, side: Side, price: &str, amount: &str) -> Order {
        Order::new(
            id.to_string(),
            market_id.clone(),
            side,
            OrderKind::Limit,
            "trader".to_string(),
            price.parse().unwrap(),
            amount.parse().unwrap(),
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            0,
        )
    }

    #[test]
    fn drain_empties_buffer_and_preserves_emission_order() {
        let collector = ActivityCollector::new();
        let market_id = "ETH-DAI".to_string();
        let o1 = order("o1", &market_id, Side::Buy, "1.2", "3.4");
        let o2 = order("o2", &market_id, Side::Buy, "1.3", "1");
        collector.on_insert(1, &o1);
        collector.on_insert(2, &o2);
        collector.on_remove(3, &o1, Decimal::new(34, 1));

        let drained = collector.drain();
        assert_eq!(drained.len(), 3);
        assert!(collector.drain().is_empty());
        match &drained[2].payload {
            ChannelPayload::Level2Update { sequence, amount, .. } => {
                assert_eq!(*sequence, 3);
                assert_eq!(*amount, Decimal::new(-34, 1));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }
}
