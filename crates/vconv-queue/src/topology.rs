//! Broker topology.

use std::fmt;

/// An exchange, a queue and the routing key binding them.
///
/// Exchanges are direct-routed; both exchange and queue are durable and
/// auto-deleted when unused.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topology {
    pub exchange: String,
    pub routing_key: String,
    pub queue: String,
}

impl Topology {
    pub fn new(
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
        queue: impl Into<String>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            queue: queue.into(),
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.exchange, self.routing_key, self.queue)
    }
}
