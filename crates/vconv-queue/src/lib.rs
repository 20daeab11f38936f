//! AMQP broker plumbing for the conversion worker.
//!
//! This crate provides:
//! - A broker connection whose live handle can be swapped by `reconnect`
//! - Exchange/queue/binding declaration on every publish and consume
//! - A delivery type carrying an acknowledgment capability
//! - A cancellable fixed-delay reconnect loop

pub mod broker;
pub mod delivery;
pub mod error;
pub mod reconnect;
mod slot;
pub mod topology;

pub use broker::{
    BrokerConfig, BrokerConnection, MessageSource, Publisher, DEFAULT_RECONNECT_DELAY,
};
pub use delivery::{Acknowledger, Delivery, DeliveryStream};
pub use error::{QueueError, QueueResult};
pub use reconnect::reconnect_with;
pub use topology::Topology;
