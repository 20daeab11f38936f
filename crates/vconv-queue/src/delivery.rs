//! Inbound deliveries.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use lapin::options::{BasicAckOptions, BasicNackOptions};

use crate::error::{QueueError, QueueResult};

/// Stream of deliveries from one consumer.
///
/// Ends when the underlying channel or connection closes; it cannot be
/// resumed, only recreated with a fresh `consume` call.
pub type DeliveryStream = Pin<Box<dyn Stream<Item = QueueResult<Delivery>> + Send>>;

/// Settles a delivery with the broker.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn ack(&self) -> QueueResult<()>;

    async fn nack(&self, requeue: bool) -> QueueResult<()>;
}

struct AmqpAcker(lapin::acker::Acker);

#[async_trait]
impl Acknowledger for AmqpAcker {
    async fn ack(&self) -> QueueResult<()> {
        self.0
            .ack(BasicAckOptions::default())
            .await
            .map_err(|e| QueueError::ack(e.to_string()))
    }

    async fn nack(&self, requeue: bool) -> QueueResult<()> {
        self.0
            .nack(BasicNackOptions {
                requeue,
                ..Default::default()
            })
            .await
            .map_err(|e| QueueError::ack(e.to_string()))
    }
}

/// One message received from a queue.
///
/// Settling consumes the delivery, so it can be acknowledged at most once.
pub struct Delivery {
    body: Vec<u8>,
    delivery_tag: u64,
    redelivered: bool,
    acker: Box<dyn Acknowledger>,
}

impl Delivery {
    pub fn new(
        body: impl Into<Vec<u8>>,
        delivery_tag: u64,
        redelivered: bool,
        acker: impl Acknowledger + 'static,
    ) -> Self {
        Self {
            body: body.into(),
            delivery_tag,
            redelivered,
            acker: Box::new(acker),
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }

    /// Whether the broker has delivered this message before.
    pub fn redelivered(&self) -> bool {
        self.redelivered
    }

    pub async fn ack(self) -> QueueResult<()> {
        self.acker.ack().await
    }

    pub async fn nack(self, requeue: bool) -> QueueResult<()> {
        self.acker.nack(requeue).await
    }
}

impl From<lapin::message::Delivery> for Delivery {
    fn from(delivery: lapin::message::Delivery) -> Self {
        Self {
            body: delivery.data,
            delivery_tag: delivery.delivery_tag,
            redelivered: delivery.redelivered,
            acker: Box::new(AmqpAcker(delivery.acker)),
        }
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("delivery_tag", &self.delivery_tag)
            .field("redelivered", &self.redelivered)
            .field("body_len", &self.body.len())
            .finish()
    }
}
