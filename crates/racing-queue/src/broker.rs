//! Broker-agnostic delivery contract. Any queue technology plugs in by
//! implementing [`Broker`] and [`Publisher`]; the consumer loop never
//! depends on a concrete transport.
use std::collections::VecDeque;
use std::sync::Mutex;

use racing_core::error::Result;

/// One undelivered-or-redelivered message, with the redelivery count the
/// retry budget is measured against.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub id: uuid::Uuid,
    pub payload: Vec<u8>,
    pub delivery_count: u32,
}

/// Inbound side: `race-requests`. One `receive` per idle worker; ack/nack
/// resolve exactly one prior `receive`.
#[async_trait::async_trait]
pub trait Broker: Send + Sync {
    /// Returns `None` once the queue is closed and drained; workers exit.
    async fn receive(&self) -> Option<Delivery>;
    async fn ack(&self, delivery: &Delivery);
    async fn nack(&self, delivery: &Delivery, requeue: bool);
    async fn dead_letter(&self, delivery: &Delivery, reason: String);
}

/// Outbound side: publishes to a named destination (`race-completions`).
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, destination: &str, payload: Vec<u8>) -> Result<()>;
}

/// In-memory `Broker` and `Publisher`, the reference implementation used by
/// tests and by the service without a configured external queue.
#[derive(Default)]
pub struct InMemoryBroker {
    queue: Mutex<VecDeque<Delivery>>,
    dead_letters: Mutex<Vec<(Delivery, String)>>,
    published: Mutex<Vec<(String, Vec<u8>)>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, payload: Vec<u8>) {
        self.queue.lock().unwrap().push_back(Delivery {
            id: uuid::Uuid::now_v7(),
            payload,
            delivery_count: 1,
        });
    }

    pub fn dead_letters(&self) -> Vec<(Delivery, String)> {
        self.dead_letters.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().unwrap().is_empty()
    }
}

#[async_trait::async_trait]
impl Broker for InMemoryBroker {
    async fn receive(&self) -> Option<Delivery> {
        self.queue.lock().unwrap().pop_front()
    }

    async fn ack(&self, _delivery: &Delivery) {}

    async fn nack(&self, delivery: &Delivery, requeue: bool) {
        if requeue {
            let mut redelivered = delivery.clone();
            redelivered.delivery_count += 1;
            self.queue.lock().unwrap().push_back(redelivered);
        }
    }

    async fn dead_letter(&self, delivery: &Delivery, reason: String) {
        self.dead_letters.lock().unwrap().push((delivery.clone(), reason));
    }
}

#[async_trait::async_trait]
impl Publisher for InMemoryBroker {
    async fn publish(&self, destination: &str, payload: Vec<u8>) -> Result<()> {
        self.published.lock().unwrap().push((destination.to_string(), payload));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn nack_with_requeue_redelivers_with_an_incremented_count() {
        let broker = InMemoryBroker::new();
        broker.enqueue(b"hello".to_vec());
        let delivery = broker.receive().await.unwrap();
        broker.nack(&delivery, true).await;

        let redelivered = broker.receive().await.unwrap();
        assert_eq!(redelivered.delivery_count, 2);
    }

    #[tokio::test]
    async fn nack_without_requeue_drops_the_message() {
        let broker = InMemoryBroker::new();
        broker.enqueue(b"hello".to_vec());
        let delivery = broker.receive().await.unwrap();
        broker.nack(&delivery, false).await;
        assert!(broker.is_empty());
    }

    #[tokio::test]
    async fn dead_lettering_records_the_reason() {
        let broker = InMemoryBroker::new();
        broker.enqueue(b"hello".to_vec());
        let delivery = broker.receive().await.unwrap();
        broker.dead_letter(&delivery, "boom".to_string()).await;
        assert_eq!(broker.dead_letters()[0].1, "boom");
    }
}
