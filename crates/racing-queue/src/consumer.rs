//! Worker-pool message pump: N cooperative workers, each owning one
//! delivery at a time, draining `broker` until it closes or shutdown fires.
use std::sync::Arc;

use racing_requests::dto::RaceRequestedMessage;
use racing_requests::store::HorseStore;
use racing_requests::store::RaceStore;
use racing_requests::store::RequestLifecycleStore;
use racing_requests::CompletionPublisher;
use racing_requests::ProcessOutcome;
use racing_requests::ProcessingContext;
use racing_requests::RequestProcessor;

use crate::broker::Broker;
use crate::shutdown::ShutdownSignal;

/// Worker count and retry budget: `workerConcurrency` default 24,
/// `maxRetries` default 3.
#[derive(Debug, Clone, Copy)]
pub struct ConsumerConfig {
    pub worker_concurrency: usize,
    pub max_retries: u32,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            worker_concurrency: 24,
            max_retries: 3,
        }
    }
}

/// Runs the pool to completion: returns once every worker's `receive` call
/// returns `None` (queue closed) or `shutdown.stop_accepting` fires.
pub async fn run<RS, HS, LS, B>(
    broker: Arc<B>,
    processor: Arc<RequestProcessor<RS, HS, LS>>,
    completions: Arc<dyn CompletionPublisher>,
    config: ConsumerConfig,
    shutdown: ShutdownSignal,
) where
    RS: RaceStore + ?Sized + 'static,
    HS: HorseStore + ?Sized + 'static,
    LS: RequestLifecycleStore + ?Sized + 'static,
    B: Broker + 'static,
{
    let workers = (0..config.worker_concurrency).map(|worker_id| {
        let broker = broker.clone();
        let processor = processor.clone();
        let completions = completions.clone();
        let shutdown = shutdown.clone();
        async move { worker_loop(worker_id, broker, processor, completions, config, shutdown).await }
    });
    futures::future::join_all(workers).await;
}

async fn worker_loop<RS, HS, LS, B>(
    worker_id: usize,
    broker: Arc<B>,
    processor: Arc<RequestProcessor<RS, HS, LS>>,
    completions: Arc<dyn CompletionPublisher>,
    config: ConsumerConfig,
    shutdown: ShutdownSignal,
) where
    RS: RaceStore + ?Sized,
    HS: HorseStore + ?Sized,
    LS: RequestLifecycleStore + ?Sized,
    B: Broker,
{
    loop {
        if shutdown.stop_accepting.is_cancelled() {
            log::info!("worker {worker_id} stopping: no longer accepting new messages");
            return;
        }
        let Some(delivery) = broker.receive().await else {
            return;
        };

        match serde_json::from_slice::<RaceRequestedMessage>(&delivery.payload) {
            Err(e) => {
                log::warn!("worker {worker_id} dead-lettering undecodable message: {e}");
                broker.dead_letter(&delivery, format!("decode error: {e}")).await;
            }
            Ok(msg) => {
                let ctx = ProcessingContext {
                    cancel: shutdown.abort_inflight.clone(),
                    delivery_count: delivery.delivery_count,
                };
                match processor.process(msg, &ctx, completions.as_ref()).await {
                    ProcessOutcome::Succeeded => broker.ack(&delivery).await,
                    ProcessOutcome::Failed { requeue: true, reason } if delivery.delivery_count < config.max_retries => {
                        log::info!("worker {worker_id} requeuing after failure: {reason}");
                        broker.nack(&delivery, true).await;
                    }
                    ProcessOutcome::Failed { reason, .. } => {
                        log::warn!("worker {worker_id} dead-lettering after exhausting retries: {reason}");
                        broker.dead_letter(&delivery, reason).await;
                    }
                }
            }
        }
    }
}

/// Adapts a [`Publisher`](crate::broker::Publisher) to the
/// [`CompletionPublisher`] contract `RequestProcessor` expects, JSON-encoding
/// onto a fixed destination.
pub struct QueueCompletionPublisher<P> {
    publisher: Arc<P>,
    destination: String,
}

impl<P> QueueCompletionPublisher<P> {
    pub fn new(publisher: Arc<P>, destination: impl Into<String>) -> Self {
        Self {
            publisher,
            destination: destination.into(),
        }
    }
}

#[async_trait::async_trait]
impl<P: crate::broker::Publisher> CompletionPublisher for QueueCompletionPublisher<P> {
    async fn publish(&self, message: racing_requests::dto::RaceCompletedMessage) -> racing_core::error::Result<()> {
        let payload = serde_json::to_vec(&message).map_err(|e| racing_core::error::Error::Invariant(e.to_string()))?;
        self.publisher.publish(&self.destination, payload).await
    }
}

#[cfg(test)]
mod tests {
    use racing_core::horse::Gender;
    use racing_core::horse::Horse;
    use racing_core::horse::LegType;
    use racing_core::id::ID;
    use racing_core::race::Race;
    use racing_core::race::Surface;
    use racing_requests::store::InMemoryHorseStore;
    use racing_requests::store::InMemoryRaceStore;
    use racing_requests::store::InMemoryRequestStore;
    use racing_requests::SeedStrategy;

    use super::*;
    use crate::broker::InMemoryBroker;

    fn horse(name: &str) -> Horse {
        let mut h = Horse::new(name, Gender::Colt, "bay", LegType::LastSpurt);
        h.speed = 65.0.into();
        h.stamina = 65.0.into();
        h.agility = 55.0.into();
        h.durability = 55.0.into();
        h
    }

    #[tokio::test]
    async fn drains_the_queue_and_publishes_one_completion_per_request() {
        let race = Race::new(1, "Derby", "Downs", 8.0, Surface::Dirt);
        let races = Arc::new(InMemoryRaceStore::new(vec![race]));

        let player = horse("Player");
        let player_id = player.id();
        let mut pool = vec![player];
        for i in 0..15 {
            pool.push(horse(&format!("Rival {i}")));
        }
        let horses = Arc::new(InMemoryHorseStore::new(pool));
        let requests = Arc::new(InMemoryRequestStore::default());
        let processor = Arc::new(RequestProcessor::new(races, horses, requests, SeedStrategy::PerRequest));

        let broker = Arc::new(InMemoryBroker::new());
        let msg = RaceRequestedMessage {
            correlation_id: ID::default(),
            race_id: 1,
            horse_id: player_id,
            requested_by: ID::default(),
            requested_at: chrono::Utc::now(),
        };
        broker.enqueue(serde_json::to_vec(&msg).unwrap());

        let completions: Arc<dyn CompletionPublisher> = Arc::new(QueueCompletionPublisher::new(broker.clone(), "race-completions"));
        let config = ConsumerConfig {
            worker_concurrency: 4,
            max_retries: 3,
        };
        let shutdown = ShutdownSignal::new();
        run(broker.clone(), processor, completions, config, shutdown).await;

        assert_eq!(broker.published().len(), 1);
        assert_eq!(broker.published()[0].0, "race-completions");
    }

    #[tokio::test]
    async fn undecodable_payload_is_dead_lettered_without_touching_the_processor() {
        let races = Arc::new(InMemoryRaceStore::new(vec![]));
        let horses = Arc::new(InMemoryHorseStore::new(vec![]));
        let requests = Arc::new(InMemoryRequestStore::default());
        let processor = Arc::new(RequestProcessor::new(races, horses, requests, SeedStrategy::Fixed(1)));

        let broker = Arc::new(InMemoryBroker::new());
        broker.enqueue(b"not json".to_vec());
        let completions: Arc<dyn CompletionPublisher> = Arc::new(QueueCompletionPublisher::new(broker.clone(), "race-completions"));
        let shutdown = ShutdownSignal::new();
        run(
            broker.clone(),
            processor,
            completions,
            ConsumerConfig {
                worker_concurrency: 2,
                max_retries: 3,
            },
            shutdown,
        )
        .await;

        assert_eq!(broker.dead_letters().len(), 1);
    }
}
