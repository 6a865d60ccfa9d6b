//! Racing service binary.
//!
//! Wires the broker-agnostic consumer to the request processor over a
//! configurable stack of stores. Ships with in-memory reference
//! stores and broker; a production deployment supplies real `RaceStore` /
//! `HorseStore` / `Broker` implementations against its own catalog and
//! message infrastructure.
mod config;
mod logging;
mod mode;

use std::sync::Arc;

use racing_core::horse::Gender;
use racing_core::horse::Horse;
use racing_core::horse::LegType;
use racing_core::race::Race;
use racing_core::race::Surface;
use racing_queue::ConsumerConfig;
use racing_queue::InMemoryBroker;
use racing_queue::Publisher;
use racing_queue::QueueCompletionPublisher;
use racing_queue::ShutdownSignal;
use racing_requests::store::InMemoryHorseStore;
use racing_requests::store::InMemoryRaceStore;
use racing_requests::store::RequestLifecycleStore;
use racing_requests::RequestProcessor;

use crate::config::Config;
use crate::mode::ServiceMode;

/// A handful of races and CPU horses so the reference deployment has
/// something to simulate against. Real deployments replace this with a
/// `RaceStore`/`HorseStore` backed by the actual catalog.
fn demo_catalog() -> (Vec<Race>, Vec<Horse>) {
    let races = vec![
        Race::new(1, "Downs Derby", "Downs", 10.0, Surface::Dirt),
        Race::new(2, "Turf Mile", "Meadowlands", 8.0, Surface::Turf),
        Race::new(3, "Sprint Stakes", "Downs", 5.0, Surface::Dirt),
    ];

    let leg_types = [LegType::StartDash, LegType::FrontRunner, LegType::StretchRunner, LegType::LastSpurt, LegType::RailRunner];
    let horses = (0..40)
        .map(|i| {
            let mut h = Horse::new(format!("Catalog Horse {i}"), Gender::Colt, "bay", leg_types[i % leg_types.len()]);
            h.speed = (40.0 + (i as f64 * 7.0) % 60.0).into();
            h.stamina = (40.0 + (i as f64 * 11.0) % 60.0).into();
            h.agility = (40.0 + (i as f64 * 13.0) % 60.0).into();
            h.durability = (40.0 + (i as f64 * 17.0) % 60.0).into();
            h
        })
        .collect();

    (races, horses)
}

#[cfg(feature = "database")]
async fn request_store() -> Arc<dyn RequestLifecycleStore> {
    if std::env::var("DB_URL").is_ok() {
        let client = racing_requests::pg::connect().await;
        Arc::new(racing_requests::pg::PgRequestStore::new(client))
    } else {
        log::warn!("DB_URL not set; falling back to the in-memory request store");
        Arc::new(racing_requests::store::InMemoryRequestStore::default())
    }
}

#[cfg(not(feature = "database"))]
async fn request_store() -> Arc<dyn RequestLifecycleStore> {
    Arc::new(racing_requests::store::InMemoryRequestStore::default())
}

async fn serve(config: Config) {
    let (races, horses) = demo_catalog();
    let races = Arc::new(InMemoryRaceStore::new(races));
    let horses = Arc::new(InMemoryHorseStore::new(horses));
    let requests = request_store().await;

    let processor = Arc::new(RequestProcessor::new(races, horses, requests, config.seed_strategy));
    let broker = Arc::new(InMemoryBroker::new());
    let completions = Arc::new(QueueCompletionPublisher::new(broker.clone(), config.outbound_destination.clone()));

    let shutdown = ShutdownSignal::new();
    let ctrlc_shutdown = shutdown.clone();
    let grace = config.shutdown_grace;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrlc_shutdown.trigger(grace).await;
        }
    });

    log::info!(
        "serving {} (concurrency {}, max retries {})",
        config.inbound_queue,
        config.worker_concurrency,
        config.max_retries
    );
    racing_queue::consumer::run(
        broker,
        processor,
        completions,
        ConsumerConfig {
            worker_concurrency: config.worker_concurrency,
            max_retries: config.max_retries,
        },
        shutdown,
    )
    .await;
}

async fn replay(config: Config) {
    let requests = request_store().await;
    let broker = Arc::new(InMemoryBroker::new());

    let pending = requests.list_non_complete().await.expect("list non-complete requests");
    let mut replayed = 0usize;
    for mut request in pending {
        if !request.reset_for_replay(chrono::Utc::now()) {
            continue;
        }
        requests.update(request.clone()).await.expect("reset request for replay");

        let message = racing_requests::dto::RaceRequestedMessage {
            correlation_id: racing_core::id::Unique::id(&request),
            race_id: request.race_id,
            horse_id: request.horse_id,
            requested_by: request.owner_id,
            requested_at: chrono::Utc::now(),
        };
        let payload = serde_json::to_vec(&message).expect("serialize replayed request");
        broker.publish(&config.inbound_queue, payload).await.expect("republish replayed request");
        replayed += 1;
    }
    log::info!("replayed {replayed} failed request(s)");
}

#[tokio::main]
async fn main() {
    logging::init();
    let config = Config::from_env();
    match ServiceMode::from_args() {
        ServiceMode::Serve => serve(config).await,
        ServiceMode::Replay => replay(config).await,
    }
}
