//! Environment-driven configuration.
use racing_requests::SeedStrategy;

pub struct Config {
    pub worker_concurrency: usize,
    /// Unacked-delivery budget handed to broker-specific adapters (AMQP
    /// prefetch, Service Bus receive batch size). `InMemoryBroker` is
    /// synchronous pull-one-at-a-time and has no use for it.
    pub prefetch_count: usize,
    pub max_retries: u32,
    pub inbound_queue: String,
    pub outbound_destination: String,
    pub seed_strategy: SeedStrategy,
    pub shutdown_grace: std::time::Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            worker_concurrency: env_or("WORKER_CONCURRENCY", 24),
            prefetch_count: env_or("PREFETCH_COUNT", 48),
            max_retries: env_or("MAX_RETRIES", 3),
            inbound_queue: std::env::var("INBOUND_QUEUE").unwrap_or_else(|_| "race-requests".to_string()),
            outbound_destination: std::env::var("OUTBOUND_DESTINATION").unwrap_or_else(|_| "race-completions".to_string()),
            seed_strategy: seed_strategy_from_env(),
            shutdown_grace: std::time::Duration::from_secs(env_or("SHUTDOWN_GRACE_SECS", 30)),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn seed_strategy_from_env() -> SeedStrategy {
    match std::env::var("RANDOM_SEED_STRATEGY") {
        Ok(ref s) if s == "osEntropy" => SeedStrategy::OsEntropy,
        Ok(ref s) if s.starts_with("fixed:") => SeedStrategy::Fixed(s.trim_start_matches("fixed:").parse().unwrap_or(0)),
        _ => SeedStrategy::PerRequest,
    }
}
