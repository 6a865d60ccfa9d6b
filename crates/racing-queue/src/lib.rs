//! Broker-agnostic message pump over the race-request processor.
pub mod broker;
pub mod consumer;
pub mod shutdown;

pub use broker::Broker;
pub use broker::Delivery;
pub use broker::InMemoryBroker;
pub use broker::Publisher;
pub use consumer::ConsumerConfig;
pub use consumer::QueueCompletionPublisher;
pub use shutdown::ShutdownSignal;
