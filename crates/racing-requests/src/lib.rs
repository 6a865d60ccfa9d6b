//! Durable request lifecycle, store contracts, and the idempotent
//! `RaceRequested` → `RaceCompleted` processor.
pub mod dto;
pub mod processor;
pub mod store;

#[cfg(feature = "database")]
pub mod pg;

pub use processor::CompletionPublisher;
pub use processor::ProcessOutcome;
pub use processor::ProcessingContext;
pub use processor::RequestProcessor;
pub use processor::SeedStrategy;
