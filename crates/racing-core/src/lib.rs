//! Core data model, identity types, and error kinds for the racing engine.
pub mod error;
pub mod horse;
pub mod id;
pub mod race;
pub mod request;
pub mod run;

pub use error::Error;
pub use error::Result;
pub use id::Arbitrary;
pub use id::Unique;
pub use id::ID;
