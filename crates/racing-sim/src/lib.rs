//! Pure race physics and the tick-loop executor.
pub mod commentary;
pub mod events;
pub mod executor;
pub mod modifier;
pub mod overtaking;
pub mod stamina;
pub mod traffic;

pub use executor::rebuild_result;
pub use executor::select_opponents;
pub use executor::CancellationToken;
pub use executor::RaceExecutor;
