//! Store contracts the engine consumes. Abstract over persistence so the
//! processor never depends on a concrete database.
use std::collections::HashMap;
use std::sync::Mutex;

use racing_core::error::Error;
use racing_core::error::Result;
use racing_core::horse::Horse;
use racing_core::id::ID;
use racing_core::id::Unique;
use racing_core::race::Race;
use racing_core::request::RaceRequest;
use racing_core::run::RaceRun;

/// Read-only race catalog plus the one write the engine performs: handing
/// off a finished `RaceRun`.
#[async_trait::async_trait]
pub trait RaceStore: Send + Sync {
    async fn get_race(&self, catalog_id: u8) -> Result<Race>;
    async fn save_race_run(&self, run: &RaceRun) -> Result<()>;
    /// Used to rebuild a `RaceRunResult` when republishing the completion
    /// of an already-`Completed` request.
    async fn get_race_run(&self, id: ID<RaceRun>) -> Result<RaceRun>;
}

/// Horse catalog: the player's horse, CPU opponent candidates, and the
/// single write path for career counters after a race.
#[async_trait::async_trait]
pub trait HorseStore: Send + Sync {
    async fn get_horse(&self, id: ID<Horse>) -> Result<Horse>;
    /// Candidates within `tolerance` starts of `target_starts`, capped at `limit`.
    async fn list_cpu_candidates(&self, target_starts: u32, tolerance: u32, limit: usize) -> Result<Vec<Horse>>;
    /// Applies each horse's updated `career` counters. Last-writer-wins; no
    /// cross-race locking of a shared horse.
    async fn update_career_counters(&self, horses: &[Horse]) -> Result<()>;
}

/// Durable `correlationId -> RaceRequest` map. `create` is create-if-absent:
/// it fences duplicate deliveries of the same `RaceRequested` message.
#[async_trait::async_trait]
pub trait RequestLifecycleStore: Send + Sync {
    async fn find(&self, correlation_id: ID<RaceRequest>) -> Result<Option<RaceRequest>>;
    /// Returns `true` if this call created the row, `false` if one already existed.
    async fn create(&self, request: RaceRequest) -> Result<bool>;
    async fn update(&self, request: RaceRequest) -> Result<()>;
    /// Requests not yet `Completed`, used by the replay path.
    async fn list_non_complete(&self) -> Result<Vec<RaceRequest>>;
}

/// In-memory `RaceStore` over a fixed catalog, for tests and the reference
/// deployment without a `database` feature.
#[derive(Default)]
pub struct InMemoryRaceStore {
    races: Mutex<HashMap<u8, Race>>,
    runs: Mutex<HashMap<ID<RaceRun>, RaceRun>>,
}

impl InMemoryRaceStore {
    pub fn new(races: Vec<Race>) -> Self {
        Self {
            races: Mutex::new(races.into_iter().map(|r| (r.catalog_id, r)).collect()),
            runs: Mutex::new(HashMap::new()),
        }
    }

    pub fn saved_runs(&self) -> Vec<RaceRun> {
        self.runs.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait::async_trait]
impl RaceStore for InMemoryRaceStore {
    async fn get_race(&self, catalog_id: u8) -> Result<Race> {
        self.races
            .lock()
            .unwrap()
            .get(&catalog_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("race {catalog_id}")))
    }

    async fn save_race_run(&self, run: &RaceRun) -> Result<()> {
        self.runs.lock().unwrap().insert(run.id(), run.clone());
        Ok(())
    }

    async fn get_race_run(&self, id: ID<RaceRun>) -> Result<RaceRun> {
        self.runs.lock().unwrap().get(&id).cloned().ok_or_else(|| Error::NotFound(format!("race run {id}")))
    }
}

/// In-memory `HorseStore` keyed by `ID<Horse>`.
#[derive(Default)]
pub struct InMemoryHorseStore {
    horses: Mutex<HashMap<ID<Horse>, Horse>>,
}

impl InMemoryHorseStore {
    pub fn new(horses: Vec<Horse>) -> Self {
        Self {
            horses: Mutex::new(horses.into_iter().map(|h| (h.id(), h)).collect()),
        }
    }
}

#[async_trait::async_trait]
impl HorseStore for InMemoryHorseStore {
    async fn get_horse(&self, id: ID<Horse>) -> Result<Horse> {
        self.horses.lock().unwrap().get(&id).cloned().ok_or_else(|| Error::NotFound(format!("horse {id}")))
    }

    async fn list_cpu_candidates(&self, target_starts: u32, tolerance: u32, limit: usize) -> Result<Vec<Horse>> {
        let horses = self.horses.lock().unwrap();
        let mut candidates: Vec<Horse> = horses
            .values()
            .filter(|h| !h.retired)
            .filter(|h| h.career.starts.abs_diff(target_starts) <= tolerance)
            .cloned()
            .collect();
        candidates.sort_by_key(|h| h.id());
        candidates.truncate(limit);
        Ok(candidates)
    }

    async fn update_career_counters(&self, horses: &[Horse]) -> Result<()> {
        let mut store = self.horses.lock().unwrap();
        for horse in horses {
            store.insert(horse.id(), horse.clone());
        }
        Ok(())
    }
}

/// In-memory `RequestLifecycleStore`, the reference implementation used by
/// tests and by the service when `database` is disabled.
#[derive(Default)]
pub struct InMemoryRequestStore {
    requests: Mutex<HashMap<ID<RaceRequest>, RaceRequest>>,
}

#[async_trait::async_trait]
impl RequestLifecycleStore for InMemoryRequestStore {
    async fn find(&self, correlation_id: ID<RaceRequest>) -> Result<Option<RaceRequest>> {
        Ok(self.requests.lock().unwrap().get(&correlation_id).cloned())
    }

    async fn create(&self, request: RaceRequest) -> Result<bool> {
        let mut store = self.requests.lock().unwrap();
        if store.contains_key(&request.id()) {
            Ok(false)
        } else {
            store.insert(request.id(), request);
            Ok(true)
        }
    }

    async fn update(&self, request: RaceRequest) -> Result<()> {
        self.requests.lock().unwrap().insert(request.id(), request);
        Ok(())
    }

    async fn list_non_complete(&self) -> Result<Vec<RaceRequest>> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.status != racing_core::request::RequestStatus::Completed)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use racing_core::horse::Gender;
    use racing_core::horse::LegType;
    use racing_core::race::Surface;

    #[tokio::test]
    async fn race_store_round_trips_by_catalog_id() {
        let race = Race::new(7, "Derby", "Downs", 10.0, Surface::Dirt);
        let store = InMemoryRaceStore::new(vec![race]);
        assert!(store.get_race(7).await.is_ok());
        assert!(matches!(store.get_race(9).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn request_store_create_is_idempotent_per_correlation_id() {
        let store = InMemoryRequestStore::default();
        let req = RaceRequest::new(ID::default(), 1, ID::default(), ID::default(), chrono::DateTime::UNIX_EPOCH);
        assert!(store.create(req.clone()).await.unwrap());
        assert!(!store.create(req).await.unwrap());
    }

    #[tokio::test]
    async fn horse_store_filters_cpu_candidates_by_tolerance_and_retirement() {
        let mut near = Horse::new("Near", Gender::Colt, "bay", LegType::FrontRunner);
        near.career.starts = 10;
        let mut far = Horse::new("Far", Gender::Colt, "bay", LegType::FrontRunner);
        far.career.starts = 100;
        let mut out = Horse::new("Retired", Gender::Colt, "bay", LegType::FrontRunner);
        out.career.starts = 10;
        out.retired = true;

        let store = InMemoryHorseStore::new(vec![near, far, out]);
        let candidates = store.list_cpu_candidates(10, 5, 10).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Near");
    }
}
