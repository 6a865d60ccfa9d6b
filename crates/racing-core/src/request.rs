use crate::horse::Horse;
use crate::id::Unique;
use crate::id::ID;
use crate::run::RaceRun;

/// Lifecycle state of a [`RaceRequest`]. Monotone except that
/// `Failed -> Pending` is permitted on explicit replay; `Completed` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// Durable record of one race simulation request.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RaceRequest {
    id: ID<RaceRequest>,
    pub race_id: u8,
    pub horse_id: ID<Horse>,
    pub owner_id: ID<()>,
    pub status: RequestStatus,
    pub race_run_id: Option<ID<RaceRun>>,
    pub failure_reason: Option<String>,
    pub created: chrono::DateTime<chrono::Utc>,
    pub updated: chrono::DateTime<chrono::Utc>,
    pub processed: Option<chrono::DateTime<chrono::Utc>>,
}

impl RaceRequest {
    pub fn new(id: ID<RaceRequest>, race_id: u8, horse_id: ID<Horse>, owner_id: ID<()>, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            id,
            race_id,
            horse_id,
            owner_id,
            status: RequestStatus::Pending,
            race_run_id: None,
            failure_reason: None,
            created: now,
            updated: now,
            processed: None,
        }
    }

    pub fn mark_in_progress(&mut self, now: chrono::DateTime<chrono::Utc>) {
        if self.status == RequestStatus::Pending || self.status == RequestStatus::Failed {
            self.status = RequestStatus::InProgress;
            self.updated = now;
        }
    }

    pub fn mark_completed(&mut self, race_run_id: ID<RaceRun>, now: chrono::DateTime<chrono::Utc>) {
        self.status = RequestStatus::Completed;
        self.race_run_id = Some(race_run_id);
        self.failure_reason = None;
        self.updated = now;
        self.processed = Some(now);
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>, now: chrono::DateTime<chrono::Utc>) {
        self.status = RequestStatus::Failed;
        self.failure_reason = Some(reason.into());
        self.updated = now;
        self.processed = Some(now);
    }

    /// Flips a Failed request back to Pending for the replay path.
    /// Completed requests are never replayed.
    pub fn reset_for_replay(&mut self, now: chrono::DateTime<chrono::Utc>) -> bool {
        if self.status == RequestStatus::Failed {
            self.status = RequestStatus::Pending;
            self.failure_reason = None;
            self.updated = now;
            true
        } else {
            false
        }
    }
}

impl Unique<RaceRequest> for RaceRequest {
    fn id(&self) -> ID<RaceRequest> {
        self.id
    }
}
