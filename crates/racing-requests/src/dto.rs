//! Wire DTOs exchanged with the broker.
use racing_core::horse::Horse;
use racing_core::id::ID;
use racing_core::run::RaceRun;
use racing_core::run::RaceRunResult;

/// Inbound request to simulate one race for one horse, carried on the
/// `race-requests` queue. `correlationId` is the durable `RaceRequest`'s id.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceRequestedMessage {
    pub correlation_id: ID<racing_core::request::RaceRequest>,
    pub race_id: u8,
    pub horse_id: ID<Horse>,
    pub requested_by: ID<()>,
    pub requested_at: chrono::DateTime<chrono::Utc>,
}

/// Outbound notification published to `race-completions` once a race
/// finishes and its lifecycle record is marked `Completed`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceCompletedMessage {
    pub correlation_id: ID<racing_core::request::RaceRequest>,
    pub race_run_id: ID<RaceRun>,
    pub race_id: u8,
    pub race_name: String,
    pub winner_horse_id: ID<Horse>,
    pub winner_name: String,
    pub winner_time: f64,
    pub field_size: usize,
    pub result: RaceRunResult,
}

impl RaceCompletedMessage {
    pub fn from_result(correlation_id: ID<racing_core::request::RaceRequest>, race_id: u8, result: &RaceRunResult) -> Self {
        let winner = result.horse_results.iter().find(|h| h.place == 1).expect("a completed race has exactly one winner");
        Self {
            correlation_id,
            race_run_id: result.race_run_id,
            race_id,
            race_name: result.race_name.clone(),
            winner_horse_id: winner.horse_id,
            winner_name: winner.horse_name.clone(),
            winner_time: winner.time,
            field_size: result.horse_results.len(),
            result: result.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn race_requested_round_trips_through_json() {
        let msg = RaceRequestedMessage {
            correlation_id: ID::default(),
            race_id: 1,
            horse_id: ID::default(),
            requested_by: ID::default(),
            requested_at: chrono::DateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"correlationId\""));
        assert!(json.contains("\"raceId\":1"));
        let back: RaceRequestedMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.correlation_id, msg.correlation_id);
    }
}
