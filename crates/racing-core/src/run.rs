use crate::horse::Horse;
use crate::id::Unique;
use crate::id::ID;
use crate::race::Condition;
use crate::race::Race;

/// Per-race state for one participant. `lane` and `distance` evolve
/// tick by tick; `time` and `place` are set exactly once, at the finish.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RaceRunHorse {
    pub horse_id: ID<Horse>,
    pub lane: usize,
    pub distance: f64,
    pub initial_stamina: f64,
    pub current_stamina: f64,
    pub ticks_since_last_lane_change: u32,
    pub speed_penalty_ticks_remaining: u32,
    /// Distance covered on the most recently completed tick; used to
    /// estimate "leader speed" for the traffic-response ceiling.
    pub last_tick_speed: f64,
    pub time: Option<f64>,
    pub place: Option<usize>,
}

impl RaceRunHorse {
    pub fn new(horse_id: ID<Horse>, lane: usize, stamina_pool: f64) -> Self {
        Self {
            horse_id,
            lane,
            distance: 0.0,
            initial_stamina: stamina_pool,
            current_stamina: stamina_pool,
            ticks_since_last_lane_change: 10, // ready to change immediately
            speed_penalty_ticks_remaining: 0,
            last_tick_speed: 0.0,
            time: None,
            place: None,
        }
    }

    pub fn finished(&self) -> bool {
        self.time.is_some()
    }

    pub fn progress(&self, furlongs: f64) -> f64 {
        (self.distance / furlongs).min(1.0)
    }

    pub fn has_speed_penalty(&self) -> bool {
        self.speed_penalty_ticks_remaining > 0
    }
}

/// Snapshot of one horse's (lane, distance) at a tick, used by the event
/// detector to diff consecutive ticks.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct HorseSnapshot {
    pub horse_id: ID<Horse>,
    pub lane: usize,
    pub distance: f64,
    pub place: Option<usize>,
}

impl From<&RaceRunHorse> for HorseSnapshot {
    fn from(h: &RaceRunHorse) -> Self {
        Self {
            horse_id: h.horse_id,
            lane: h.lane,
            distance: h.distance,
            place: h.place,
        }
    }
}

/// One discrete simulation step. Ticks are numbered 1..T in arrival
/// order.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RaceRunTick {
    pub tick: u32,
    pub snapshots: Vec<HorseSnapshot>,
    pub commentary: String,
}

/// One execution of a [`Race`]. Created atomically on completion;
/// never mutated thereafter.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RaceRun {
    id: ID<RaceRun>,
    pub race_id: ID<Race>,
    pub condition: Condition,
    pub horses: Vec<RaceRunHorse>,
    pub ticks: Vec<RaceRunTick>,
}

impl RaceRun {
    pub fn new(race_id: ID<Race>, condition: Condition, horses: Vec<RaceRunHorse>) -> Self {
        Self {
            id: ID::default(),
            race_id,
            condition,
            horses,
            ticks: Vec::new(),
        }
    }

    /// Overrides the generated id. Used by the request processor to pin a
    /// run's identity to its `correlationId` so a retried request upserts
    /// the same row instead of minting a second `RaceRun`.
    pub fn with_id(mut self, id: ID<RaceRun>) -> Self {
        self.id = id;
        self
    }

    pub fn horse_mut(&mut self, horse_id: ID<Horse>) -> Option<&mut RaceRunHorse> {
        self.horses.iter_mut().find(|h| h.horse_id == horse_id)
    }

    pub fn all_finished(&self) -> bool {
        self.horses.iter().all(RaceRunHorse::finished)
    }

    /// Finalises places by sorting on `time` ascending, authoritative over
    /// the streaming place assignment made inside the tick loop.
    pub fn finalize_places(&mut self) {
        let mut order: Vec<usize> = (0..self.horses.len()).collect();
        order.sort_by(|&a, &b| {
            let ta = self.horses[a].time.unwrap_or(f64::INFINITY);
            let tb = self.horses[b].time.unwrap_or(f64::INFINITY);
            ta.partial_cmp(&tb).unwrap_or(std::cmp::Ordering::Equal)
        });
        for (place, idx) in order.into_iter().enumerate() {
            self.horses[idx].place = Some(place + 1);
        }
    }
}

impl Unique<RaceRun> for RaceRun {
    fn id(&self) -> ID<RaceRun> {
        self.id
    }
}

/// Per-horse placement in the client-facing result.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HorseResult {
    pub horse_id: ID<Horse>,
    pub horse_name: String,
    pub place: usize,
    pub payout: u64,
    pub time: f64,
}

/// Client-facing engine output: placements plus the filtered, non-empty
/// play-by-play. `condition_id`/`surface_id` are the wire-stable enum
/// discriminants; the `*_name` fields are the display strings derived from
/// them. `track_id` mirrors `race_id`'s catalog value: there's no separate
/// track entity in the data model, one catalog `Race` owns exactly one track.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RaceRunResult {
    pub race_run_id: ID<RaceRun>,
    pub race_id: ID<Race>,
    pub race_name: String,
    pub condition_id: u8,
    pub condition_name: String,
    pub track_id: u8,
    pub track_name: String,
    pub furlongs: f64,
    pub surface_id: u8,
    pub surface_name: String,
    pub play_by_play: Vec<String>,
    pub horse_results: Vec<HorseResult>,
}
