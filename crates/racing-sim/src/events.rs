//! Diffs consecutive tick snapshots into notable events.
//!
//! [`EventDetector`] never mutates race state: the caller updates the
//! previous-tick snapshot map itself after calling [`EventDetector::detect`].
use std::collections::HashMap;

use racing_core::horse::Horse;
use racing_core::id::ID;
use racing_core::run::HorseSnapshot;

use crate::overtaking::LaneChangeOutcome;

/// Ticks a horse's prior position/lane change must stay outside of before
/// the same kind of event reports again for that horse.
pub const POSITION_CHANGE_COOLDOWN_TICKS: u32 = 5;
pub const LANE_CHANGE_COOLDOWN_TICKS: u32 = 8;
/// Finish-time gap, in fractional ticks, below which two finishes are a
/// photo finish.
pub const PHOTO_FINISH_MARGIN: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneChangeKind {
    Clean,
    RiskySuccess,
}

#[derive(Debug, Clone)]
pub enum Event {
    RaceStart,
    FinalStretch,
    LeadChange { from: Option<ID<Horse>>, to: ID<Horse> },
    PositionChange { horse: ID<Horse>, displaced: ID<Horse>, new_place: usize },
    LaneChange { horse: ID<Horse>, kind: LaneChangeKind, from_lane: usize, to_lane: usize },
    Finish { horse: ID<Horse>, place: usize, time: f64 },
    PhotoFinish { first: ID<Horse>, second: ID<Horse>, margin: f64 },
}

#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    pub events: Vec<Event>,
}

impl TickEvents {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Stateful diffing engine. Owns cooldown bookkeeping and rank history;
/// the tick-to-tick lane/distance snapshot still lives with the caller.
pub struct EventDetector {
    last_position_change: HashMap<ID<Horse>, u32>,
    last_lane_change: HashMap<ID<Horse>, u32>,
    last_rank: HashMap<ID<Horse>, usize>,
    photo_finish_reported: bool,
    prior_leader: Option<ID<Horse>>,
    /// The race's first finisher, fixed the tick it's first observed and
    /// carried across ticks so the second finisher can be compared against
    /// it even when the two land on different ticks.
    first_finish: Option<(ID<Horse>, f64)>,
}

impl EventDetector {
    pub fn new() -> Self {
        Self {
            last_position_change: HashMap::new(),
            last_lane_change: HashMap::new(),
            last_rank: HashMap::new(),
            photo_finish_reported: false,
            prior_leader: None,
            first_finish: None,
        }
    }

    pub fn detect(
        &mut self,
        prev: &HashMap<ID<Horse>, HorseSnapshot>,
        curr: &[HorseSnapshot],
        lane_outcomes: &[(ID<Horse>, LaneChangeOutcome)],
        tick: u32,
        furlongs: f64,
        finishes: &[(ID<Horse>, usize, f64)],
    ) -> TickEvents {
        let mut events = Vec::new();

        if tick == 1 {
            events.push(Event::RaceStart);
        }

        let crossed_final_stretch = curr.iter().any(|s| {
            let progress_now = s.distance / furlongs;
            let progress_before = prev.get(&s.horse_id).map(|p| p.distance / furlongs).unwrap_or(0.0);
            progress_before < 0.75 && progress_now >= 0.75
        });
        if crossed_final_stretch {
            events.push(Event::FinalStretch);
        }

        let still_racing: Vec<&HorseSnapshot> = curr.iter().filter(|s| s.place.is_none()).collect();
        // A leader that finished this tick drops out of `still_racing` on its
        // own; that's not a "both horses still racing" lead change.
        let prior_leader_finished = self.prior_leader.is_some_and(|id| curr.iter().any(|s| s.horse_id == id && s.place.is_some()));
        if let Some(leader) = still_racing.iter().min_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap().reverse()) {
            if self.prior_leader != Some(leader.horse_id) {
                if self.prior_leader.is_some() && !prior_leader_finished {
                    events.push(Event::LeadChange {
                        from: self.prior_leader,
                        to: leader.horse_id,
                    });
                }
                self.prior_leader = Some(leader.horse_id);
            }
        }

        let mut ranked: Vec<&HorseSnapshot> = still_racing.clone();
        ranked.sort_by(|a, b| b.distance.partial_cmp(&a.distance).unwrap());
        let current_rank: HashMap<ID<Horse>, usize> = ranked.iter().enumerate().map(|(i, s)| (s.horse_id, i + 1)).collect();

        for snap in &still_racing {
            let rank_now = current_rank[&snap.horse_id];
            if let Some(&prior_rank) = self.last_rank.get(&snap.horse_id) {
                if rank_now < prior_rank {
                    let cooled_down = self
                        .last_position_change
                        .get(&snap.horse_id)
                        .map(|&t| tick - t >= POSITION_CHANGE_COOLDOWN_TICKS)
                        .unwrap_or(true);
                    if cooled_down {
                        // `prior_rank` is 1-indexed; the horse now sitting there is
                        // the one `snap` just overtook.
                        if let Some(displaced) = ranked.get(prior_rank - 1) {
                            events.push(Event::PositionChange {
                                horse: snap.horse_id,
                                displaced: displaced.horse_id,
                                new_place: rank_now,
                            });
                        }
                        self.last_position_change.insert(snap.horse_id, tick);
                    }
                }
            }
        }
        for snap in &still_racing {
            self.last_rank.insert(snap.horse_id, current_rank[&snap.horse_id]);
        }

        for &(horse_id, outcome) in lane_outcomes {
            let prior_lane = prev.get(&horse_id).map(|p| p.lane);
            let now_lane = curr.iter().find(|s| s.horse_id == horse_id).map(|s| s.lane);
            match outcome {
                LaneChangeOutcome::Clean => {
                    let cooled_down = self.last_lane_change.get(&horse_id).map(|&t| tick - t >= LANE_CHANGE_COOLDOWN_TICKS).unwrap_or(true);
                    if cooled_down {
                        if let (Some(from), Some(to)) = (prior_lane, now_lane) {
                            events.push(Event::LaneChange {
                                horse: horse_id,
                                kind: LaneChangeKind::Clean,
                                from_lane: from,
                                to_lane: to,
                            });
                        }
                        self.last_lane_change.insert(horse_id, tick);
                    }
                }
                LaneChangeOutcome::RiskySuccess => {
                    // Risky successes always report, bypassing the cooldown.
                    if let (Some(from), Some(to)) = (prior_lane, now_lane) {
                        events.push(Event::LaneChange {
                            horse: horse_id,
                            kind: LaneChangeKind::RiskySuccess,
                            from_lane: from,
                            to_lane: to,
                        });
                    }
                    self.last_lane_change.insert(horse_id, tick);
                }
                LaneChangeOutcome::RiskyFailure | LaneChangeOutcome::None => {}
            }
        }

        for &(horse_id, place, time) in finishes {
            events.push(Event::Finish { horse: horse_id, place, time });
        }

        if !self.photo_finish_reported && !finishes.is_empty() {
            let mut candidates: Vec<(ID<Horse>, f64)> = finishes.iter().map(|&(id, _, t)| (id, t)).collect();
            if let Some(first) = self.first_finish {
                candidates.push(first);
            }
            candidates.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
            candidates.dedup_by_key(|c| c.0);

            if self.first_finish.is_none() {
                self.first_finish = candidates.first().copied();
            }

            if let Some((first_id, first_time)) = self.first_finish {
                if let Some(&(second_id, second_time)) = candidates.iter().find(|(id, _)| *id != first_id) {
                    let margin = (second_time - first_time).abs();
                    if margin <= PHOTO_FINISH_MARGIN {
                        events.push(Event::PhotoFinish {
                            first: first_id,
                            second: second_id,
                            margin,
                        });
                        self.photo_finish_reported = true;
                    }
                }
            }
        }

        TickEvents { events }
    }
}

impl Default for EventDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(id: ID<Horse>, lane: usize, distance: f64, place: Option<usize>) -> HorseSnapshot {
        HorseSnapshot {
            horse_id: id,
            lane,
            distance,
            place,
        }
    }

    #[test]
    fn first_tick_always_reports_race_start() {
        let mut detector = EventDetector::new();
        let a: ID<Horse> = ID::default();
        let prev = HashMap::new();
        let curr = vec![snap(a, 1, 0.1, None)];
        let events = detector.detect(&prev, &curr, &[], 1, 10.0, &[]);
        assert!(matches!(events.events[0], Event::RaceStart));
    }

    #[test]
    fn photo_finish_reports_once_within_margin() {
        let mut detector = EventDetector::new();
        let a: ID<Horse> = ID::default();
        let b: ID<Horse> = ID::default();
        let finishes = vec![(a, 1, 20.0), (b, 2, 20.02)];
        let events = detector.detect(&HashMap::new(), &[], &[], 5, 10.0, &finishes);
        let photo_finishes: Vec<_> = events.events.iter().filter(|e| matches!(e, Event::PhotoFinish { .. })).collect();
        assert_eq!(photo_finishes.len(), 1);

        let events_again = detector.detect(&HashMap::new(), &[], &[], 6, 10.0, &finishes);
        assert!(!events_again.events.iter().any(|e| matches!(e, Event::PhotoFinish { .. })));
    }

    #[test]
    fn photo_finish_reports_when_the_two_finishers_straddle_a_tick_boundary() {
        let mut detector = EventDetector::new();
        let a: ID<Horse> = ID::default();
        let b: ID<Horse> = ID::default();

        // `a` finishes at tick 50, `b` finishes at tick 51; their times are
        // within PHOTO_FINISH_MARGIN of each other but land on different
        // ticks, so no single `detect` call ever sees both in `finishes`.
        let first_tick = detector.detect(&HashMap::new(), &[], &[], 50, 10.0, &[(a, 1, 49.98)]);
        assert!(!first_tick.events.iter().any(|e| matches!(e, Event::PhotoFinish { .. })));

        let second_tick = detector.detect(&HashMap::new(), &[], &[], 51, 10.0, &[(b, 2, 50.01)]);
        let photo_finishes: Vec<_> = second_tick.events.iter().filter(|e| matches!(e, Event::PhotoFinish { .. })).collect();
        assert_eq!(photo_finishes.len(), 1);
        assert!(matches!(photo_finishes[0], Event::PhotoFinish { first, second, .. } if *first == a && *second == b));
    }

    #[test]
    fn lead_change_does_not_fire_when_the_prior_leader_just_finished() {
        let mut detector = EventDetector::new();
        let a: ID<Horse> = ID::default();
        let b: ID<Horse> = ID::default();

        // Tick 1: `a` leads.
        let prev = HashMap::new();
        let curr1 = vec![snap(a, 1, 9.0, None), snap(b, 2, 8.0, None)];
        detector.detect(&prev, &curr1, &[], 1, 10.0, &[]);

        // Tick 2: `a` finishes this tick, `b` is now the only still-racing
        // horse and therefore the new "leader" by elimination, not overtake.
        let mut prev2 = HashMap::new();
        prev2.insert(a, snap(a, 1, 9.0, None));
        prev2.insert(b, snap(b, 2, 8.0, None));
        let curr2 = vec![snap(a, 1, 10.0, Some(1)), snap(b, 2, 8.5, None)];
        let finishes = vec![(a, 1, 1.5)];
        let events2 = detector.detect(&prev2, &curr2, &[], 2, 10.0, &finishes);
        assert!(!events2.events.iter().any(|e| matches!(e, Event::LeadChange { .. })));
    }

    #[test]
    fn risky_success_lane_change_bypasses_cooldown() {
        let mut detector = EventDetector::new();
        let a: ID<Horse> = ID::default();
        let mut prev = HashMap::new();
        prev.insert(a, snap(a, 2, 5.0, None));
        let curr = vec![snap(a, 3, 5.05, None)];
        let outcomes = vec![(a, LaneChangeOutcome::RiskySuccess)];
        let events1 = detector.detect(&prev, &curr, &outcomes, 2, 10.0, &[]);
        assert!(events1.events.iter().any(|e| matches!(e, Event::LaneChange { kind: LaneChangeKind::RiskySuccess, .. })));

        prev.insert(a, snap(a, 3, 5.05, None));
        let curr2 = vec![snap(a, 4, 5.10, None)];
        let outcomes2 = vec![(a, LaneChangeOutcome::RiskySuccess)];
        let events2 = detector.detect(&prev, &curr2, &outcomes2, 3, 10.0, &[]);
        assert!(events2.events.iter().any(|e| matches!(e, Event::LaneChange { kind: LaneChangeKind::RiskySuccess, .. })));
    }
}
