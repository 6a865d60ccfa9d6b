//! Owns the tick loop; composes the modifier pipeline, stamina, traffic,
//! overtaking, events, and commentary into a full race simulation.
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use racing_core::error::Error;
use racing_core::error::Result;
use racing_core::horse::Horse;
use racing_core::id::Unique;
use racing_core::id::ID;
use racing_core::race::Race;
use racing_core::run::HorseResult;
use racing_core::run::HorseSnapshot;
use racing_core::run::RaceRun;
use racing_core::run::RaceRunHorse;
use racing_core::run::RaceRunResult;
use racing_core::run::RaceRunTick;
use racing_rng::RandomSource;

use crate::commentary;
use crate::events::EventDetector;
use crate::modifier;
use crate::modifier::ModifierContext;
use crate::overtaking;
use crate::overtaking::LaneChangeOutcome;
use crate::stamina;
use crate::traffic;
use crate::traffic::OtherHorse;

/// Picks CPU opponents from a pre-filtered candidate pool: a uniform random
/// count in `[7, 12]`, clamped to however many candidates are available.
/// Tolerance/retirement filtering happens upstream, in the store query
/// that produced `candidates`.
pub fn select_opponents(candidates: &[Horse], rng: &mut RandomSource) -> Vec<Horse> {
    let count = 7 + rng.next_int(6);
    let take = count.min(candidates.len());
    let mut indices: Vec<usize> = (0..candidates.len()).collect();
    rng.shuffle(&mut indices);
    indices.into_iter().take(take).map(|i| candidates[i].clone()).collect()
}

/// Cooperative cancellation signal checked at tick boundaries. Cheap to
/// clone and share across the message boundary that owns a race's lifetime.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One race simulation over a fixed field. Owns the whole tick loop; never
/// suspends mid-race.
pub struct RaceExecutor {
    race: Race,
    horses: Vec<Horse>,
    rng: RandomSource,
    cancel: Option<CancellationToken>,
}

impl RaceExecutor {
    /// `horses` is the full field (player plus opponents); order is
    /// preserved as "insertion order" for per-tick processing.
    pub fn new(race: Race, horses: Vec<Horse>, seed: u64) -> Self {
        assert!(!horses.is_empty(), "a race needs at least one horse");
        Self {
            race,
            horses,
            rng: RandomSource::new(seed),
            cancel: None,
        }
    }

    /// Attaches a cancellation signal, checked once per tick. Cancelling
    /// mid-race aborts with `Error::Cancelled`; no partial `RaceRun` is
    /// ever returned.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn others_excluding(run_horses: &[RaceRunHorse], exclude: usize) -> Vec<OtherHorse> {
        run_horses
            .iter()
            .enumerate()
            .filter(|(j, h)| *j != exclude && !h.finished())
            .map(|(_, h)| OtherHorse {
                lane: h.lane,
                distance: h.distance,
                last_tick_speed: h.last_tick_speed,
            })
            .collect()
    }

    fn snapshot(run_horses: &[RaceRunHorse]) -> Vec<HorseSnapshot> {
        run_horses.iter().map(HorseSnapshot::from).collect()
    }

    /// Runs the full setup + tick loop + post-loop sequence and returns the
    /// persisted run, the client-facing result, and the horses with their
    /// career counters updated (the caller persists those through the store).
    /// Returns `Err(Error::Cancelled)` if the attached token fires mid-race.
    pub fn run(mut self) -> Result<(RaceRun, RaceRunResult, Vec<Horse>)> {
        let field_size = self.horses.len();
        let furlongs = self.race.furlongs;

        let condition = *self.rng.pick(&racing_core::race::Condition::ALL);

        let mut lanes: Vec<usize> = (1..=field_size).collect();
        self.rng.shuffle(&mut lanes);

        let run_horses: Vec<RaceRunHorse> = self
            .horses
            .iter()
            .zip(lanes)
            .map(|(horse, lane)| RaceRunHorse::new(horse.id(), lane, horse.stamina_pool()))
            .collect();

        let mut run = RaceRun::new(self.race.id(), condition, run_horses);

        let names: HashMap<ID<Horse>, String> = self.horses.iter().map(|h| (h.id(), h.name.clone())).collect();

        let expected_ticks = furlongs / modifier::BASE_SPEED;
        let max_ticks = (2.0 * expected_ticks).ceil() as u32;

        let mut detector = EventDetector::new();
        let mut prev_snapshots: HashMap<ID<Horse>, HorseSnapshot> = HashMap::new();
        let mut finished_count = 0usize;
        let mut tick: u32 = 0;

        while !run.all_finished() && tick < max_ticks {
            if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                return Err(Error::Cancelled);
            }
            tick += 1;
            let mut lane_outcomes: Vec<(ID<Horse>, LaneChangeOutcome)> = Vec::new();
            let mut finishes: Vec<(ID<Horse>, usize, f64)> = Vec::new();

            for i in 0..field_size {
                if run.horses[i].finished() {
                    continue;
                }
                let horse = &self.horses[i];
                let progress = run.horses[i].progress(furlongs);
                let lane = run.horses[i].lane;
                let distance = run.horses[i].distance;

                let others = Self::others_excluding(&run.horses, i);
                let rail_lane_clear = lane == 1 && traffic::closest_ahead_in_lane(&others, 1, distance, 0.5).is_none();
                let traffic_resp = traffic::traffic_response(horse.leg_type, lane, distance, &others, field_size);

                let speed_value = {
                    let ctx = ModifierContext {
                        progress,
                        horse,
                        run_horse: &run.horses[i],
                        condition,
                        surface: self.race.surface,
                        rail_lane_clear,
                        traffic: traffic_resp,
                    };
                    modifier::speed(&ctx, &mut self.rng)
                };

                let d_prev = run.horses[i].distance;
                run.horses[i].distance += speed_value;
                run.horses[i].last_tick_speed = speed_value;

                if d_prev < furlongs && run.horses[i].distance >= furlongs {
                    let frac = (furlongs - d_prev) / (run.horses[i].distance - d_prev);
                    let time = (tick as f64 - 1.0) + frac;
                    finished_count += 1;
                    run.horses[i].time = Some(time);
                    run.horses[i].place = Some(finished_count);
                    run.horses[i].distance = furlongs;
                    finishes.push((horse.id(), finished_count, time));
                }

                if !run.horses[i].finished() {
                    let others_after = Self::others_excluding(&run.horses, i);
                    let outcome = overtaking::handle(horse, &mut run.horses[i], &others_after, progress, field_size, &mut self.rng);
                    if outcome != LaneChangeOutcome::None {
                        lane_outcomes.push((horse.id(), outcome));
                    }
                }

                let stamina_delta = stamina::depletion(furlongs, horse, speed_value, progress);
                run.horses[i].current_stamina = (run.horses[i].current_stamina - stamina_delta).max(0.0);
            }

            let curr_snapshots = Self::snapshot(&run.horses);
            let events = detector.detect(&prev_snapshots, &curr_snapshots, &lane_outcomes, tick, furlongs, &finishes);
            let commentary_line = commentary::generate(&events, &names, &mut self.rng);

            prev_snapshots = curr_snapshots.iter().map(|s| (s.horse_id, *s)).collect();
            run.ticks.push(RaceRunTick {
                tick,
                snapshots: curr_snapshots,
                commentary: commentary_line,
            });
        }

        run.finalize_places();
        for horse in self.horses.iter_mut() {
            if let Some(place) = run.horses.iter().find(|h| h.horse_id == horse.id()).and_then(|h| h.place) {
                horse.career.record_finish(place);
            }
        }

        let names: HashMap<ID<Horse>, String> = self.horses.iter().map(|h| (h.id(), h.name.clone())).collect();
        let result = rebuild_result(&self.race, &run, &names);

        Ok((run, result, self.horses))
    }
}

/// Reconstructs the client-facing [`RaceRunResult`] from a persisted
/// [`RaceRun`]. Used both at the end of [`RaceExecutor::run`] and by a
/// caller republishing a completion for an already-`Completed` request.
pub fn rebuild_result(race: &Race, run: &RaceRun, horse_names: &HashMap<ID<Horse>, String>) -> RaceRunResult {
    let mut horse_results: Vec<HorseResult> = run
        .horses
        .iter()
        .map(|rh| HorseResult {
            horse_id: rh.horse_id,
            horse_name: horse_names.get(&rh.horse_id).cloned().unwrap_or_default(),
            place: rh.place.unwrap_or(run.horses.len()),
            payout: 0,
            time: rh.time.unwrap_or(f64::INFINITY),
        })
        .collect();
    horse_results.sort_by_key(|r| r.place);

    let play_by_play: Vec<String> = run.ticks.iter().map(|t| t.commentary.clone()).filter(|s| !s.is_empty()).collect();

    RaceRunResult {
        race_run_id: run.id(),
        race_id: race.id(),
        race_name: race.name.clone(),
        condition_id: run.condition.id(),
        condition_name: run.condition.to_string(),
        track_id: race.catalog_id,
        track_name: race.track.clone(),
        furlongs: race.furlongs,
        surface_id: race.surface.id(),
        surface_name: race.surface.to_string(),
        play_by_play,
        horse_results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use racing_core::horse::Gender;
    use racing_core::horse::LegType;
    use racing_core::race::Surface;

    fn horse(name: &str, leg_type: LegType) -> Horse {
        let mut h = Horse::new(name, Gender::Colt, "bay", leg_type);
        h.speed = 60.0.into();
        h.stamina = 60.0.into();
        h.agility = 55.0.into();
        h.durability = 55.0.into();
        h
    }

    fn field() -> Vec<Horse> {
        vec![
            horse("Player", LegType::LastSpurt),
            horse("Rival A", LegType::FrontRunner),
            horse("Rival B", LegType::StartDash),
            horse("Rival C", LegType::StretchRunner),
            horse("Rival D", LegType::RailRunner),
        ]
    }

    #[test]
    fn race_terminates_and_produces_a_full_permutation_of_places() {
        let race = Race::new(1, "Derby", "Downs", 10.0, Surface::Dirt);
        let executor = RaceExecutor::new(race, field(), 42);
        let (run, result, _) = executor.run().unwrap();

        assert!(run.all_finished());
        let mut places: Vec<usize> = run.horses.iter().map(|h| h.place.unwrap()).collect();
        places.sort();
        assert_eq!(places, vec![1, 2, 3, 4, 5]);
        assert_eq!(result.horse_results.len(), 5);
        assert!(result.horse_results.windows(2).all(|w| w[0].time <= w[1].time));
    }

    #[test]
    fn same_seed_is_byte_identical() {
        let race_a = Race::new(1, "Derby", "Downs", 8.0, Surface::Turf);
        let race_b = Race::new(1, "Derby", "Downs", 8.0, Surface::Turf);
        let (run_a, _, _) = RaceExecutor::new(race_a, field(), 7).run().unwrap();
        let (run_b, _, _) = RaceExecutor::new(race_b, field(), 7).run().unwrap();

        assert_eq!(run_a.ticks.len(), run_b.ticks.len());
        for (ta, tb) in run_a.ticks.iter().zip(run_b.ticks.iter()) {
            assert_eq!(ta.commentary, tb.commentary);
            for (sa, sb) in ta.snapshots.iter().zip(tb.snapshots.iter()) {
                assert_eq!(sa.lane, sb.lane);
                assert!((sa.distance - sb.distance).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn solo_field_has_no_lane_changes_and_finishes_first() {
        let race = Race::new(1, "Solo Trial", "Downs", 5.0, Surface::Dirt);
        let executor = RaceExecutor::new(race, vec![horse("Lonely", LegType::FrontRunner)], 3);
        let (run, _, _) = executor.run().unwrap();
        assert_eq!(run.horses.len(), 1);
        assert_eq!(run.horses[0].place, Some(1));
    }

    #[test]
    fn cancelling_before_the_first_tick_aborts_with_no_partial_run() {
        let race = Race::new(1, "Derby", "Downs", 10.0, Surface::Dirt);
        let token = CancellationToken::new();
        token.cancel();
        let executor = RaceExecutor::new(race, field(), 42).with_cancellation(token);
        assert!(matches!(executor.run(), Err(racing_core::Error::Cancelled)));
    }

    #[test]
    fn all_zero_stats_still_terminates_within_the_tick_cap() {
        let mut weak = Horse::new("Weak", Gender::Filly, "grey", LegType::FrontRunner);
        weak.speed = 0.0.into();
        weak.stamina = 0.0.into();
        weak.agility = 0.0.into();
        weak.durability = 0.0.into();
        let furlongs = 20.0;
        let race = Race::new(1, "Long Haul", "Downs", furlongs, Surface::Dirt);
        let executor = RaceExecutor::new(race, vec![weak], 11);
        let (run, _, _) = executor.run().unwrap();

        let max_ticks = (2.0 * (furlongs / modifier::BASE_SPEED)).ceil() as u32;
        assert!(!run.ticks.is_empty());
        assert!(run.ticks.len() as u32 <= max_ticks);
    }
}
