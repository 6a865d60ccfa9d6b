//! Lane-change desire, clearance checks, and risky squeeze plays.
//!
//! Per tick, per not-finished horse, in arrival order: Idle -> Evaluating ->
//! (Attempt -> Succeed|Fail) -> Idle. The state machine never suspends
//! across ticks.
use racing_core::horse::Horse;
use racing_core::horse::LegType;
use racing_core::run::RaceRunHorse;
use racing_rng::RandomSource;

use crate::traffic;
use crate::traffic::OtherHorse;

/// Outcome of one horse's lane-change attempt this tick, consumed by the
/// event detector to decide whether a `LaneChange` event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneChangeOutcome {
    /// No attempt was made (cooldown not met, or no desire/overtake trigger).
    None,
    Clean,
    RiskySuccess,
    /// A blocked clean change whose risky squeeze also failed. Reported
    /// only because a squeeze was attempted: a failed risky squeeze is a
    /// non-event, but a blocked clean change is surfaced if a squeeze was
    /// attempted.
    RiskyFailure,
}

/// Required cooldown before another lane-change attempt: `10 - 0.08*Agility`.
pub fn required_cooldown(agility: f64) -> f64 {
    10.0 - 0.08 * agility
}

fn desired_lane(horse: &Horse, run_horse: &RaceRunHorse, others: &[OtherHorse], progress: f64, field_size: usize) -> usize {
    let current = run_horse.lane;
    match horse.leg_type {
        LegType::RailRunner => 1,
        LegType::FrontRunner => current,
        LegType::StartDash => (1..=field_size)
            .min_by_key(|&lane| {
                let congestion = traffic::congestion_ahead(others, lane, run_horse.distance, 0.5);
                (congestion, (lane as i64 - current as i64).unsigned_abs())
            })
            .unwrap_or(current),
        LegType::LastSpurt if progress > 0.75 => {
            let threshold = traffic::overtaking_threshold(horse.speed.value(), progress);
            (1..=field_size)
                .max_by_key(|&lane| {
                    let opportunities = traffic::congestion_ahead(others, lane, run_horse.distance, threshold);
                    (opportunities, usize::MAX - (lane as i64 - current as i64).unsigned_abs() as usize)
                })
                .unwrap_or(current)
        }
        LegType::LastSpurt => current,
        LegType::StretchRunner => {
            let rail_target = 4.min(field_size);
            let outer_target = 5.min(field_size);
            if current == rail_target || current == outer_target {
                current
            } else if current < rail_target {
                current + 1
            } else if current > outer_target {
                current - 1
            } else {
                current
            }
        }
    }
}

fn wants_overtake(horse: &Horse, run_horse: &RaceRunHorse, others: &[OtherHorse], progress: f64) -> bool {
    let threshold = traffic::overtaking_threshold(horse.speed.value(), progress);
    traffic::closest_ahead_in_lane(others, run_horse.lane, run_horse.distance, threshold).is_some()
}

/// Single-step drift toward `desired` from `current`, or the less congested
/// adjacent lane when `desired == current` but an overtake is still wanted.
fn target_lane(current: usize, desired: usize, run_horse: &RaceRunHorse, others: &[OtherHorse], field_size: usize) -> usize {
    use std::cmp::Ordering;
    match desired.cmp(&current) {
        Ordering::Greater => current + 1,
        Ordering::Less => current - 1,
        Ordering::Equal => {
            let left = current.checked_sub(1).filter(|&l| l >= 1);
            let right = Some(current + 1).filter(|&l| l <= field_size);
            match (left, right) {
                (Some(l), Some(r)) => {
                    let l_cong = traffic::congestion_ahead(others, l, run_horse.distance, 0.5);
                    let r_cong = traffic::congestion_ahead(others, r, run_horse.distance, 0.5);
                    if l_cong <= r_cong { l } else { r }
                }
                (Some(l), None) => l,
                (None, Some(r)) => r,
                (None, None) => current,
            }
        }
    }
}

/// Runs one tick's overtaking evaluation for one horse. `others` must hold
/// every other still-racing horse's current lane/distance/last-tick-speed,
/// as of this point in the (sequentially processed) tick.
pub fn handle(
    horse: &Horse,
    run_horse: &mut RaceRunHorse,
    others: &[OtherHorse],
    progress: f64,
    field_size: usize,
    rng: &mut RandomSource,
) -> LaneChangeOutcome {
    run_horse.ticks_since_last_lane_change += 1;

    if (run_horse.ticks_since_last_lane_change as f64) < required_cooldown(horse.agility.value()) {
        return LaneChangeOutcome::None;
    }

    let desired = desired_lane(horse, run_horse, others, progress, field_size);
    let wants = wants_overtake(horse, run_horse, others, progress);

    if desired == run_horse.lane && !wants {
        return LaneChangeOutcome::None;
    }

    let target = target_lane(run_horse.lane, desired, run_horse, others, field_size);
    if target == run_horse.lane {
        return LaneChangeOutcome::None;
    }

    let outcome = if traffic::is_clean_lane_change(others, target, run_horse.distance) {
        run_horse.lane = target;
        LaneChangeOutcome::Clean
    } else if rng.chance(horse.agility.value() / 250.0) {
        run_horse.lane = target;
        run_horse.speed_penalty_ticks_remaining = (5.0 - 0.04 * horse.durability.value()).round().max(1.0) as u32;
        LaneChangeOutcome::RiskySuccess
    } else {
        LaneChangeOutcome::RiskyFailure
    };

    run_horse.ticks_since_last_lane_change = 0;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use racing_core::horse::Gender;
    use racing_core::id::Unique;

    fn horse(leg_type: LegType, agility: f64, durability: f64) -> Horse {
        let mut h = Horse::new("Test", Gender::Colt, "bay", leg_type);
        h.agility = agility.into();
        h.durability = durability.into();
        h
    }

    #[test]
    fn no_attempt_before_cooldown_elapses() {
        let h = horse(LegType::FrontRunner, 0.0, 50.0);
        let mut rh = RaceRunHorse::new(h.id(), 2, 50.0);
        rh.ticks_since_last_lane_change = 0;
        let mut rng = RandomSource::new(1);
        let outcome = handle(&h, &mut rh, &[], 0.5, 8, &mut rng);
        assert_eq!(outcome, LaneChangeOutcome::None);
        assert_eq!(rh.lane, 2);
    }

    #[test]
    fn rail_runner_drifts_toward_lane_one_when_clear() {
        let h = horse(LegType::RailRunner, 100.0, 50.0);
        let mut rh = RaceRunHorse::new(h.id(), 3, 50.0);
        rh.ticks_since_last_lane_change = 20;
        let mut rng = RandomSource::new(1);
        let outcome = handle(&h, &mut rh, &[], 0.5, 8, &mut rng);
        assert_eq!(outcome, LaneChangeOutcome::Clean);
        assert_eq!(rh.lane, 2);
    }

    #[test]
    fn blocked_clean_change_falls_back_to_risky_squeeze() {
        let h = horse(LegType::RailRunner, 100.0, 0.0);
        let mut rh = RaceRunHorse::new(h.id(), 3, 50.0);
        rh.ticks_since_last_lane_change = 20;
        let blocker = OtherHorse {
            lane: 2,
            distance: 10.05,
            last_tick_speed: 0.05,
        };
        rh.distance = 10.0;
        let mut rng = RandomSource::new(1);
        let outcome = handle(&h, &mut rh, &[blocker], 0.5, 8, &mut rng);
        assert!(matches!(outcome, LaneChangeOutcome::RiskySuccess | LaneChangeOutcome::RiskyFailure));
        assert_eq!(rh.ticks_since_last_lane_change, 0);
    }

    #[test]
    fn front_runner_has_no_lane_drift_without_overtake_desire() {
        let h = horse(LegType::FrontRunner, 100.0, 50.0);
        let mut rh = RaceRunHorse::new(h.id(), 4, 50.0);
        rh.ticks_since_last_lane_change = 20;
        let mut rng = RandomSource::new(1);
        let outcome = handle(&h, &mut rh, &[], 0.5, 8, &mut rng);
        assert_eq!(outcome, LaneChangeOutcome::None);
        assert_eq!(rh.lane, 4);
    }
}
