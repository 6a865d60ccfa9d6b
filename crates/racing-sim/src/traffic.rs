//! Shared same-lane-traffic geometry used by both the modifier pipeline's
//! traffic ceiling and the overtaking manager's clearance/overtake checks.
use racing_core::horse::LegType;

/// Read-only view of one other horse's position, enough to decide
/// clearance, overtaking desire, and traffic response for a given horse.
#[derive(Debug, Clone, Copy)]
pub struct OtherHorse {
    pub lane: usize,
    pub distance: f64,
    /// Distance covered on that horse's most recently completed tick,
    /// used to estimate "leader speed" for the traffic cap.
    pub last_tick_speed: f64,
}

/// `0.25 * (1 + 0.002*Speed) * (1.5 if progress > 0.75 else 1.0)`.
pub fn overtaking_threshold(speed_stat: f64, progress: f64) -> f64 {
    let late_race = if progress > 0.75 { 1.5 } else { 1.0 };
    0.25 * (1.0 + 0.002 * speed_stat) * late_race
}

/// Flat threshold for the traffic-response ceiling: any
/// same-lane horse ahead within this distance imposes a cap.
pub const TRAFFIC_RESPONSE_RANGE: f64 = 0.2;

/// Closest horse in `lane` strictly ahead of `distance`, within `range`.
pub fn closest_ahead_in_lane<'a>(others: &'a [OtherHorse], lane: usize, distance: f64, range: f64) -> Option<&'a OtherHorse> {
    others
        .iter()
        .filter(|o| o.lane == lane && o.distance > distance && o.distance - distance <= range)
        .min_by(|a, b| (a.distance - distance).partial_cmp(&(b.distance - distance)).unwrap())
}

/// A clean lane change into `target_lane` requires no horse within 0.1
/// furlongs behind or 0.2 furlongs ahead in that lane, asymmetric on
/// purpose: cutting off is harsher than closing up.
pub fn is_clean_lane_change(others: &[OtherHorse], target_lane: usize, distance: f64) -> bool {
    !others.iter().any(|o| {
        o.lane == target_lane && {
            let delta = distance - o.distance;
            (0.0..=0.1).contains(&delta) || (-0.2..0.0).contains(&delta)
        }
    })
}

/// Number of same-lane horses ahead within `range` of `distance`, used to
/// rank lanes by congestion for lane-desire decisions.
pub fn congestion_ahead(others: &[OtherHorse], lane: usize, distance: f64, range: f64) -> usize {
    others.iter().filter(|o| o.lane == lane && o.distance > distance && o.distance - distance <= range).count()
}

/// Whether every adjacent lane is itself blocked, i.e. a `FrontRunner` has
/// nowhere to escape to ("boxed in").
pub fn is_boxed_in(others: &[OtherHorse], lane: usize, distance: f64, field_size: usize) -> bool {
    let candidates = [lane.checked_sub(1), Some(lane + 1).filter(|&l| l <= field_size)];
    candidates
        .into_iter()
        .flatten()
        .filter(|&l| l >= 1)
        .all(|l| !is_clean_lane_change(others, l, distance))
}

/// How the traffic-response ceiling is applied: an absolute speed ceiling,
/// or a flat multiplicative penalty
/// (the `FrontRunner` "boxed in" frustration case, which has no leader
/// speed to anchor a ceiling to).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrafficResponse {
    Ceiling(f64),
    Penalty(f64),
}

/// Computes this tick's traffic response for one horse, or `None` if no
/// same-lane horse ahead is close enough to matter.
pub fn traffic_response(leg_type: LegType, lane: usize, distance: f64, others: &[OtherHorse], field_size: usize) -> Option<TrafficResponse> {
    let leader = closest_ahead_in_lane(others, lane, distance, TRAFFIC_RESPONSE_RANGE)?;
    match leg_type {
        LegType::FrontRunner => {
            if is_boxed_in(others, lane, distance, field_size) {
                Some(TrafficResponse::Penalty(0.97))
            } else {
                None
            }
        }
        LegType::StartDash => Some(TrafficResponse::Ceiling(leader.last_tick_speed * (1.0 - 0.01))),
        LegType::StretchRunner => Some(TrafficResponse::Ceiling(leader.last_tick_speed * (1.0 - 0.01))),
        LegType::LastSpurt => Some(TrafficResponse::Ceiling(leader.last_tick_speed * (1.0 - 0.001))),
        LegType::RailRunner => Some(TrafficResponse::Ceiling(leader.last_tick_speed * (1.0 - 0.02))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn other(lane: usize, distance: f64) -> OtherHorse {
        OtherHorse {
            lane,
            distance,
            last_tick_speed: 0.05,
        }
    }

    #[test]
    fn clean_lane_change_blocked_when_horse_close_behind() {
        let others = vec![other(2, 9.95)];
        assert!(!is_clean_lane_change(&others, 2, 10.0));
    }

    #[test]
    fn clean_lane_change_blocked_when_horse_close_ahead() {
        let others = vec![other(2, 10.15)];
        assert!(!is_clean_lane_change(&others, 2, 10.0));
    }

    #[test]
    fn clean_lane_change_allowed_when_clear() {
        let others = vec![other(2, 12.0)];
        assert!(is_clean_lane_change(&others, 2, 10.0));
    }

    #[test]
    fn traffic_cap_is_none_without_a_leader() {
        let others = vec![other(2, 9.0)];
        assert_eq!(traffic_response(LegType::RailRunner, 1, 10.0, &others, 8), None);
    }

    #[test]
    fn rail_runner_gets_ceiling_from_leader() {
        let others = vec![other(1, 10.1)];
        let resp = traffic_response(LegType::RailRunner, 1, 10.0, &others, 8).unwrap();
        assert_eq!(resp, TrafficResponse::Ceiling(0.05 * 0.98));
    }
}
