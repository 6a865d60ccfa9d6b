//! Pure speed-multiplier pipeline.
use racing_core::horse::Horse;
use racing_core::horse::LegType;
use racing_core::race::Condition;
use racing_core::race::Surface;
use racing_core::run::RaceRunHorse;
use racing_rng::RandomSource;

use crate::traffic::TrafficResponse;

/// Base speed every horse would run at absent any modifier, in furlongs per
/// tick.
pub const BASE_SPEED: f64 = 10.0 / 237.0;

/// Inputs to one tick's speed computation for one horse. Borrowed, never
/// owned: the pipeline reads race-run state but never mutates it.
pub struct ModifierContext<'a> {
    pub progress: f64,
    pub horse: &'a Horse,
    pub run_horse: &'a RaceRunHorse,
    pub condition: Condition,
    pub surface: Surface,
    /// Whether this horse is a `RailRunner` in lane 1 with no horse ahead
    /// within 0.5 furlongs in lane 1.
    pub rail_lane_clear: bool,
    /// Same-lane traffic response imposed this tick; `None` when no
    /// blocking horse exists within range.
    pub traffic: Option<TrafficResponse>,
}

/// `(1 + (Speed-50)*0.002) * (1 + (Agility-50)*0.001)`, range `[0.855, 1.155]`.
pub fn stat_modifier(horse: &Horse) -> f64 {
    let speed_term = 1.0 + (horse.speed.value() - 50.0) * 0.002;
    let agility_term = 1.0 + (horse.agility.value() - 50.0) * 0.001;
    speed_term * agility_term
}

/// `surface[surface] * condition[condition]`.
pub fn environmental_modifier(condition: Condition, surface: Surface) -> f64 {
    surface.modifier() * condition.modifier()
}

/// Piecewise per leg-type timing bonus.
pub fn phase_modifier(leg_type: LegType, progress: f64, rail_lane_clear: bool) -> f64 {
    match leg_type {
        LegType::StartDash if (0.0..0.25).contains(&progress) => 1.04,
        LegType::FrontRunner if (0.0..0.20).contains(&progress) => 1.03,
        LegType::StretchRunner if (0.60..0.80).contains(&progress) => 1.03,
        LegType::LastSpurt if (0.75..=1.00).contains(&progress) => 1.04,
        LegType::RailRunner if rail_lane_clear => 1.03,
        _ => 1.00,
    }
}

/// `1.0` above 50% stamina remaining; below that, a quadratic penalty
/// smoothly reaching `0.90` at 0% stamina remaining.
pub fn stamina_modifier(fraction_remaining: f64) -> f64 {
    let fraction = fraction_remaining.clamp(0.0, 1.0);
    if fraction >= 0.5 {
        1.0
    } else {
        let depleted = (0.5 - fraction) / 0.5; // 0 at 50%, 1 at 0%
        1.0 - 0.10 * depleted * depleted
    }
}

/// `0.95` while a risky-squeeze speed penalty is active, else `1.0`.
pub fn risky_lane_change_penalty(run_horse: &RaceRunHorse) -> f64 {
    if run_horse.has_speed_penalty() {
        0.95
    } else {
        1.0
    }
}

/// Uniform variance in `[0.99, 1.01]`.
pub fn random_variance(rng: &mut RandomSource) -> f64 {
    0.99 + rng.next_double() * 0.02
}

/// Runs the full pipeline in its fixed order, clamping non-finite or
/// negative results to a small positive floor so the pipeline is total
/// over any valid stat/condition/surface combination.
pub fn speed(ctx: &ModifierContext, rng: &mut RandomSource) -> f64 {
    let mut value = BASE_SPEED
        * stat_modifier(ctx.horse)
        * environmental_modifier(ctx.condition, ctx.surface)
        * phase_modifier(ctx.horse.leg_type, ctx.progress, ctx.rail_lane_clear)
        * stamina_modifier(ctx.run_horse.current_stamina / ctx.run_horse.initial_stamina.max(f64::EPSILON))
        * risky_lane_change_penalty(ctx.run_horse)
        * random_variance(rng);

    match ctx.traffic {
        Some(TrafficResponse::Ceiling(cap)) => value = value.min(cap),
        Some(TrafficResponse::Penalty(mult)) => value *= mult,
        None => {}
    }

    if !value.is_finite() || value <= 0.0 {
        0.001
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use racing_core::horse::Gender;
    use racing_core::id::Unique;

    fn horse(leg_type: LegType, speed: f64, agility: f64) -> Horse {
        let mut h = Horse::new("Test", Gender::Colt, "bay", leg_type);
        h.speed = speed.into();
        h.agility = agility.into();
        h
    }

    #[test]
    fn stat_modifier_is_neutral_at_fifty() {
        let h = horse(LegType::FrontRunner, 50.0, 50.0);
        assert!((stat_modifier(&h) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn stat_modifier_respects_documented_bounds() {
        let min = horse(LegType::FrontRunner, 0.0, 0.0);
        let max = horse(LegType::FrontRunner, 100.0, 100.0);
        assert!((stat_modifier(&min) - 0.855).abs() < 1e-9);
        assert!((stat_modifier(&max) - 1.155).abs() < 1e-9);
    }

    #[test]
    fn environmental_modifier_multiplies_tables() {
        let m = environmental_modifier(Condition::Fast, Surface::Turf);
        assert!((m - 1.03 * 1.02).abs() < 1e-9);
    }

    #[test]
    fn phase_modifier_gives_start_dash_early_bonus_only() {
        assert_eq!(phase_modifier(LegType::StartDash, 0.1, false), 1.04);
        assert_eq!(phase_modifier(LegType::StartDash, 0.5, false), 1.00);
    }

    #[test]
    fn phase_modifier_rail_runner_needs_clear_lane() {
        assert_eq!(phase_modifier(LegType::RailRunner, 0.5, true), 1.03);
        assert_eq!(phase_modifier(LegType::RailRunner, 0.5, false), 1.00);
    }

    #[test]
    fn stamina_modifier_floors_at_ninety_percent() {
        assert!((stamina_modifier(0.0) - 0.90).abs() < 1e-9);
        assert_eq!(stamina_modifier(1.0), 1.0);
        assert_eq!(stamina_modifier(0.5), 1.0);
    }

    #[test]
    fn pipeline_is_total_and_positive_for_neutral_horse() {
        let mut rng = RandomSource::new(1);
        let h = horse(LegType::FrontRunner, 50.0, 50.0);
        let run_horse = RaceRunHorse::new(h.id(), 1, 50.0);
        let ctx = ModifierContext {
            progress: 0.5,
            horse: &h,
            run_horse: &run_horse,
            condition: Condition::Good,
            surface: Surface::Dirt,
            rail_lane_clear: false,
            traffic: None,
        };
        let v = speed(&ctx, &mut rng);
        assert!(v > 0.0 && v.is_finite());
    }

    #[test]
    fn traffic_ceiling_is_applied_as_a_ceiling() {
        let mut rng = RandomSource::new(1);
        let h = horse(LegType::FrontRunner, 100.0, 100.0);
        let run_horse = RaceRunHorse::new(h.id(), 1, 50.0);
        let ctx = ModifierContext {
            progress: 0.5,
            horse: &h,
            run_horse: &run_horse,
            condition: Condition::Fast,
            surface: Surface::Turf,
            rail_lane_clear: false,
            traffic: Some(TrafficResponse::Ceiling(0.01)),
        };
        let v = speed(&ctx, &mut rng);
        assert!(v <= 0.01);
    }
}
