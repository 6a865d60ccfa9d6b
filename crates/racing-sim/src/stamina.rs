//! Per-tick stamina depletion.
use racing_core::horse::Horse;
use racing_core::horse::LegType;

use crate::modifier::BASE_SPEED;

/// Base depletion rate by distance bracket.
pub fn base_rate(furlongs: f64) -> f64 {
    if furlongs <= 6.0 {
        0.08
    } else if furlongs <= 10.0 {
        0.15
    } else if furlongs <= 12.0 {
        0.22
    } else {
        0.30
    }
}

/// `(1 + (Stamina-50)*-0.004) * (1 + (Durability-50)*-0.003)`; higher stats
/// mean smaller depletion.
pub fn stamina_efficiency(horse: &Horse) -> f64 {
    let stamina_term = 1.0 + (horse.stamina.value() - 50.0) * -0.004;
    let durability_term = 1.0 + (horse.durability.value() - 50.0) * -0.003;
    stamina_term * durability_term
}

/// Depletion scales with how much faster than baseline the horse is running
/// this tick.
pub fn pace_multiplier(current_speed: f64) -> f64 {
    (current_speed / BASE_SPEED).max(0.0)
}

/// Leg-type-specific depletion peaks mirroring the phase timing in.
pub fn leg_type_multiplier(leg_type: LegType, progress: f64) -> f64 {
    match leg_type {
        LegType::LastSpurt if progress > 0.75 => 1.40,
        LegType::LastSpurt => 0.80,
        LegType::StartDash if progress < 0.25 => 1.30,
        LegType::FrontRunner if progress < 0.50 => 1.10,
        LegType::StretchRunner if (0.60..0.80).contains(&progress) => 1.20,
        LegType::RailRunner => 0.95,
        _ => 1.00,
    }
}

/// Stamina-points depleted this tick. Never negative.
pub fn depletion(furlongs: f64, horse: &Horse, current_speed: f64, progress: f64) -> f64 {
    let value = (base_rate(furlongs) / 100.0)
        * stamina_efficiency(horse)
        * pace_multiplier(current_speed)
        * leg_type_multiplier(horse.leg_type, progress);
    value.max(0.0)
}
