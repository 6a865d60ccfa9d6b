use crate::id::Unique;
use crate::id::ID;

/// Tactical running style. Determines phase-timed speed bonuses and lane
/// preferences for the duration of a race.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LegType {
    StartDash,
    FrontRunner,
    StretchRunner,
    LastSpurt,
    RailRunner,
}

impl std::fmt::Display for LegType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            LegType::StartDash => "start dash",
            LegType::FrontRunner => "front runner",
            LegType::StretchRunner => "stretch runner",
            LegType::LastSpurt => "last spurt",
            LegType::RailRunner => "rail runner",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Gender {
    Colt,
    Filly,
    Gelding,
    Mare,
    Stallion,
}

/// A stat bounded to `[0, 100]`, neutral at 50.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct Stat(f64);

impl Stat {
    pub const NEUTRAL: f64 = 50.0;

    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 100.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl From<f64> for Stat {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

/// Career totals accumulated across completed races.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct CareerRecord {
    pub starts: u32,
    pub wins: u32,
    pub places: u32,
    pub shows: u32,
    pub earnings: u64,
}

impl CareerRecord {
    /// Applies the career-counter update for one finished race: updates
    /// are last-writer-wins, no cross-race locking of a shared horse.
    pub fn record_finish(&mut self, place: usize) {
        self.starts += 1;
        match place {
            1 => self.wins += 1,
            2 => self.places += 1,
            3 => self.shows += 1,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Horse {
    id: ID<Horse>,
    pub name: String,
    pub gender: Gender,
    pub color: String,
    pub leg_type: LegType,
    pub speed: Stat,
    pub stamina: Stat,
    pub agility: Stat,
    pub durability: Stat,
    pub happiness: Stat,
    pub career: CareerRecord,
    pub retired: bool,
}

impl Horse {
    pub fn new(name: impl Into<String>, gender: Gender, color: impl Into<String>, leg_type: LegType) -> Self {
        Self {
            id: ID::default(),
            name: name.into(),
            gender,
            color: color.into(),
            leg_type,
            speed: Stat::new(Stat::NEUTRAL),
            stamina: Stat::new(Stat::NEUTRAL),
            agility: Stat::new(Stat::NEUTRAL),
            durability: Stat::new(Stat::NEUTRAL),
            happiness: Stat::new(Stat::NEUTRAL),
            career: CareerRecord::default(),
            retired: false,
        }
    }

    /// Full stamina pool a race starts the horse with, in stamina-points.
    pub fn stamina_pool(&self) -> f64 {
        self.stamina.value()
    }
}

impl Unique<Horse> for Horse {
    fn id(&self) -> ID<Horse> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_clamps_to_valid_range() {
        assert_eq!(Stat::new(150.0).value(), 100.0);
        assert_eq!(Stat::new(-5.0).value(), 0.0);
        assert_eq!(Stat::new(42.0).value(), 42.0);
    }

    #[test]
    fn career_record_tallies_place_buckets() {
        let mut record = CareerRecord::default();
        record.record_finish(1);
        record.record_finish(2);
        record.record_finish(4);
        assert_eq!(record.starts, 3);
        assert_eq!(record.wins, 1);
        assert_eq!(record.places, 1);
        assert_eq!(record.shows, 0);
    }
}

#[cfg(test)]
mod invariants {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        /// `Stat` is bounded to `[0, 100]` regardless of the input, including
        /// out-of-range and non-finite values.
        #[test]
        fn stat_is_always_within_bounds(value in -1e9f64..1e9) {
            let stat = Stat::new(value);
            prop_assert!(stat.value() >= 0.0);
            prop_assert!(stat.value() <= 100.0);
        }

        /// A fresh horse's career totals start at zero no matter which stats
        /// or leg type it's built with.
        #[test]
        fn a_fresh_horse_has_no_career_history(speed in 0.0f64..100.0, stamina in 0.0f64..100.0) {
            let mut h = Horse::new("Test Horse", Gender::Colt, "bay", LegType::FrontRunner);
            h.speed = speed.into();
            h.stamina = stamina.into();
            prop_assert_eq!(h.career.starts, 0);
            prop_assert_eq!(h.career.wins, 0);
        }
    }
}
