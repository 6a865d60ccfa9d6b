use crate::id::Unique;
use crate::id::ID;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Surface {
    Dirt,
    Turf,
    Artificial,
}

impl Surface {
    /// Speed multiplier from the surface table.
    pub fn modifier(&self) -> f64 {
        match self {
            Surface::Dirt => 1.00,
            Surface::Turf => 1.02,
            Surface::Artificial => 1.01,
        }
    }

    /// Wire-stable discriminant, carried alongside `surface_name` in the
    /// client-facing result.
    pub fn id(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Surface::Dirt => "dirt",
            Surface::Turf => "turf",
            Surface::Artificial => "artificial",
        };
        write!(f, "{s}")
    }
}

/// Sampled weather/surface state for one race run, drawn uniformly at setup
/// from the eleven values below.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Condition {
    Fast,
    Firm,
    Good,
    WetFast,
    Soft,
    Yielding,
    Muddy,
    Sloppy,
    Heavy,
    Frozen,
    Slow,
}

impl Condition {
    pub const ALL: [Condition; 11] = [
        Condition::Fast,
        Condition::Firm,
        Condition::Good,
        Condition::WetFast,
        Condition::Soft,
        Condition::Yielding,
        Condition::Muddy,
        Condition::Sloppy,
        Condition::Heavy,
        Condition::Frozen,
        Condition::Slow,
    ];

    /// Speed multiplier from the condition table.
    pub fn modifier(&self) -> f64 {
        match self {
            Condition::Fast => 1.03,
            Condition::Firm => 1.02,
            Condition::Good => 1.00,
            Condition::WetFast => 0.99,
            Condition::Soft => 0.98,
            Condition::Yielding => 0.97,
            Condition::Muddy => 0.96,
            Condition::Sloppy => 0.95,
            Condition::Heavy => 0.93,
            Condition::Frozen => 0.92,
            Condition::Slow => 0.90,
        }
    }

    /// Wire-stable discriminant, carried alongside `condition_name` in the
    /// client-facing result.
    pub fn id(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Condition::Fast => "fast",
            Condition::Firm => "firm",
            Condition::Good => "good",
            Condition::WetFast => "wet fast",
            Condition::Soft => "soft",
            Condition::Yielding => "yielding",
            Condition::Muddy => "muddy",
            Condition::Sloppy => "sloppy",
            Condition::Heavy => "heavy",
            Condition::Frozen => "frozen",
            Condition::Slow => "slow",
        };
        write!(f, "{s}")
    }
}

/// Immutable course definition. Furlongs range `[3, 20]`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Race {
    id: ID<Race>,
    /// Small numeric catalog id, the `raceId` carried on the wire by
    /// `RaceRequested`/`RaceCompleted`. Distinct from `id`, which identifies
    /// this in-memory record uniquely the way every other entity does.
    pub catalog_id: u8,
    pub name: String,
    pub track: String,
    pub furlongs: f64,
    pub surface: Surface,
}

impl Race {
    pub fn new(catalog_id: u8, name: impl Into<String>, track: impl Into<String>, furlongs: f64, surface: Surface) -> Self {
        assert!((3.0..=20.0).contains(&furlongs), "furlongs out of range");
        Self {
            id: ID::default(),
            catalog_id,
            name: name.into(),
            track: track.into(),
            furlongs,
            surface,
        }
    }
}

impl Unique<Race> for Race {
    fn id(&self) -> ID<Race> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_table_has_eleven_entries() {
        assert_eq!(Condition::ALL.len(), 11);
    }

    #[test]
    #[should_panic]
    fn race_rejects_out_of_range_distance() {
        Race::new(1, "too short", "track", 1.0, Surface::Dirt);
    }
}
