//! Turns tick events into natural-language commentary.
use std::collections::HashMap;

use racing_core::horse::Horse;
use racing_core::id::ID;
use racing_rng::RandomSource;

use crate::events::Event;
use crate::events::LaneChangeKind;
use crate::events::TickEvents;

const LEAD_VERBS: &[&str] = &["takes the lead", "surges to the front", "blasts past into first", "storms ahead"];
const POSITION_VERBS: &[&str] = &["moves up to {place}", "climbs into {place}", "advances to {place}"];
const LANE_CLEAN_VERBS: &[&str] = &["slides into lane {lane}", "angles out to lane {lane}", "shifts to lane {lane}"];
const LANE_RISKY_VERBS: &[&str] = &["squeezes through a gap into lane {lane}", "forces a narrow opening into lane {lane}"];
const STRETCH_PHRASES: &[&str] = &["they're in the final stretch!", "turning for home!", "into the home straight!"];
const FINISH_PHRASES: &[&str] = &["crosses the line in {place}", "finishes {place}", "hits the wire {place}"];
const PHOTO_PHRASES: &[&str] = &["it's a photo finish!", "too close to call without a photo!", "they hit the wire together!"];

fn ordinal(n: usize) -> String {
    let suffix = match (n % 100, n % 10) {
        (11..=13, _) => "th",
        (_, 1) => "st",
        (_, 2) => "nd",
        (_, 3) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

fn name_of<'a>(names: &'a HashMap<ID<Horse>, String>, id: ID<Horse>) -> &'a str {
    names.get(&id).map(String::as_str).unwrap_or("the horse")
}

/// Index of `horse`'s slot in `per_horse`, appending a fresh one in
/// first-appearance order if this is the first event seen for it.
fn per_horse_slot(per_horse: &mut Vec<(ID<Horse>, Vec<String>)>, horse: ID<Horse>) -> usize {
    match per_horse.iter().position(|(h, _)| *h == horse) {
        Some(idx) => idx,
        None => {
            per_horse.push((horse, Vec::new()));
            per_horse.len() - 1
        }
    }
}

/// Produces one commentary string for a tick from its detected events.
/// Priority: RaceStart -> LeadChange -> per-horse interleaved
/// position/lane changes -> FinalStretch -> PhotoFinish -> Finishes.
pub fn generate(events: &TickEvents, names: &HashMap<ID<Horse>, String>, rng: &mut RandomSource) -> String {
    let mut phrases = Vec::new();

    for event in &events.events {
        if let Event::RaceStart = event {
            phrases.push("and they're off!".to_string());
        }
    }
    for event in &events.events {
        if let Event::LeadChange { to, .. } = event {
            let verb = rng.pick(LEAD_VERBS);
            phrases.push(format!("{} {}", name_of(names, *to), verb));
        }
    }

    // Keyed by first-appearance order in `events.events`, not a HashMap: a
    // horse's lines must stay adjacent and the tick's phrasing must be
    // deterministic for a given seed.
    let mut per_horse: Vec<(ID<Horse>, Vec<String>)> = Vec::new();
    for event in &events.events {
        match event {
            Event::PositionChange { horse, new_place, .. } => {
                let template = rng.pick(POSITION_VERBS);
                let phrase = format!("{} {}", name_of(names, *horse), template.replace("{place}", &ordinal(*new_place)));
                let idx = per_horse_slot(&mut per_horse, *horse);
                per_horse[idx].1.push(phrase);
            }
            Event::LaneChange { horse, kind, to_lane, .. } => {
                let template = match kind {
                    LaneChangeKind::Clean => rng.pick(LANE_CLEAN_VERBS),
                    LaneChangeKind::RiskySuccess => rng.pick(LANE_RISKY_VERBS),
                };
                let phrase = format!("{} {}", name_of(names, *horse), template.replace("{lane}", &to_lane.to_string()));
                let idx = per_horse_slot(&mut per_horse, *horse);
                per_horse[idx].1.push(phrase);
            }
            _ => {}
        }
    }
    for (_, mut lines) in per_horse {
        phrases.append(&mut lines);
    }

    for event in &events.events {
        if let Event::FinalStretch = event {
            phrases.push((*rng.pick(STRETCH_PHRASES)).to_string());
        }
    }
    for event in &events.events {
        if let Event::PhotoFinish { .. } = event {
            phrases.push((*rng.pick(PHOTO_PHRASES)).to_string());
        }
    }
    for event in &events.events {
        if let Event::Finish { horse, place, .. } = event {
            let template = rng.pick(FINISH_PHRASES);
            phrases.push(format!("{} {}", name_of(names, *horse), template.replace("{place}", &ordinal(*place))));
        }
    }

    phrases.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_handles_the_teen_exception() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(13), "13th");
        assert_eq!(ordinal(21), "21st");
    }

    #[test]
    fn empty_tick_yields_empty_string() {
        let mut rng = RandomSource::new(1);
        let names = HashMap::new();
        let events = TickEvents::default();
        assert_eq!(generate(&events, &names, &mut rng), "");
    }

    #[test]
    fn race_start_produces_a_non_empty_line() {
        let mut rng = RandomSource::new(1);
        let names = HashMap::new();
        let events = TickEvents { events: vec![Event::RaceStart] };
        assert_eq!(generate(&events, &names, &mut rng), "and they're off!");
    }
}
