//! Static seed events for the "randomize" action.

use rand::seq::IndexedRandom;

use crate::model::{Coordinates, HistoricalEvent, TimeParams};

const fn event(
    id: &'static str,
    title: &'static str,
    time: TimeParams,
    (latitude, longitude): (f64, f64),
    description: &'static str,
) -> HistoricalEvent {
    HistoricalEvent { id, title, coordinates: Coordinates { latitude, longitude }, time, description }
}

pub static HISTORICAL_EVENTS: &[HistoricalEvent] = &[
    event(
        "pyramids",
        "Giza Construction",
        TimeParams::new(-2560, 6, 15, 10, 30, 0),
        (29.9792, 31.1342),
        "The Great Pyramid of Giza nearing completion under Pharaoh Khufu.",
    ),
    event(
        "rome-peak",
        "Imperial Rome",
        TimeParams::new(117, 9, 1, 14, 0, 0),
        (41.9028, 12.4964),
        "The Roman Forum bustling with activity during the reign of Trajan.",
    ),
    event(
        "edo-tokyo",
        "Edo Period Tokyo",
        TimeParams::new(1800, 5, 20, 19, 15, 0),
        (35.6762, 139.6503),
        "Samurai and merchants in the rainy streets of Edo.",
    ),
    event(
        "dino-extinction",
        "Asteroid Impact",
        TimeParams::new(-66_000_000, 1, 1, 12, 0, 0),
        (21.2, -89.5),
        "Seconds before the Chicxulub asteroid impact in the Yucatan.",
    ),
    event(
        "cyberpunk-future",
        "Neo-Seoul 2150",
        TimeParams::new(2150, 11, 14, 23, 45, 12),
        (37.5665, 126.978),
        "A towering, neon-drenched metropolis with flying vehicles.",
    ),
    // Gunfight at the O.K. Corral.
    event(
        "wild-west",
        "Tombstone 1881",
        TimeParams::new(1881, 10, 26, 15, 0, 0),
        (31.7129, -110.0676),
        "Dusty streets and saloons of the Wild West near the O.K. Corral.",
    ),
    event(
        "woodstock",
        "Woodstock 1969",
        TimeParams::new(1969, 8, 15, 17, 7, 0),
        (41.7013, -74.8801),
        "Peace, love, and music in the mud of Bethel, New York.",
    ),
    event(
        "atlantis",
        "Lost Atlantis",
        TimeParams::new(-9600, 3, 21, 6, 0, 0),
        (36.13, -24.22),
        "The advanced concentric city of Atlantis before it sank.",
    ),
    event(
        "titanic-dock",
        "Titanic Departure",
        TimeParams::new(1912, 4, 10, 12, 0, 0),
        (50.9097, -1.4044),
        "The RMS Titanic departing Southampton dock.",
    ),
    // Gale Crater.
    event(
        "mars-colony",
        "Mars Base Alpha",
        TimeParams::new(2085, 7, 20, 8, 30, 0),
        (-4.5895, 137.4417),
        "The first self-sustaining pressurized city on Mars.",
    ),
    event(
        "ice-age-london",
        "Ice Age London",
        TimeParams::new(-20_000, 1, 15, 12, 0, 0),
        (51.5074, -0.1278),
        "Mammoths crossing the frozen tundra where London now stands.",
    ),
    event(
        "tenochtitlan",
        "Aztec Capital",
        TimeParams::new(1518, 11, 8, 9, 0, 0),
        (19.4326, -99.1332),
        "The floating city of Tenochtitlan before Spanish conquest.",
    ),
    event(
        "alexandria-library",
        "Library of Alexandria",
        TimeParams::new(-200, 5, 12, 14, 30, 0),
        (31.2001, 29.9187),
        "Scholars studying scrolls in the greatest library of the ancient world.",
    ),
];

/// Uniform pick from [`HISTORICAL_EVENTS`].
pub fn random_event() -> &'static HistoricalEvent {
    HISTORICAL_EVENTS
        .choose(&mut rand::rng())
        .unwrap_or(&HISTORICAL_EVENTS[0])
}

pub fn find_event(id: &str) -> Option<&'static HistoricalEvent> {
    HISTORICAL_EVENTS.iter().find(|e| e.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn seed_list_is_large_enough_and_unique() {
        assert!(HISTORICAL_EVENTS.len() >= 10);
        let ids: HashSet<_> = HISTORICAL_EVENTS.iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), HISTORICAL_EVENTS.len());
    }

    #[test]
    fn seed_events_are_within_ranges() {
        for e in HISTORICAL_EVENTS {
            assert!((-90.0..=90.0).contains(&e.coordinates.latitude), "{}", e.id);
            assert!((-180.0..=180.0).contains(&e.coordinates.longitude), "{}", e.id);
            assert!((1..=12).contains(&e.time.month), "{}", e.id);
            assert!((1..=31).contains(&e.time.day), "{}", e.id);
            assert!(e.time.hour <= 23 && e.time.minute <= 59 && e.time.second <= 59);
            assert!(!e.title.is_empty() && !e.description.is_empty());
        }
    }

    #[test]
    fn random_event_comes_from_seed_list() {
        for _ in 0..50 {
            let e = random_event();
            assert!(find_event(e.id).is_some());
        }
    }
}
