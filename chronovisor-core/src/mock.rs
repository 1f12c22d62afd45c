//! Canned data for mock mode. Nothing here touches the network.

use rand::seq::IndexedRandom;

use crate::model::{Coordinates, TimeParams, TravelResult};

const FILLER: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. Quisque nulla lacus, \
aliquam vitae turpis sit amet, porttitor dignissim ex. Pellentesque quis arcu ipsum. Morbi id quam \
mi. Integer finibus hendrerit risus ut laoreet";

struct MockEntry {
    location_name: &'static str,
    description: &'static str,
    time: TimeParams,
    image: &'static str,
}

static MOCK_RESULTS: &[MockEntry] = &[
    MockEntry {
        location_name: "Forum Romanum, Rome",
        description: "The sun sets over the marble columns of the Forum. Senators in white togas \
debate fiercely near the Curia, while merchants sell exotic spices from the East. The air smells \
of dust and olive oil.",
        time: TimeParams::new(50, 6, 15, 18, 30, 0),
        image: "/mock_assets/forum.png",
    },
    MockEntry {
        location_name: "Neo-Shibuya, Tokyo",
        description: "Neon rain falls on the holographic advertisements towering above. Flying \
cars weave through the skyscrapers as cybernetically enhanced citizens hurry through the wet \
streets.",
        time: TimeParams::new(2077, 11, 3, 23, 15, 0),
        image: "/mock_assets/japan.jpeg",
    },
    MockEntry {
        location_name: "Cretaceous Basin",
        description: "A dense, humid jungle teems with life. Massive ferns brush against your legs \
as the ground shakes with the footsteps of a distant Titanosaur. The roar of a T-Rex echoes \
through the mist.",
        time: TimeParams::new(-66_000_000, 5, 1, 9, 0, 0),
        image: "/mock_assets/dino3.jpg",
    },
    MockEntry {
        location_name: "Sea of Tranquility, Moon",
        description: "Absolute silence. The Earth hangs like a fragile blue marble in the \
ink-black sky. The lunar regolith crunches beneath your boots as you gaze at the Eagle lander.",
        time: TimeParams::new(1969, 7, 20, 20, 17, 0),
        image: "/mock_assets/moon.png",
    },
    MockEntry {
        location_name: "Siege of Stirling Castle",
        description: "Arrows darken the sky as trebuchets launch massive stones against the castle \
walls. The clash of steel and the shouts of soldiers fill the air in a chaotic symphony of \
medieval warfare.",
        time: TimeParams::new(1304, 4, 10, 14, 0, 0),
        image: "/mock_assets/midevil.png",
    },
];

impl MockEntry {
    fn to_result(&self) -> TravelResult {
        TravelResult {
            location_name: self.location_name.to_string(),
            description: format!("{} {FILLER}", self.description),
            image_url: Some(self.image.to_string()),
            time: self.time,
        }
    }
}

/// Where mock lookups land when no override matches the location name.
pub const DEFAULT_MOCK_COORDINATES: Coordinates = Coordinates { latitude: 41.8925, longitude: 12.4853 };

const COORDINATE_OVERRIDES: &[(&str, Coordinates)] = &[
    ("Tokyo", Coordinates { latitude: 35.6762, longitude: 139.6503 }),
    ("Cretaceous", Coordinates { latitude: 40.0, longitude: -100.0 }),
    ("Moon", Coordinates { latitude: 0.674, longitude: 23.4729 }),
    ("Stirling", Coordinates { latitude: 56.1229, longitude: -3.9446 }),
];

pub fn mock_results() -> Vec<TravelResult> {
    MOCK_RESULTS.iter().map(MockEntry::to_result).collect()
}

/// Uniform pick from the canned travel results.
pub fn random_mock_result() -> TravelResult {
    MOCK_RESULTS
        .choose(&mut rand::rng())
        .unwrap_or(&MOCK_RESULTS[0])
        .to_result()
}

/// Coordinates for a canned location, keyed by substring of its name.
pub fn mock_coordinates_for(location_name: &str) -> Coordinates {
    COORDINATE_OVERRIDES
        .iter()
        .rev()
        .find(|(needle, _)| location_name.contains(needle))
        .map(|(_, c)| *c)
        .unwrap_or(DEFAULT_MOCK_COORDINATES)
}
