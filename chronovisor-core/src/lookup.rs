//! Free-text event search: "Fall of the Berlin Wall" → place, moment, title.

use serde::Deserialize;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

use crate::{
    credential::CredentialGate,
    input::normalize_time,
    mock,
    model::{Coordinates, EventMatch, TimeParams},
    provider::{GenerativeModel, TextRequest},
};

const SYSTEM_INSTRUCTION: &str = "You are a historical temporal database.
Analyze the user's query for a historical event or specific moment.
Return the exact or best estimated Latitude/Longitude and Date/Time for that event.

Rules:
- If the exact time is unknown, estimate a plausible time of day (e.g., dawn for a battle, noon for a speech).
- If the date is vague (e.g., \"Summer of '69\"), pick a representative peak date.
- Coordinates should be precise.";

/// How a model answer is judged to be a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissPolicy {
    /// Absent latitude/year, or a value of exactly 0, is a miss.
    ZeroIsMissing,
    /// Only absent latitude/year is a miss.
    PresenceOnly,
}

impl MissPolicy {
    pub fn from_zero_is_missing(zero_is_missing: bool) -> Self {
        if zero_is_missing { MissPolicy::ZeroIsMissing } else { MissPolicy::PresenceOnly }
    }
}

#[derive(Debug)]
pub struct EventLookup {
    model: Arc<dyn GenerativeModel>,
    gate: Arc<CredentialGate>,
    text_model: String,
    mock_delay: Duration,
    policy: MissPolicy,
}

/// Raw answer; every field is optional so a partial answer can still be judged.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LookupAnswer {
    title: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    year: Option<f64>,
    month: Option<f64>,
    day: Option<f64>,
    hour: Option<f64>,
    minute: Option<f64>,
    second: Option<f64>,
}

pub fn response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING", "description": "Short official title of the event" },
            "latitude": { "type": "NUMBER", "description": "Latitude of the event" },
            "longitude": { "type": "NUMBER", "description": "Longitude of the event" },
            "year": { "type": "NUMBER" },
            "month": { "type": "NUMBER" },
            "day": { "type": "NUMBER" },
            "hour": { "type": "NUMBER" },
            "minute": { "type": "NUMBER" },
            "second": { "type": "NUMBER" }
        },
        "required": ["title", "latitude", "longitude", "year", "month", "day", "hour", "minute", "second"]
    })
}

impl EventLookup {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        gate: Arc<CredentialGate>,
        text_model: impl Into<String>,
        mock_delay: Duration,
        policy: MissPolicy,
    ) -> Self {
        Self { model, gate, text_model: text_model.into(), mock_delay, policy }
    }

    /// Resolve a query. `None` means "not found"; errors never escape.
    pub async fn lookup(&self, query: &str, mock_mode: bool) -> Option<EventMatch> {
        if mock_mode {
            return Some(self.lookup_mock().await);
        }

        // Best effort: a missing key surfaces as a failed call below.
        self.gate.ensure_credential().await;

        let request = TextRequest {
            model: self.text_model.clone(),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            contents: format!("Locate event: \"{query}\""),
            response_schema: response_schema(),
        };

        let text = match self.model.generate_text(&request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, query, "event lookup failed");
                return None;
            }
        };

        let body = if text.trim().is_empty() { "{}" } else { text.as_str() };
        let answer: LookupAnswer = match serde_json::from_str(body) {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, query, "event lookup returned malformed JSON");
                return None;
            }
        };

        let found = to_match(answer, query, self.policy);
        match &found {
            Some(m) => info!(title = %m.title, "event located"),
            None => info!(query, "event not found"),
        }
        found
    }

    async fn lookup_mock(&self) -> EventMatch {
        let canned = mock::random_mock_result();
        tokio::time::sleep(self.mock_delay).await;
        EventMatch {
            coordinates: mock::mock_coordinates_for(&canned.location_name),
            title: canned.location_name,
            time: canned.time,
        }
    }
}

fn to_match(answer: LookupAnswer, query: &str, policy: MissPolicy) -> Option<EventMatch> {
    let present = |v: Option<f64>| match (v, policy) {
        (Some(x), _) if x.is_nan() => None,
        (Some(x), MissPolicy::ZeroIsMissing) if x == 0.0 => None,
        (v, _) => v,
    };
    let latitude = present(answer.latitude)?;
    let year = present(answer.year)?;

    let field = |v: Option<f64>| v.map(|x| x.trunc()).unwrap_or(0.0);
    // Saturating float→int casts; out-of-range values are clamped afterwards.
    let time = normalize_time(TimeParams {
        year: year.trunc() as i64,
        month: field(answer.month).clamp(0.0, 255.0) as u8,
        day: field(answer.day).clamp(0.0, 255.0) as u8,
        hour: field(answer.hour).clamp(0.0, 255.0) as u8,
        minute: field(answer.minute).clamp(0.0, 255.0) as u8,
        second: field(answer.second).clamp(0.0, 255.0) as u8,
    });

    let title = answer
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| query.to_string());

    Some(EventMatch {
        title,
        coordinates: Coordinates::clamped(latitude, answer.longitude.unwrap_or(0.0)),
        time,
    })
}
