//! The time-travel pipeline: narrative text first, then a picture.
//!
//! ```text
//! Idle ─┬─ mock ──► MockWait ──────────────────────────────────────► Done
//!       └─ live ──► NarrativeCall ─► Narrative(ok | degraded) ─► VisualCall ─► Visual(ok | absent) ─► Done
//! ```
//!
//! A failed narrative *call* is the only hard failure. An unparsable
//! narrative degrades to a placeholder, and any visual failure just leaves
//! the result without an image.

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};

use crate::{
    credential::CredentialGate,
    mock,
    model::{Coordinates, TimeParams, TravelResult},
    provider::{GenerativeModel, ImageRequest, ResponsePart, TextRequest},
};

pub const FLUX_ERROR_LOCATION: &str = "Temporal Flux Error";
pub const FLUX_ERROR_DESCRIPTION: &str =
    "Unable to lock onto spacetime coordinates. The timeline is unstable.";
pub const UNKNOWN_LOCATION: &str = "Unknown Sector";
pub const NO_DESCRIPTION: &str = "No data available.";

pub const IMAGE_ASPECT_RATIO: &str = "16:9";
pub const IMAGE_SIZE: &str = "1K";

const SYSTEM_INSTRUCTION: &str = "You are the ChronoVisor OS, a quantum-temporal visualization engine.
Your inputs are strictly defined coordinates (LAT, LNG) and a precise timestamp.

Your directive:
1. EXTRACT geographic identity: Determine the exact location (City, Region, or Landmark) from coordinates.
2. ANALYZE temporal context: Access historical or futurological databases for that specific DATE and TIME at that location.
3. SYNTHESIZE visual parameters: Create a highly specific, atmospheric description for a visual generator.

Crucial: Consider the season (Month), time of day (Hour/Minute), and specific historical context of that exact moment.

Rules:
- If Year < -3000: Focus on geography, flora, fauna, or ancient neolithic settlements.
- If Year > 2025: Extrapolate technological, environmental, or societal evolution based on current trends.
- Be specific. Avoid generic descriptions.";

/// Output of the narrative stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Narrative {
    pub location_name: String,
    pub description: String,
    pub visual_prompt: String,
}

impl Narrative {
    /// Read the three fields from any JSON value. Missing, null or non-string fields become empty.
    pub fn from_value(value: &Value) -> Self {
        let field = |name: &str| {
            value.get(name).and_then(Value::as_str).unwrap_or_default().to_string()
        };
        Self {
            location_name: field("locationName"),
            description: field("description"),
            visual_prompt: field("visualPrompt"),
        }
    }

    /// Placeholder used when the model's answer cannot be parsed.
    pub fn flux_error(coordinates: Coordinates, time: &TimeParams) -> Self {
        Self {
            location_name: FLUX_ERROR_LOCATION.to_string(),
            description: FLUX_ERROR_DESCRIPTION.to_string(),
            visual_prompt: format!(
                "Abstract glitched time travel visual, coordinates {}, {}, year {}",
                coordinates.latitude, coordinates.longitude, time.year
            ),
        }
    }
}

pub fn narrative_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "locationName": { "type": "STRING", "description": "Name of the location" },
            "description": {
                "type": "STRING",
                "description": "Atmospheric narrative description (2-3 sentences)"
            },
            "visualPrompt": {
                "type": "STRING",
                "description": "Detailed image generation prompt including lighting based on time of day"
            }
        },
        "required": ["locationName", "description", "visualPrompt"]
    })
}

fn narrative_contents(coordinates: Coordinates, time: &TimeParams) -> String {
    format!(
        "Input Parameters:\n\
         VARIABLE_LAT: {}\n\
         VARIABLE_LNG: {}\n\
         VARIABLE_YEAR: {}\n\
         VARIABLE_MONTH: {}\n\
         VARIABLE_DAY: {}\n\
         VARIABLE_TIME: {}:{}:{}\n\
         \n\
         Execute visualization protocol.",
        coordinates.latitude,
        coordinates.longitude,
        time.year,
        time.month,
        time.day,
        time.hour,
        time.minute,
        time.second
    )
}

/// Image prompt: the narrative's visual prompt plus fixed cinematic modifiers.
pub fn image_prompt(narrative: &Narrative, time: &TimeParams) -> String {
    format!(
        "{}\n\
         Cinematic composition, 8k resolution, highly detailed, photorealistic.\n\
         Mood: Immersive, atmospheric.\n\
         Date: {}/{}/{} Time: {}:{}. Location: {}.",
        narrative.visual_prompt,
        time.month,
        time.day,
        time.year,
        time.hour,
        time.minute,
        narrative.location_name
    )
}

/// First inline image of the parts, as a PNG data URL.
pub fn first_image_url(parts: &[ResponsePart]) -> Option<String> {
    parts
        .iter()
        .find_map(|p| p.inline_data.as_ref())
        .map(|data| format!("data:image/png;base64,{}", data.data))
}

#[derive(Debug)]
pub struct TimeTravel {
    model: Arc<dyn GenerativeModel>,
    gate: Arc<CredentialGate>,
    text_model: String,
    image_model: String,
    mock_delay: Duration,
}

impl TimeTravel {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        gate: Arc<CredentialGate>,
        text_model: impl Into<String>,
        image_model: impl Into<String>,
        mock_delay: Duration,
    ) -> Self {
        Self {
            model,
            gate,
            text_model: text_model.into(),
            image_model: image_model.into(),
            mock_delay,
        }
    }

    /// Run one travel. Fails only if the narrative call itself fails.
    pub async fn execute(
        &self,
        coordinates: Coordinates,
        time: TimeParams,
        mock_mode: bool,
    ) -> Result<TravelResult> {
        if mock_mode {
            let canned = mock::random_mock_result();
            tokio::time::sleep(self.mock_delay).await;
            info!(location = %canned.location_name, "mock travel resolved");
            return Ok(canned);
        }

        self.gate.ensure_credential().await;

        info!(%coordinates, %time, "narrative stage");
        let narrative = self.narrate(coordinates, &time).await.inspect_err(|e| {
            error!(error = %e, "narrative call failed");
        })?;

        info!(location = %narrative.location_name, "visual stage");
        let image_url = self.visualize(&narrative, &time).await;

        Ok(TravelResult {
            location_name: non_empty_or(narrative.location_name, UNKNOWN_LOCATION),
            description: non_empty_or(narrative.description, NO_DESCRIPTION),
            image_url,
            time,
        })
    }

    async fn narrate(&self, coordinates: Coordinates, time: &TimeParams) -> Result<Narrative> {
        let request = TextRequest {
            model: self.text_model.clone(),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            contents: narrative_contents(coordinates, time),
            response_schema: narrative_schema(),
        };

        let text = self
            .model
            .generate_text(&request)
            .await
            .context("Narrative synthesis request failed")?;

        let body = if text.trim().is_empty() { "{}" } else { text.as_str() };
        Ok(match serde_json::from_str::<Value>(body) {
            Ok(value) => Narrative::from_value(&value),
            Err(e) => {
                warn!(error = %e, "narrative was not valid JSON, using placeholder");
                Narrative::flux_error(coordinates, time)
            }
        })
    }

    async fn visualize(&self, narrative: &Narrative, time: &TimeParams) -> Option<String> {
        let request = ImageRequest {
            model: self.image_model.clone(),
            prompt: image_prompt(narrative, time),
            aspect_ratio: IMAGE_ASPECT_RATIO.to_string(),
            image_size: IMAGE_SIZE.to_string(),
        };

        match self.model.generate_image(&request).await {
            Ok(parts) => {
                let url = first_image_url(&parts);
                if url.is_none() {
                    warn!("image response contained no inline image");
                }
                url
            }
            Err(e) => {
                warn!(error = %e, "image generation failed, continuing without image");
                None
            }
        }
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() { fallback.to_string() } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        credential::{
            ApiKeySlot,
            tests::{SharedSelector, StubSelector},
        },
        lookup::tests::StubModel,
    };
    use std::sync::atomic::Ordering;

    const GIZA: Coordinates = Coordinates { latitude: 29.9792, longitude: 31.1342 };
    const GIZA_TIME: TimeParams = TimeParams::new(-2560, 6, 15, 10, 30, 0);

    fn travel_with(model: Arc<StubModel>) -> TimeTravel {
        let gate = Arc::new(CredentialGate::Static(ApiKeySlot::new(Some("KEY".into()))));
        TimeTravel::new(model, gate, "text-model", "image-model", Duration::from_millis(2000))
    }

    fn narrating(text: &str, parts: Vec<ResponsePart>) -> Arc<StubModel> {
        Arc::new(StubModel { parts, ..StubModel::answering(text) })
    }

    const PYRAMID: &str = r#"{"locationName":"Giza Plateau","description":"Limestone gleams.",
        "visualPrompt":"Workers haul casing stones at mid-morning"}"#;

    #[tokio::test]
    async fn live_travel_combines_narrative_and_image() {
        let model = narrating(PYRAMID, vec![
            ResponsePart::text("here you go"),
            ResponsePart::image("image/jpeg", "QUJD"),
            ResponsePart::image("image/png", "second"),
        ]);
        let travel = travel_with(model.clone());

        let result = travel.execute(GIZA, GIZA_TIME, false).await.expect("travel succeeds");
        assert_eq!(result.location_name, "Giza Plateau");
        assert_eq!(result.description, "Limestone gleams.");
        assert_eq!(result.image_url.as_deref(), Some("data:image/png;base64,QUJD"));
        assert_eq!(result.time, GIZA_TIME);

        let text = model.last_text.lock().expect("lock").clone().expect("text request");
        assert_eq!(text.model, "text-model");
        assert!(text.contents.contains("VARIABLE_LAT: 29.9792"));
        assert!(text.contents.contains("VARIABLE_YEAR: -2560"));
        assert!(text.contents.contains("VARIABLE_TIME: 10:30:0"));

        let image = model.last_image.lock().expect("lock").clone().expect("image request");
        assert_eq!(image.model, "image-model");
        assert_eq!(image.aspect_ratio, "16:9");
        assert_eq!(image.image_size, "1K");
        assert!(image.prompt.starts_with("Workers haul casing stones at mid-morning"));
        assert!(image.prompt.contains("Cinematic composition"));
        assert!(image.prompt.contains("Date: 6/15/-2560 Time: 10:30. Location: Giza Plateau."));
    }

    #[tokio::test]
    async fn narrative_call_failure_is_a_hard_failure() {
        let model = Arc::new(StubModel { text_fails: true, ..Default::default() });
        let travel = travel_with(model.clone());

        let err = travel.execute(GIZA, GIZA_TIME, false).await.unwrap_err();
        assert!(err.to_string().contains("Narrative synthesis request failed"));
        assert_eq!(model.image_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unparsable_narrative_degrades_to_flux_error() {
        let model = narrating("<<not json>>", vec![ResponsePart::image("image/png", "AAAA")]);
        let travel = travel_with(model.clone());

        let result = travel.execute(GIZA, GIZA_TIME, false).await.expect("degraded, not failed");
        assert_eq!(result.location_name, FLUX_ERROR_LOCATION);
        assert_eq!(result.description, FLUX_ERROR_DESCRIPTION);
        assert!(result.image_url.is_some());

        let image = model.last_image.lock().expect("lock").clone().expect("image request");
        assert!(image.prompt.starts_with(
            "Abstract glitched time travel visual, coordinates 29.9792, 31.1342, year -2560"
        ));
    }

    #[tokio::test]
    async fn image_failure_leaves_a_text_only_result() {
        let model = Arc::new(StubModel { image_fails: true, ..StubModel::answering(PYRAMID) });
        let result = travel_with(model).execute(GIZA, GIZA_TIME, false).await.expect("ok");
        assert!(result.image_url.is_none());
        assert_eq!(result.location_name, "Giza Plateau");
    }

    #[tokio::test]
    async fn image_response_without_inline_data_leaves_a_text_only_result() {
        let model = narrating(PYRAMID, vec![ResponsePart::text("I cannot draw that")]);
        let result = travel_with(model).execute(GIZA, GIZA_TIME, false).await.expect("ok");
        assert!(result.image_url.is_none());
        assert_eq!(result.description, "Limestone gleams.");
    }

    #[tokio::test]
    async fn empty_fields_fall_back_to_placeholders() {
        let model = narrating(r#"{"locationName":"","description":"","visualPrompt":""}"#, vec![]);
        let result = travel_with(model.clone()).execute(GIZA, GIZA_TIME, false).await.expect("ok");
        assert_eq!(result.location_name, UNKNOWN_LOCATION);
        assert_eq!(result.description, NO_DESCRIPTION);

        // An empty body behaves like `{}`.
        let model = narrating("", vec![]);
        let result = travel_with(model).execute(GIZA, GIZA_TIME, false).await.expect("ok");
        assert_eq!(result.location_name, UNKNOWN_LOCATION);
    }

    #[tokio::test]
    async fn null_field_falls_back_without_discarding_the_rest() {
        let model = narrating(
            r#"{"locationName":null,"description":"Real text.","visualPrompt":"p"}"#,
            vec![],
        );
        let result = travel_with(model).execute(GIZA, GIZA_TIME, false).await.expect("ok");
        assert_eq!(result.location_name, UNKNOWN_LOCATION);
        assert_eq!(result.description, "Real text.");
    }

    #[tokio::test]
    async fn wrong_typed_fields_are_treated_as_empty() {
        let model =
            narrating(r#"{"locationName":42,"description":["x"],"visualPrompt":"p"}"#, vec![]);
        let result = travel_with(model.clone()).execute(GIZA, GIZA_TIME, false).await.expect("ok");
        assert_eq!(result.location_name, UNKNOWN_LOCATION);
        assert_eq!(result.description, NO_DESCRIPTION);

        // Valid JSON that is not an object is still not a flux error.
        let model = narrating("[1, 2]", vec![]);
        let result = travel_with(model).execute(GIZA, GIZA_TIME, false).await.expect("ok");
        assert_eq!(result.location_name, UNKNOWN_LOCATION);
    }

    #[tokio::test]
    async fn time_is_passed_through_untouched() {
        let model = narrating(
            r#"{"locationName":"Rome","description":"d","visualPrompt":"p","year":1999}"#,
            vec![],
        );
        let time = TimeParams::new(117, 2, 30, 23, 59, 59);
        let result = travel_with(model).execute(GIZA, time, false).await.expect("ok");
        assert_eq!(result.time, time);
    }

    #[tokio::test(start_paused = true)]
    async fn mock_travel_never_touches_model_or_gate() {
        let model = Arc::new(StubModel::default());
        let selector = Arc::new(StubSelector::default());
        let gate = Arc::new(CredentialGate::Host(Box::new(SharedSelector(selector.clone()))));
        let travel = TimeTravel::new(
            model.clone(),
            gate,
            "text-model",
            "image-model",
            Duration::from_millis(2000),
        );

        let started = tokio::time::Instant::now();
        let result = travel.execute(GIZA, GIZA_TIME, true).await.expect("mock never fails");
        assert!(started.elapsed() >= Duration::from_millis(2000));
        assert!(mock::mock_results().contains(&result));
        assert_eq!(model.calls(), 0);
        assert_eq!(selector.checks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn first_image_url_skips_text_parts() {
        assert_eq!(first_image_url(&[]), None);
        assert_eq!(
            first_image_url(&[ResponsePart::text("a"), ResponsePart::image("image/webp", "Zm9v")]),
            Some("data:image/png;base64,Zm9v".to_string())
        );
    }
}
