//! Application controller: the only owner of the user-facing state.
//!
//! State lives behind a mutex that is never held across an `.await`. Each
//! user action is single-flight: while a travel (or search) is running, a
//! second one is refused, and the flag is cleared when the call settles.

use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::{
    Config,
    credential::CredentialGate,
    error::{ControllerError, ExportError},
    events,
    input::{self, TargetVector},
    lookup::{EventLookup, MissPolicy},
    model::{Axis, Coordinates, EventMatch, Hemisphere, HistoricalEvent, TimeField, TimeParams, TravelResult},
    provider::GenerativeModel,
    souvenir::{self, SouvenirOptions},
    travel::TimeTravel,
};

/// Everything the front-end renders.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub target: Option<TargetVector>,
    pub time: TimeParams,
    pub result: Option<TravelResult>,
    pub error: Option<String>,
    pub is_traveling: bool,
    pub is_searching: bool,
    pub mock_mode: bool,
}

impl Snapshot {
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.target.map(|t| t.coordinates())
    }

    pub fn is_busy(&self) -> bool {
        self.is_traveling || self.is_searching
    }

    /// The travel action is enabled only with a target and nothing in flight.
    pub fn can_travel(&self) -> bool {
        self.target.is_some() && !self.is_busy()
    }
}

/// Which in-flight flag a guard owns.
#[derive(Debug, Clone, Copy)]
enum Flight {
    Travel,
    Search,
}

/// Clears its in-flight flag on drop, whatever the outcome.
struct FlightGuard<'a> {
    state: &'a Mutex<Snapshot>,
    flight: Flight,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        match self.flight {
            Flight::Travel => state.is_traveling = false,
            Flight::Search => state.is_searching = false,
        }
    }
}

fn lock(state: &Mutex<Snapshot>) -> MutexGuard<'_, Snapshot> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn jump_to(state: &mut Snapshot, event: &HistoricalEvent) {
    state.target = Some(TargetVector::from(event.coordinates));
    state.time = event.time;
}

#[derive(Debug)]
pub struct Controller {
    state: Mutex<Snapshot>,
    gate: Arc<CredentialGate>,
    lookup: EventLookup,
    travel: TimeTravel,
}

impl Controller {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        gate: Arc<CredentialGate>,
        config: &Config,
        initial_time: TimeParams,
    ) -> Self {
        let lookup = EventLookup::new(
            model.clone(),
            gate.clone(),
            config.models.text.clone(),
            config.mock.search_delay(),
            MissPolicy::from_zero_is_missing(config.lookup.zero_is_missing),
        );
        let travel = TimeTravel::new(
            model,
            gate.clone(),
            config.models.text.clone(),
            config.models.image.clone(),
            config.mock.travel_delay(),
        );
        let state = Snapshot {
            target: None,
            time: initial_time,
            result: None,
            error: None,
            is_traveling: false,
            is_searching: false,
            mock_mode: config.mock_mode,
        };
        Self { state: Mutex::new(state), gate, lookup, travel }
    }

    pub fn snapshot(&self) -> Snapshot {
        lock(&self.state).clone()
    }

    pub fn set_mock_mode(&self, mock_mode: bool) {
        lock(&self.state).mock_mode = mock_mode;
    }

    pub fn set_target(&self, coordinates: Coordinates) {
        lock(&self.state).target = Some(TargetVector::from(Coordinates::clamped(
            coordinates.latitude,
            coordinates.longitude,
        )));
    }

    pub fn set_time(&self, time: TimeParams) {
        lock(&self.state).time = input::normalize_time(time);
    }

    pub fn set_coordinate_magnitude(
        &self,
        axis: Axis,
        magnitude: &str,
        hemisphere: Hemisphere,
    ) -> Coordinates {
        let mut state = lock(&self.state);
        let target = state.target.get_or_insert_with(TargetVector::default);
        target.set_coordinate_magnitude(axis, magnitude, hemisphere)
    }

    pub fn set_time_field(&self, field: TimeField, value: &str) -> TimeParams {
        let mut state = lock(&self.state);
        state.time = input::set_time_field(state.time, field, value);
        state.time
    }

    pub fn set_year_manual(&self, value: &str) -> TimeParams {
        let mut state = lock(&self.state);
        state.time = input::set_year_manual(state.time, value);
        state.time
    }

    pub fn set_year_slider(&self, year: i64) -> TimeParams {
        let mut state = lock(&self.state);
        state.time = input::set_year_slider(state.time, year);
        state.time
    }

    /// Jump to a random seed event. Ignored (returns `None`) while anything is in flight.
    pub fn randomize(&self) -> Option<&'static HistoricalEvent> {
        let mut state = lock(&self.state);
        if state.is_busy() {
            return None;
        }
        let event = events::random_event();
        jump_to(&mut state, event);
        info!(event = event.id, "randomized target");
        Some(event)
    }

    /// Jump to the seed event with `id`. `None` if unknown or anything is in flight.
    pub fn select_event(&self, id: &str) -> Option<&'static HistoricalEvent> {
        let mut state = lock(&self.state);
        if state.is_busy() {
            return None;
        }
        let event = events::find_event(id)?;
        jump_to(&mut state, event);
        info!(event = event.id, "selected target");
        Some(event)
    }

    /// Resolve a free-text query into the target and time.
    ///
    /// A blank query or a search already in flight is a no-op returning `Ok(None)`.
    pub async fn search(&self, query: &str) -> Result<Option<EventMatch>, ControllerError> {
        let query = query.trim();
        let mock_mode = {
            let mut state = lock(&self.state);
            if query.is_empty() || state.is_searching {
                return Ok(None);
            }
            state.is_searching = true;
            state.error = None;
            state.mock_mode
        };
        let _flight = FlightGuard { state: &self.state, flight: Flight::Search };

        let found = self.lookup.lookup(query, mock_mode).await;

        let mut state = lock(&self.state);
        match found {
            Some(found) => {
                state.target = Some(TargetVector::from(found.coordinates));
                state.time = found.time;
                Ok(Some(found))
            }
            None => {
                let err = ControllerError::EventNotFound;
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Travel to the current target and time. The result is stored and returned.
    pub async fn travel(&self) -> Result<TravelResult, ControllerError> {
        let (coordinates, time, mock_mode) = {
            let mut state = lock(&self.state);
            if state.is_busy() {
                return Err(ControllerError::Busy);
            }
            let coordinates = state.coordinates().ok_or(ControllerError::NoTarget)?;
            state.is_traveling = true;
            state.error = None;
            (coordinates, state.time, state.mock_mode)
        };
        let _flight = FlightGuard { state: &self.state, flight: Flight::Travel };

        let outcome = self.run_travel(coordinates, time, mock_mode).await;

        let mut state = lock(&self.state);
        match outcome {
            Ok(result) => {
                state.result = Some(result.clone());
                Ok(result)
            }
            Err(err) => {
                warn!(error = %err, "travel failed");
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn run_travel(
        &self,
        coordinates: Coordinates,
        time: TimeParams,
        mock_mode: bool,
    ) -> Result<TravelResult, ControllerError> {
        if !mock_mode && !self.gate.ensure_credential().await {
            return Err(ControllerError::CredentialUnavailable);
        }
        self.travel
            .execute(coordinates, time, mock_mode)
            .await
            .map_err(ControllerError::DisplacementFailed)
    }

    /// Recovery action for credential errors. Does nothing in mock mode.
    pub async fn reset_credentials(&self) -> bool {
        if lock(&self.state).mock_mode {
            return false;
        }
        let ok = self.gate.reselect().await;
        if ok {
            lock(&self.state).error = None;
        }
        ok
    }

    /// Render the last result as a PNG. Errors leave the stored result alone.
    pub fn export_souvenir(&self, options: &SouvenirOptions) -> Result<Vec<u8>, ExportError> {
        let result = lock(&self.state).result.clone().ok_or(ExportError::NoResult)?;
        Ok(souvenir::render_souvenir(&result, options)?)
    }
}
