//! Core library for the `chronovisor` time-travel viewer.
//!
//! This crate defines:
//! - The coordinate/time input model and its clamping rules
//! - Event lookup and the two-stage travel pipeline over a generative model
//! - The credential gate and the application controller tying them together
//! - Souvenir export and configuration handling
//!
//! It is used by `chronovisor-cli`, but can also back other front-ends.

pub mod config;
pub mod controller;
pub mod credential;
pub mod error;
pub mod events;
pub mod input;
pub mod lookup;
pub mod mock;
pub mod model;
pub mod provider;
pub mod souvenir;
pub mod travel;

pub use config::Config;
pub use controller::{Controller, Snapshot};
pub use credential::{ApiKeySlot, CredentialGate, KeySelector};
pub use error::{ControllerError, ExportError, SouvenirError};
pub use model::{
    Axis, Coordinates, Era, EventMatch, Hemisphere, HistoricalEvent, TimeField, TimeParams,
    TravelResult,
};
pub use provider::{GenerativeModel, model_from_config};
pub use souvenir::SouvenirOptions;
