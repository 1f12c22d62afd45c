use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced to the user by [`crate::controller::Controller`].
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("API Key selection is required for Temporal Displacement.")]
    CredentialUnavailable,

    #[error("Event not found in historical database.")]
    EventNotFound,

    #[error("Temporal Displacement Failed. Systems Unstable.")]
    DisplacementFailed(#[source] anyhow::Error),

    #[error("No target coordinates selected.")]
    NoTarget,

    #[error("Another request is still in flight.")]
    Busy,
}

impl ControllerError {
    /// Whether re-opening credential selection may help.
    pub fn offers_credential_reset(&self) -> bool {
        matches!(self, ControllerError::CredentialUnavailable | ControllerError::DisplacementFailed(_))
    }
}

/// Souvenir export failures. They never touch the stored travel result.
#[derive(Debug, Error)]
pub enum SouvenirError {
    #[error("No usable font found (tried: {})", format_paths(.tried))]
    FontUnavailable { tried: Vec<PathBuf> },

    #[error("Failed to read font file {path}")]
    FontRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid font file {path}")]
    FontParse { path: PathBuf },

    #[error("Failed to encode souvenir image")]
    Encode(#[from] image::ImageError),
}

/// Souvenir export as seen through the controller.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No travel result to export.")]
    NoResult,

    #[error(transparent)]
    Souvenir(#[from] SouvenirError),
}

fn format_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "none".to_string();
    }
    paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}
