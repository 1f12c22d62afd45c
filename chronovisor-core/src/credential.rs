//! Credential gate: makes sure an API key is available before a live call.
//!
//! The host either drives an interactive key-selection flow ([`KeySelector`])
//! or offers nothing, in which case a static key from config/environment is
//! all there is. Mock mode never reaches this module.

use async_trait::async_trait;
use std::{
    fmt,
    sync::{Arc, RwLock},
};
use tracing::{info, warn};

/// Shared, late-bound API key. The gate writes it; the model client reads it per request.
#[derive(Clone, Default)]
pub struct ApiKeySlot(Arc<RwLock<Option<String>>>);

impl ApiKeySlot {
    pub fn new(key: Option<String>) -> Self {
        Self(Arc::new(RwLock::new(key)))
    }

    pub fn get(&self) -> Option<String> {
        match self.0.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set(&self, key: Option<String>) {
        match self.0.write() {
            Ok(mut guard) => *guard = key,
            Err(poisoned) => *poisoned.into_inner() = key,
        }
    }

    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }
}

impl fmt::Debug for ApiKeySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_set() { "<set>" } else { "<unset>" };
        f.debug_tuple("ApiKeySlot").field(&state).finish()
    }
}

/// Host-provided interactive key selection.
#[async_trait]
pub trait KeySelector: Send + Sync + fmt::Debug {
    async fn has_selected_api_key(&self) -> bool;

    /// Run the selection flow. An error means the user cancelled or it failed.
    async fn open_select_key(&self) -> anyhow::Result<()>;
}

#[derive(Debug)]
pub enum CredentialGate {
    /// The host manages key selection.
    Host(Box<dyn KeySelector>),
    /// No host flow; only a key supplied up front counts.
    Static(ApiKeySlot),
}

impl CredentialGate {
    /// True when a live call may proceed.
    ///
    /// After a host selection flow completes this returns `true` without
    /// re-checking, since the selected key may not be visible yet.
    pub async fn ensure_credential(&self) -> bool {
        match self {
            CredentialGate::Host(selector) => {
                if selector.has_selected_api_key().await {
                    return true;
                }
                info!("no API key selected, opening key selection");
                match selector.open_select_key().await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "key selection cancelled or failed");
                        false
                    }
                }
            }
            CredentialGate::Static(slot) => slot.is_set(),
        }
    }

    /// Recovery action: re-open the selection flow regardless of current state.
    pub async fn reselect(&self) -> bool {
        match self {
            CredentialGate::Host(selector) => match selector.open_select_key().await {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "key reselection cancelled or failed");
                    false
                }
            },
            CredentialGate::Static(_) => false,
        }
    }

    pub fn is_host_managed(&self) -> bool {
        matches!(self, CredentialGate::Host(_))
    }
}
