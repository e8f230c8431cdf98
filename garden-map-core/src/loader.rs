//! LoaderCoordinator - single-flight loading of the mapping SDK
//!
//! The SDK is a shared resource of the host: fetching it twice corrupts the
//! host's global state. One coordinator is built by the composition root and
//! shared by `Arc` with every map that needs the SDK.
//!
//! ## Load state
//!
//! ```text
//!   NotStarted ──ensure_loaded──▶ Loading(shared op) ──ok──▶ Loaded
//!        ▲                               │
//!        └────────────── err ────────────┘
//! ```
//!
//! Callers arriving while `Loading` join the shared operation, so all of them
//! observe the identical outcome. The fetch runs in its own task and settles
//! the state even if every caller stops waiting.

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Deserialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

use crate::config::Credential;
use crate::lock;
use crate::provider::MapsProvider;

/// Base URL of the SDK script
pub const SDK_SCRIPT_URL: &str = "https://maps.googleapis.com/maps/api/js";

/// Feature libraries requested with the SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SdkLibrary {
    Maps,
    Drawing,
    Geometry,
    Places,
    Marker,
}

impl SdkLibrary {
    pub fn as_str(&self) -> &'static str {
        match self {
            SdkLibrary::Maps => "maps",
            SdkLibrary::Drawing => "drawing",
            SdkLibrary::Geometry => "geometry",
            SdkLibrary::Places => "places",
            SdkLibrary::Marker => "marker",
        }
    }
}

/// Coordinator-wide fetch settings
///
/// Every fetch uses the same library set so that one load satisfies every
/// consumer regardless of which features it needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    pub version: String,
    pub libraries: Vec<SdkLibrary>,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            version: "weekly".to_string(),
            libraries: vec![SdkLibrary::Maps, SdkLibrary::Drawing, SdkLibrary::Geometry],
        }
    }
}

/// One SDK fetch as handed to the provider
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub credential: Credential,
    pub version: String,
    pub libraries: Vec<SdkLibrary>,
}

impl LoadRequest {
    pub fn new(credential: Credential, settings: &LoaderSettings) -> Self {
        Self {
            credential,
            version: settings.version.clone(),
            libraries: settings.libraries.clone(),
        }
    }

    /// Script URL a browser loader would inject for this request.
    pub fn script_url(&self) -> String {
        let libraries: Vec<&str> = self.libraries.iter().map(SdkLibrary::as_str).collect();
        let mut url = format!(
            "{SDK_SCRIPT_URL}?key={}&v={}",
            self.credential.expose(),
            self.version
        );
        if !libraries.is_empty() {
            url.push_str("&libraries=");
            url.push_str(&libraries.join(","));
        }
        url.push_str("&loading=async");
        url
    }
}

/// Errors from [`LoaderCoordinator::ensure_loaded`]
///
/// `Clone` because one failed fetch is handed to every joined caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("SDK credential must not be empty")]
    EmptyCredential,
    #[error("SDK load failed: {0}")]
    LoadFailure(String),
}

/// Public view of the load state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    NotStarted,
    Loading,
    Loaded,
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::NotStarted => f.write_str("not_started"),
            LoadStatus::Loading => f.write_str("loading"),
            LoadStatus::Loaded => f.write_str("loaded"),
        }
    }
}

type PendingLoad = Shared<BoxFuture<'static, Result<(), LoadError>>>;

enum LoadState {
    NotStarted,
    Loading(PendingLoad),
    Loaded,
}

struct LoaderState {
    load: LoadState,
    /// Bumped on every fetch start and reset; a fetch only settles the state
    /// of its own generation.
    generation: u64,
}

impl LoaderState {
    fn settle(&mut self, generation: u64, outcome: &Result<(), LoadError>) {
        if self.generation != generation {
            return;
        }
        self.load = match outcome {
            Ok(()) => LoadState::Loaded,
            Err(_) => LoadState::NotStarted,
        };
    }
}

/// Deduplicates SDK loads across every map in the process
pub struct LoaderCoordinator {
    provider: Arc<dyn MapsProvider>,
    settings: LoaderSettings,
    state: Arc<Mutex<LoaderState>>,
}

impl LoaderCoordinator {
    pub fn new(provider: Arc<dyn MapsProvider>, settings: LoaderSettings) -> Self {
        Self {
            provider,
            settings,
            state: Arc::new(Mutex::new(LoaderState {
                load: LoadState::NotStarted,
                generation: 0,
            })),
        }
    }

    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    /// Ensure the SDK is loaded, starting or joining the fetch as needed.
    ///
    /// Resolves immediately once loaded. A failed fetch is reported to every
    /// caller that joined it and returns the coordinator to `NotStarted`.
    pub async fn ensure_loaded(&self, credential: &Credential) -> Result<(), LoadError> {
        if credential.is_empty() {
            return Err(LoadError::EmptyCredential);
        }

        let pending = {
            let mut state = lock(&self.state);
            let in_flight = match &state.load {
                LoadState::Loaded => {
                    debug!("Maps SDK already loaded");
                    return Ok(());
                }
                LoadState::Loading(pending) => Some(pending.clone()),
                LoadState::NotStarted => None,
            };
            match in_flight {
                Some(pending) => {
                    debug!("Maps SDK load in progress, joining");
                    pending
                }
                None => {
                    let pending = self.start_fetch(&mut state, credential);
                    state.load = LoadState::Loading(pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    pub fn is_loaded(&self) -> bool {
        matches!(lock(&self.state).load, LoadState::Loaded)
    }

    pub fn status(&self) -> LoadStatus {
        match lock(&self.state).load {
            LoadState::NotStarted => LoadStatus::NotStarted,
            LoadState::Loading(_) => LoadStatus::Loading,
            LoadState::Loaded => LoadStatus::Loaded,
        }
    }

    /// Forget the load state. Test isolation only.
    ///
    /// A fetch still in flight keeps running but no longer settles the state.
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        state.generation += 1;
        state.load = LoadState::NotStarted;
        debug!("Maps SDK loader reset");
    }

    fn start_fetch(&self, state: &mut LoaderState, credential: &Credential) -> PendingLoad {
        state.generation += 1;
        let generation = state.generation;
        let request = LoadRequest::new(credential.clone(), &self.settings);

        info!(
            version = %request.version,
            libraries = ?request.libraries,
            generation,
            "Loading Maps SDK"
        );

        let provider = Arc::clone(&self.provider);
        let fetch_state = Arc::clone(&self.state);
        let task = tokio::spawn(async move {
            let outcome = provider
                .fetch(&request)
                .await
                .map_err(|e| LoadError::LoadFailure(e.to_string()));
            match &outcome {
                Ok(()) => info!(generation, "Maps SDK loaded"),
                Err(e) => error!(generation, error = %e, "Maps SDK load failed"),
            }
            lock(&fetch_state).settle(generation, &outcome);
            outcome
        });

        let join_state = Arc::clone(&self.state);
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let outcome = Err(LoadError::LoadFailure(format!("fetch task aborted: {e}")));
                    lock(&join_state).settle(generation, &outcome);
                    outcome
                }
            }
        }
        .boxed()
        .shared()
    }
}
