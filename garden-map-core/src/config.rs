//! Garden map configuration
//!
//! Loads the map, loader and container-wait settings from YAML. The SDK
//! credential never lives in the file; it comes from the environment.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::loader::LoaderSettings;
use crate::options::{DisplayOptions, DrawingOptions, InitOptions, LatLng, MarkerIcon};

/// Environment variable holding the SDK access credential
pub const CREDENTIAL_ENV_VAR: &str = "GOOGLE_MAPS_API_KEY";

/// Default interval between container availability checks
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default number of checks before giving up (≈ 5 seconds)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 50;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GardenMapConfig {
    pub map: MapSection,
    pub loader: LoaderSettings,
    pub container: ContainerWait,
}

/// What the map shows and whether drawing is enabled
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapSection {
    pub center: LatLng,
    pub zoom: f64,
    pub drawing_enabled: bool,
    pub marker_title: String,
    pub marker_icon: MarkerIcon,
    pub display: DisplayOptions,
    pub drawing: DrawingOptions,
}

impl Default for MapSection {
    fn default() -> Self {
        let init = InitOptions::default();
        Self {
            center: LatLng::property_center(),
            zoom: 18.0,
            drawing_enabled: true,
            marker_title: init.marker_title,
            marker_icon: init.marker_icon,
            display: init.display,
            drawing: DrawingOptions::default(),
        }
    }
}

/// Bounded wait for the host container
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContainerWait {
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for ContainerWait {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ContainerWait {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Upper bound on the time spent waiting for a container.
    pub fn budget(&self) -> Duration {
        self.poll_interval() * self.max_attempts
    }
}

impl GardenMapConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Options for one map initialization derived from the `map` section.
    pub fn init_options(&self) -> InitOptions {
        InitOptions {
            display: self.map.display.clone(),
            marker_title: self.map.marker_title.clone(),
            marker_icon: self.map.marker_icon.clone(),
            drawing: self
                .map
                .drawing_enabled
                .then(|| self.map.drawing.clone()),
        }
    }
}

/// Opaque SDK access credential
///
/// `Debug` and `Display` never print the key itself.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Read the credential from [`CREDENTIAL_ENV_VAR`].
    ///
    /// Returns `None` when the variable is unset or blank.
    pub fn from_env() -> Option<Self> {
        std::env::var(CREDENTIAL_ENV_VAR)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(Self)
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"<redacted>").finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("<empty>")
        } else {
            f.write_str("<redacted>")
        }
    }
}
