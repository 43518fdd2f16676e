use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use sentops_preprocessing::PreprocessingSettings;
use sentops_registry::{RegistrationSettings, SmokeSettings, TrackingSettings};
use serde::{Deserialize, Serialize};

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "sentops.toml";

/// Environment variable overriding `tracking.uri`.
pub const TRACKING_URI_ENV: &str = "MLFLOW_TRACKING_URI";

/// Whole pipeline configuration, one table per stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    pub tracking: TrackingSettings,
    pub preprocessing: PreprocessingSettings,
    pub registration: RegistrationSettings,
    pub smoke: SmokeSettings,
}

impl PipelineConfig {
    /// Loads `explicit`, or [`DEFAULT_CONFIG`] when it exists, or the defaults.
    /// The tracking URI env override is applied before validation.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG).is_file() => Self::from_file(DEFAULT_CONFIG)?,
            None => Self::default(),
        };
        config.override_tracking_uri(std::env::var(TRACKING_URI_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file without validating it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Replaces the tracking URI when `uri` is set and non-blank.
    pub fn override_tracking_uri(&mut self, uri: Option<String>) {
        if let Some(uri) = uri.filter(|uri| !uri.trim().is_empty()) {
            self.tracking.uri = uri;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.tracking.validate()?;
        if self.preprocessing.text_column.trim().is_empty() {
            bail!("preprocessing text_column is empty");
        }
        self.registration.validate()
    }
}
