use std::path::PathBuf;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::client::Stage;

/// Tracking server the registry and smoke stages talk to (`[tracking]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrackingSettings {
    /// Base URL of the MLflow server.
    pub uri: String,
    /// Experiment that smoke runs are opened in.
    pub experiment_id: String,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            uri: "http://52.204.155.208:8000/".into(),
            experiment_id: "0".into(),
        }
    }
}

impl TrackingSettings {
    /// Rejects URIs that are not plain http(s) and empty experiment ids.
    pub fn validate(&self) -> Result<()> {
        let uri = self.uri.trim();
        let host = uri
            .strip_prefix("http://")
            .or_else(|| uri.strip_prefix("https://"));
        match host {
            Some(rest) if !rest.trim_matches('/').is_empty() => {}
            _ => bail!("tracking uri must be an http(s) URL, got {:?}", self.uri),
        }
        if self.experiment_id.trim().is_empty() {
            bail!("tracking experiment_id is empty");
        }
        Ok(())
    }
}

/// Settings for the registration stage (`[registration]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RegistrationSettings {
    /// Registered model name.
    pub model_name: String,
    /// Descriptor file written by training.
    pub model_info: PathBuf,
    /// Stage the new version is promoted to.
    pub target_stage: String,
    /// Error log written by this stage.
    pub error_log: PathBuf,
}

impl Default for RegistrationSettings {
    fn default() -> Self {
        Self {
            model_name: "yt_chrome_plugin_model".into(),
            model_info: PathBuf::from("experiment_info.json"),
            target_stage: Stage::Staging.as_str().into(),
            error_log: PathBuf::from("model_registration_errors.log"),
        }
    }
}

impl RegistrationSettings {
    /// Parsed promotion target.
    pub fn stage(&self) -> Result<Stage> {
        self.target_stage
            .parse()
            .map_err(|err: String| anyhow::anyhow!("registration target_stage: {err}"))
    }

    /// Rejects an empty model name or an unknown stage.
    pub fn validate(&self) -> Result<()> {
        if self.model_name.trim().is_empty() {
            bail!("registration model_name is empty");
        }
        self.stage().map(drop)
    }
}

/// Settings for the tracking smoke run (`[smoke]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SmokeSettings {
    /// Error log written by this stage.
    pub error_log: PathBuf,
}

impl Default for SmokeSettings {
    fn default() -> Self {
        Self {
            error_log: PathBuf::from("tracking_smoke_errors.log"),
        }
    }
}
