use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use shared_logging::StageLogger;

use crate::client::RegistryError;

/// Output of a training run: which run produced the model and where the
/// artifact lives inside that run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Tracking run id.
    pub run_id: String,
    /// Artifact path relative to the run root.
    pub model_path: String,
}

impl ModelDescriptor {
    /// Creates a descriptor, rejecting empty fields.
    pub fn new(
        run_id: impl Into<String>,
        model_path: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let descriptor = Self {
            run_id: run_id.into(),
            model_path: model_path.into(),
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Parses `{"run_id": ..., "model_path": ...}`.
    pub fn from_json(raw: &str) -> Result<Self, RegistryError> {
        let descriptor: Self =
            serde_json::from_str(raw).map_err(|err| RegistryError::Descriptor(err.to_string()))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Reads the descriptor file written by the training stage.
    pub fn load(path: impl AsRef<Path>, logger: Option<&StageLogger>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|err| RegistryError::Descriptor(format!("reading {}: {err}", path.display())))?;
        let descriptor = Self::from_json(&raw).map_err(|err| match err {
            RegistryError::Descriptor(reason) => {
                RegistryError::Descriptor(format!("{}: {reason}", path.display()))
            }
            other => other,
        })?;
        if let Some(logger) = logger {
            logger.debug(format!("Model info loaded from {}", path.display()));
        }
        Ok(descriptor)
    }

    /// `runs:/<run_id>/<model_path>` reference understood by the registry.
    #[must_use]
    pub fn artifact_uri(&self) -> String {
        format!("runs:/{}/{}", self.run_id, self.model_path)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if self.run_id.trim().is_empty() {
            return Err(RegistryError::Descriptor("`run_id` is empty".into()));
        }
        if self.model_path.trim().is_empty() {
            return Err(RegistryError::Descriptor("`model_path` is empty".into()));
        }
        Ok(())
    }
}
