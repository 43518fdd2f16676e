use shared_logging::StageLogger;

use crate::{
    client::{ModelVersion, RegistryClient, RegistryError, RegistryTransport, Stage},
    descriptor::ModelDescriptor,
};

/// What happened to the promotion step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Version now sits in this stage.
    Transitioned(Stage),
    /// Promotion failed and was skipped.
    Skipped {
        /// Rendered failure.
        reason: String,
    },
}

/// Result of a registration: the version is always created, promotion may be skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationOutcome {
    /// Version returned by the create call.
    pub model_version: ModelVersion,
    /// Promotion result.
    pub stage: StageOutcome,
}

/// Creates a model version from a run artifact, then tries to promote it.
#[derive(Debug, Clone)]
pub struct ModelRegistrar<T> {
    client: RegistryClient<T>,
    target_stage: Stage,
    logger: Option<StageLogger>,
}

impl<T: RegistryTransport> ModelRegistrar<T> {
    /// Registrar promoting to `Staging`.
    pub const fn new(client: RegistryClient<T>) -> Self {
        Self {
            client,
            target_stage: Stage::Staging,
            logger: None,
        }
    }

    /// Overrides the promotion target.
    #[must_use]
    pub const fn with_target_stage(mut self, stage: Stage) -> Self {
        self.target_stage = stage;
        self
    }

    /// Attaches the stage logger.
    #[must_use]
    pub fn with_logger(mut self, logger: StageLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Client used for registry calls.
    pub const fn client(&self) -> &RegistryClient<T> {
        &self.client
    }

    /// Registers the descriptor's artifact under `model_name`.
    ///
    /// The create call is not retried and its failure is returned. A promotion
    /// failure from the server or the network is logged and reported as
    /// [`StageOutcome::Skipped`].
    pub async fn register(
        &self,
        model_name: &str,
        descriptor: &ModelDescriptor,
    ) -> Result<RegistrationOutcome, RegistryError> {
        let model_uri = descriptor.artifact_uri();
        let model_version = self
            .client
            .create_model_version(model_name, &model_uri, &descriptor.run_id)
            .await?;
        self.debug(format!(
            "Model {model_name} version {} registered (no wait).",
            model_version.version
        ));

        let stage = self.target_stage;
        self.debug(format!("Attempting to transition model to {stage}..."));
        let outcome = match self
            .client
            .transition_model_version_stage(model_name, &model_version.version, stage)
            .await
        {
            Ok(_) => {
                self.debug(format!(
                    "Model {model_name} version {} transitioned to {stage}.",
                    model_version.version
                ));
                StageOutcome::Transitioned(stage)
            }
            Err(err) if err.is_remote() => {
                if let Some(logger) = &self.logger {
                    logger.error(format!("Stage transition failed: {err}. Skipping stage update."));
                }
                StageOutcome::Skipped {
                    reason: err.to_string(),
                }
            }
            Err(err) => return Err(err),
        };

        Ok(RegistrationOutcome {
            model_version,
            stage: outcome,
        })
    }

    fn debug(&self, message: String) {
        if let Some(logger) = &self.logger {
            logger.debug(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::testing::{api_failure, transport_failure, ScriptedTransport};
    use serde_json::json;
    use shared_logging::LogLevel;
    use tempfile::tempdir;
    use tokio::runtime::Runtime;

    const CREATE: &str = "api/2.0/mlflow/model-versions/create";
    const TRANSITION: &str = "api/2.0/mlflow/model-versions/transition-stage";

    fn created(version: &str) -> serde_json::Value {
        json!({ "model_version": { "name": "yt_chrome_plugin_model", "version": version } })
    }

    fn descriptor() -> ModelDescriptor {
        ModelDescriptor::new("abc123", "model").unwrap()
    }

    #[test]
    fn registers_and_promotes_to_staging() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let transport = ScriptedTransport::new();
            transport.reply(created("7"));
            transport.reply(json!({
                "model_version": {
                    "name": "yt_chrome_plugin_model",
                    "version": "7",
                    "current_stage": "Staging"
                }
            }));
            let registrar = ModelRegistrar::new(RegistryClient::new(transport));
            let outcome = registrar
                .register("yt_chrome_plugin_model", &descriptor())
                .await
                .unwrap();
            assert_eq!(outcome.model_version.version, "7");
            assert_eq!(outcome.stage, StageOutcome::Transitioned(Stage::Staging));

            let calls = registrar.client().transport().calls();
            assert_eq!(calls.len(), 2);
            assert_eq!(calls[0].1["source"], "runs:/abc123/model");
            assert_eq!(calls[1].0, TRANSITION);
            assert_eq!(calls[1].1["version"], "7");
            assert_eq!(calls[1].1["stage"], "Staging");
        });
    }

    #[test]
    fn transition_api_failure_is_logged_and_skipped() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let dir = tempdir().unwrap();
            let logger = StageLogger::builder("model_registration")
                .quiet()
                .file(dir.path().join("model_registration_errors.log"), LogLevel::Error)
                .build()
                .unwrap();
            let transport = ScriptedTransport::new();
            transport.reply(created("2"));
            transport.fail(api_failure(TRANSITION, "INVALID_STATE"));
            let registrar =
                ModelRegistrar::new(RegistryClient::new(transport)).with_logger(logger.clone());
            let outcome = registrar
                .register("yt_chrome_plugin_model", &descriptor())
                .await
                .unwrap();
            assert_eq!(outcome.model_version.version, "2");
            assert!(matches!(outcome.stage, StageOutcome::Skipped { .. }));

            let log = fs::read_to_string(logger.file_path().unwrap()).unwrap();
            assert!(log.contains("Stage transition failed: INVALID_STATE"));
            assert!(log.contains("Skipping stage update."));
            assert!(!log.contains("registered (no wait)"));
        });
    }

    #[test]
    fn transition_transport_failure_is_skipped() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let transport = ScriptedTransport::new();
            transport.reply(created("4"));
            transport.fail(transport_failure(TRANSITION));
            let registrar = ModelRegistrar::new(RegistryClient::new(transport));
            let outcome = registrar
                .register("yt_chrome_plugin_model", &descriptor())
                .await
                .unwrap();
            assert!(matches!(outcome.stage, StageOutcome::Skipped { reason } if reason.contains("connection refused")));
        });
    }

    #[test]
    fn create_failure_propagates_without_transition() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let transport = ScriptedTransport::new();
            transport.fail(api_failure(CREATE, "RESOURCE_DOES_NOT_EXIST"));
            let registrar = ModelRegistrar::new(RegistryClient::new(transport));
            let err = registrar
                .register("yt_chrome_plugin_model", &descriptor())
                .await
                .unwrap_err();
            assert!(err.to_string().starts_with("RESOURCE_DOES_NOT_EXIST"));
            assert_eq!(registrar.client().transport().endpoints(), vec![CREATE]);
        });
    }

    #[test]
    fn custom_target_stage_is_sent() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let transport = ScriptedTransport::new();
            transport.reply(created("1"));
            transport.reply(created("1"));
            let registrar = ModelRegistrar::new(RegistryClient::new(transport))
                .with_target_stage(Stage::Production);
            let outcome = registrar
                .register("yt_chrome_plugin_model", &descriptor())
                .await
                .unwrap();
            assert_eq!(outcome.stage, StageOutcome::Transitioned(Stage::Production));
            assert_eq!(
                registrar.client().transport().calls()[1].1["stage"],
                "Production"
            );
        });
    }
}
