use rand::Rng;
use shared_logging::StageLogger;

use crate::client::{RegistryClient, RegistryError, RegistryTransport, RunStatus};

/// Values logged by a smoke run.
#[derive(Debug, Clone, PartialEq)]
pub struct SmokeReport {
    /// Run created for the check.
    pub run_id: String,
    /// Parameters sent, in order.
    pub params: Vec<(String, String)>,
    /// Metrics sent, in order.
    pub metrics: Vec<(String, f64)>,
}

/// Opens a throwaway run and logs random params and metrics to prove the
/// tracking server accepts writes.
#[derive(Debug, Clone)]
pub struct TrackingSmokeRun<T> {
    client: RegistryClient<T>,
    experiment_id: String,
    logger: Option<StageLogger>,
}

impl<T: RegistryTransport> TrackingSmokeRun<T> {
    /// Creates a smoke run targeting `experiment_id`.
    pub fn new(client: RegistryClient<T>, experiment_id: impl Into<String>) -> Self {
        Self {
            client,
            experiment_id: experiment_id.into(),
            logger: None,
        }
    }

    /// Attaches the stage logger.
    #[must_use]
    pub fn with_logger(mut self, logger: StageLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Client used for tracking calls.
    pub const fn client(&self) -> &RegistryClient<T> {
        &self.client
    }

    /// Runs the check. If logging fails after the run was opened, the run is
    /// marked `FAILED` before the error is returned.
    pub async fn execute<R: Rng + Send>(&self, rng: &mut R) -> Result<SmokeReport, RegistryError> {
        let run = self.client.create_run(&self.experiment_id).await?;
        if let Some(logger) = &self.logger {
            logger.debug(format!(
                "Started run {} in experiment {}",
                run.run_id, self.experiment_id
            ));
        }
        let params = vec![
            ("param1".to_string(), rng.gen_range(1..=100).to_string()),
            ("param2".to_string(), rng.gen::<f64>().to_string()),
        ];
        let metrics = vec![
            ("metric1".to_string(), rng.gen::<f64>()),
            ("metric2".to_string(), rng.gen_range(0.5..1.5)),
        ];

        match self.log_all(&run.run_id, &params, &metrics).await {
            Ok(()) => {
                self.client.update_run(&run.run_id, RunStatus::Finished).await?;
                if let Some(logger) = &self.logger {
                    logger.info("Logged random parameters and metrics.");
                }
                Ok(SmokeReport {
                    run_id: run.run_id,
                    params,
                    metrics,
                })
            }
            Err(err) => {
                if let Err(close_err) = self.client.update_run(&run.run_id, RunStatus::Failed).await {
                    if let Some(logger) = &self.logger {
                        logger.warn(format!("Could not mark run {} failed: {close_err}", run.run_id));
                    }
                }
                Err(err)
            }
        }
    }

    async fn log_all(
        &self,
        run_id: &str,
        params: &[(String, String)],
        metrics: &[(String, f64)],
    ) -> Result<(), RegistryError> {
        for (key, value) in params {
            self.client.log_param(run_id, key, value).await?;
        }
        for (key, value) in metrics {
            self.client.log_metric(run_id, key, *value).await?;
        }
        Ok(())
    }
}
