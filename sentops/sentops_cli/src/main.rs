mod config;

use std::{
    env,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::{rngs::SmallRng, SeedableRng};
use sentops_preprocessing::{PreprocessingSettings, PreprocessingStage};
use sentops_registry::{
    HttpTransport, ModelDescriptor, ModelRegistrar, RegistrationSettings, RegistryClient,
    SmokeSettings, StageOutcome, TrackingSmokeRun,
};
use serde_json::json;
use shared_logging::{LogLevel, StageLogger};
use tokio::runtime::{Builder, Runtime};

use crate::config::PipelineConfig;

/// Logger name and failure wording of one CLI stage.
#[derive(Debug, Clone, Copy)]
struct StageInfo {
    logger: &'static str,
    process: &'static str,
}

const PREPROCESSING: StageInfo = StageInfo {
    logger: PreprocessingStage::LOGGER_NAME,
    process: "data preprocessing",
};
const REGISTRATION: StageInfo = StageInfo {
    logger: "model_registration",
    process: "model registration",
};
const SMOKE: StageInfo = StageInfo {
    logger: "tracking_smoke",
    process: "tracking smoke run",
};

impl StageInfo {
    /// Opens the stage logger. If the error file cannot be opened the failure
    /// is reported on a console-only logger.
    fn open_logger(self, error_log: PathBuf) -> Result<StageLogger> {
        StageLogger::builder(self.logger)
            .console_level(LogLevel::Debug)
            .file(error_log, LogLevel::Error)
            .build()
            .with_context(|| format!("setting up {} logger", self.logger))
            .map_err(|err| self.fail(&StageLogger::console(self.logger, LogLevel::Debug), err))
    }

    /// Loads the config. A load failure is written to `fallback_log`, since the
    /// configured log path is unknown at that point.
    fn load_config(self, path: Option<&Path>, fallback_log: PathBuf) -> Result<PipelineConfig> {
        PipelineConfig::load(path).map_err(|err| match self.open_logger(fallback_log) {
            Ok(logger) => self.fail(&logger, err),
            Err(_) => err,
        })
    }

    fn fail(self, logger: &StageLogger, err: anyhow::Error) -> anyhow::Error {
        logger.error(format!("Failed to complete the {} process: {err:#}", self.process));
        err
    }
}

#[derive(Parser, Debug)]
#[command(name = "sentops", version, about = "Comment-sentiment pipeline stages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalizes the raw train/test comment CSVs.
    Preprocess {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        raw_dir: Option<PathBuf>,
        #[arg(long)]
        interim_dir: Option<PathBuf>,
    },
    /// Registers the trained model and promotes it.
    Register {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        model_info: Option<PathBuf>,
        #[arg(long)]
        model_name: Option<String>,
    },
    /// Logs a throwaway run to check the tracking server.
    SmokeRun {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        experiment_id: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Preprocess {
            config,
            raw_dir,
            interim_dir,
        } => {
            let mut config = PREPROCESSING
                .load_config(config.as_deref(), PreprocessingSettings::default().error_log)?;
            let settings = &mut config.preprocessing;
            if let Some(dir) = raw_dir {
                settings.raw_dir = dir;
            }
            if let Some(dir) = interim_dir {
                settings.interim_dir = dir;
            }
            let logger = PREPROCESSING.open_logger(settings.error_log.clone())?;
            let stage = PreprocessingStage::new(config.preprocessing, logger.clone());
            let report = stage
                .run()
                .map_err(|err| PREPROCESSING.fail(&logger, err))?;
            let summary = json!({
                "train_rows": report.train.rows,
                "train_fallbacks": report.train.fallbacks,
                "test_rows": report.test.rows,
                "test_fallbacks": report.test.fallbacks,
                "train_output": report.train_output,
                "test_output": report.test_output,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Commands::Register {
            config,
            model_info,
            model_name,
        } => {
            let mut config = REGISTRATION
                .load_config(config.as_deref(), RegistrationSettings::default().error_log)?;
            let settings = &mut config.registration;
            if let Some(path) = model_info {
                settings.model_info = path;
            }
            if let Some(name) = model_name {
                settings.model_name = name;
            }
            let logger = REGISTRATION.open_logger(settings.error_log.clone())?;
            register(&config, &logger).map_err(|err| REGISTRATION.fail(&logger, err))
        }
        Commands::SmokeRun {
            config,
            experiment_id,
        } => {
            let mut config =
                SMOKE.load_config(config.as_deref(), SmokeSettings::default().error_log)?;
            if let Some(id) = experiment_id {
                config.tracking.experiment_id = id;
            }
            let logger = SMOKE.open_logger(config.smoke.error_log.clone())?;
            smoke_run(&config, &logger).map_err(|err| SMOKE.fail(&logger, err))
        }
    }
}

fn register(config: &PipelineConfig, logger: &StageLogger) -> Result<()> {
    let settings = &config.registration;
    let descriptor = ModelDescriptor::load(&settings.model_info, Some(logger))?;
    let registrar = ModelRegistrar::new(RegistryClient::new(http_transport(&config.tracking.uri)))
        .with_target_stage(settings.stage()?)
        .with_logger(logger.clone());
    let outcome = runtime()?.block_on(registrar.register(&settings.model_name, &descriptor))?;
    let stage = match &outcome.stage {
        StageOutcome::Transitioned(stage) => json!({ "stage": stage, "skipped": false }),
        StageOutcome::Skipped { reason } => json!({ "skipped": true, "reason": reason }),
    };
    let summary = json!({
        "model_name": outcome.model_version.name,
        "version": outcome.model_version.version,
        "promotion": stage,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn smoke_run(config: &PipelineConfig, logger: &StageLogger) -> Result<()> {
    let client = RegistryClient::new(http_transport(&config.tracking.uri));
    let smoke = TrackingSmokeRun::new(client, config.tracking.experiment_id.clone())
        .with_logger(logger.clone());
    let mut rng = SmallRng::from_entropy();
    let report = runtime()?.block_on(smoke.execute(&mut rng))?;
    let summary = json!({
        "run_id": report.run_id,
        "params": report.params,
        "metrics": report.metrics,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")
}

/// Credentials come from the same variables the MLflow clients read.
fn http_transport(uri: &str) -> HttpTransport {
    let transport = HttpTransport::new(uri);
    if let Ok(token) = env::var("MLFLOW_TRACKING_TOKEN") {
        return transport.with_bearer_token(token);
    }
    match (
        env::var("MLFLOW_TRACKING_USERNAME"),
        env::var("MLFLOW_TRACKING_PASSWORD"),
    ) {
        (Ok(username), Ok(password)) => transport.with_basic_auth(username, password),
        _ => transport,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_stage_overrides() {
        let cli = Cli::try_parse_from([
            "sentops",
            "register",
            "--model-info",
            "out/info.json",
            "--model-name",
            "comment_model",
        ])
        .unwrap();
        match cli.command {
            Commands::Register {
                config,
                model_info,
                model_name,
            } => {
                assert!(config.is_none());
                assert_eq!(model_info, Some(PathBuf::from("out/info.json")));
                assert_eq!(model_name.as_deref(), Some("comment_model"));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["sentops", "smoke-run", "--experiment-id", "3"]).is_ok());
        assert!(Cli::try_parse_from(["sentops", "train"]).is_err());
    }

    #[test]
    fn preprocess_runs_end_to_end() {
        let dir = tempdir().unwrap();
        let raw = dir.path().join("raw");
        fs::create_dir_all(&raw).unwrap();
        fs::write(raw.join("train.csv"), "clean_comment,category\nThe videos are great,1\n").unwrap();
        fs::write(raw.join("test.csv"), "clean_comment,category\nNot for me,-1\n").unwrap();
        let config = dir.path().join("sentops.toml");
        fs::write(
            &config,
            format!(
                "[preprocessing]\nerror_log = {:?}\n",
                dir.path().join("preprocessing_errors.log").display().to_string()
            ),
        )
        .unwrap();
        let interim = dir.path().join("interim");

        let cli = Cli::try_parse_from([
            "sentops".to_string(),
            "preprocess".to_string(),
            "--config".to_string(),
            config.display().to_string(),
            "--raw-dir".to_string(),
            raw.display().to_string(),
            "--interim-dir".to_string(),
            interim.display().to_string(),
        ])
        .unwrap();
        run(cli).unwrap();

        let train = fs::read_to_string(interim.join("train_processed.csv")).unwrap();
        assert!(train.contains("video great"));
        let test = fs::read_to_string(interim.join("test_processed.csv")).unwrap();
        assert!(test.contains("not"));
    }

    #[test]
    fn failed_stage_is_logged_to_error_file() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("model_registration_errors.log");
        let config = dir.path().join("sentops.toml");
        fs::write(
            &config,
            format!(
                "[registration]\nmodel_info = {:?}\nerror_log = {:?}\n",
                dir.path().join("missing.json").display().to_string(),
                log.display().to_string()
            ),
        )
        .unwrap();
        let cli = Cli::try_parse_from([
            "sentops".to_string(),
            "register".to_string(),
            "--config".to_string(),
            config.display().to_string(),
        ])
        .unwrap();
        assert!(run(cli).is_err());
        let written = fs::read_to_string(&log).unwrap();
        assert!(written.contains("Failed to complete the model registration process"));
        assert!(written.contains("missing.json"));
    }

    #[test]
    fn config_failure_is_logged_to_fallback_file() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("broken.toml");
        fs::write(&config, "[registration\nmodel_name = 1").unwrap();
        let log = dir.path().join("model_registration_errors.log");
        let err = REGISTRATION
            .load_config(Some(config.as_path()), log.clone())
            .unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
        let written = fs::read_to_string(&log).unwrap();
        assert!(written.contains(" - model_registration - ERROR - "));
        assert!(written.contains("Failed to complete the model registration process"));
        assert!(written.contains("broken.toml"));
    }

    #[test]
    fn unusable_error_log_fails_the_stage() {
        let dir = tempdir().unwrap();
        let err = SMOKE.open_logger(dir.path().to_path_buf()).unwrap_err();
        assert!(format!("{err:#}").contains("tracking_smoke logger"));
    }

    #[test]
    fn current_thread_runtime_drives_futures() {
        let value = runtime().unwrap().block_on(async { 40 + 2 });
        assert_eq!(value, 42);
    }
}
