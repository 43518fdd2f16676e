use std::{fmt, str::FromStr};

use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

const CREATE_MODEL_VERSION: &str = "api/2.0/mlflow/model-versions/create";
const TRANSITION_STAGE: &str = "api/2.0/mlflow/model-versions/transition-stage";
const CREATE_RUN: &str = "api/2.0/mlflow/runs/create";
const LOG_PARAMETER: &str = "api/2.0/mlflow/runs/log-parameter";
const LOG_METRIC: &str = "api/2.0/mlflow/runs/log-metric";
const UPDATE_RUN: &str = "api/2.0/mlflow/runs/update";

/// Errors surfaced by the tracking/registry client.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The server answered with a non-success status.
    #[error("{error_code}: {message} (HTTP {status} from {endpoint})")]
    Api {
        /// Endpoint path.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// MLflow error code, e.g. `RESOURCE_DOES_NOT_EXIST`.
        error_code: String,
        /// Server-provided message.
        message: String,
    },
    /// The request never produced a response.
    #[error("transport error calling {endpoint}: {reason}")]
    Transport {
        /// Endpoint path.
        endpoint: String,
        /// Client error description.
        reason: String,
    },
    /// The response body did not have the expected shape.
    #[error("unexpected response from {endpoint}: {reason}")]
    Decode {
        /// Endpoint path.
        endpoint: String,
        /// Decoder error description.
        reason: String,
    },
    /// The model descriptor is unreadable or incomplete.
    #[error("invalid model descriptor: {0}")]
    Descriptor(String),
}

impl RegistryError {
    /// True for server-side and transport failures, the two classes a caller may
    /// choose to tolerate.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Api { .. } | Self::Transport { .. })
    }
}

/// Sends JSON requests to the tracking server.
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    /// POSTs `body` to `endpoint` (relative to the server root) and returns the JSON reply.
    async fn post(&self, endpoint: &str, body: Value) -> Result<Value, RegistryError>;
}

#[derive(Debug, Clone)]
enum Credentials {
    Bearer(String),
    Basic { username: String, password: String },
}

/// reqwest-backed transport talking to one tracking server.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl HttpTransport {
    /// Creates a transport rooted at `base_url` (e.g. `http://host:8000/`).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: None,
        }
    }

    /// Sends `Authorization: Bearer <token>` on every request.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::Bearer(token.into()));
        self
    }

    /// Sends HTTP basic auth on every request.
    #[must_use]
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::Basic {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Server root without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

#[async_trait]
impl RegistryTransport for HttpTransport {
    async fn post(&self, endpoint: &str, body: Value) -> Result<Value, RegistryError> {
        let transport = |err: reqwest::Error| RegistryError::Transport {
            endpoint: endpoint.to_string(),
            reason: err.to_string(),
        };
        let mut request = self.client.post(self.url(endpoint)).json(&body);
        request = match &self.credentials {
            Some(Credentials::Bearer(token)) => request.bearer_auth(token),
            Some(Credentials::Basic { username, password }) => {
                request.basic_auth(username, Some(password))
            }
            None => request,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;
        if !status.is_success() {
            return Err(api_error(endpoint, status.as_u16(), &text));
        }
        if text.trim().is_empty() {
            return Ok(json!({}));
        }
        serde_json::from_str(&text).map_err(|err| RegistryError::Decode {
            endpoint: endpoint.to_string(),
            reason: err.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error_code: Option<String>,
    message: Option<String>,
}

fn api_error(endpoint: &str, status: u16, body: &str) -> RegistryError {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    let error_code = parsed
        .as_ref()
        .and_then(|b| b.error_code.clone())
        .unwrap_or_else(|| "UNKNOWN_ERROR".into());
    let message = parsed
        .and_then(|b| b.message)
        .unwrap_or_else(|| body.trim().chars().take(512).collect());
    RegistryError::Api {
        endpoint: endpoint.to_string(),
        status,
        error_code,
        message,
    }
}

/// Model lifecycle stages understood by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// No stage assigned.
    None,
    /// Pre-production validation.
    Staging,
    /// Serving traffic.
    Production,
    /// Retired.
    Archived,
}

impl Stage {
    /// Name sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Staging => "Staging",
            Self::Production => "Production",
            Self::Archived => "Archived",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown model stage {other:?}")),
        }
    }
}

/// Registered model version as returned by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVersion {
    /// Registered model name.
    pub name: String,
    /// Version number (decimal string).
    pub version: String,
    /// Current lifecycle stage.
    #[serde(default)]
    pub current_stage: Option<String>,
    /// Artifact source URI.
    #[serde(default)]
    pub source: Option<String>,
    /// Run that produced the artifact.
    #[serde(default)]
    pub run_id: Option<String>,
    /// Registration status, e.g. `PENDING_REGISTRATION` or `READY`.
    #[serde(default)]
    pub status: Option<String>,
}

/// Terminal and non-terminal run states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Run in progress.
    Running,
    /// Run scheduled.
    Scheduled,
    /// Run completed.
    Finished,
    /// Run failed.
    Failed,
    /// Run killed.
    Killed,
}

/// Identifying details of a tracking run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    /// Run id.
    pub run_id: String,
    /// Owning experiment.
    #[serde(default)]
    pub experiment_id: Option<String>,
    /// Current status.
    #[serde(default)]
    pub status: Option<RunStatus>,
}

/// Typed MLflow REST operations over a [`RegistryTransport`].
#[derive(Debug, Clone)]
pub struct RegistryClient<T> {
    transport: T,
}

impl<T: RegistryTransport> RegistryClient<T> {
    /// Wraps a transport.
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Registers `source` as a new version of model `name`.
    pub async fn create_model_version(
        &self,
        name: &str,
        source: &str,
        run_id: &str,
    ) -> Result<ModelVersion, RegistryError> {
        let reply = self
            .transport
            .post(
                CREATE_MODEL_VERSION,
                json!({ "name": name, "source": source, "run_id": run_id }),
            )
            .await?;
        field(CREATE_MODEL_VERSION, reply, "model_version")
    }

    /// Moves a model version to `stage`, leaving other versions where they are.
    pub async fn transition_model_version_stage(
        &self,
        name: &str,
        version: &str,
        stage: Stage,
    ) -> Result<ModelVersion, RegistryError> {
        let reply = self
            .transport
            .post(
                TRANSITION_STAGE,
                json!({
                    "name": name,
                    "version": version,
                    "stage": stage.as_str(),
                    "archive_existing_versions": false,
                }),
            )
            .await?;
        field(TRANSITION_STAGE, reply, "model_version")
    }

    /// Opens a run in `experiment_id`.
    pub async fn create_run(&self, experiment_id: &str) -> Result<RunInfo, RegistryError> {
        let reply = self
            .transport
            .post(
                CREATE_RUN,
                json!({
                    "experiment_id": experiment_id,
                    "start_time": Utc::now().timestamp_millis(),
                }),
            )
            .await?;
        let run: Value = field(CREATE_RUN, reply, "run")?;
        field(CREATE_RUN, run, "info")
    }

    /// Logs a string parameter on a run.
    pub async fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<(), RegistryError> {
        self.transport
            .post(LOG_PARAMETER, json!({ "run_id": run_id, "key": key, "value": value }))
            .await
            .map(drop)
    }

    /// Logs a metric value at step 0.
    pub async fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<(), RegistryError> {
        self.transport
            .post(
                LOG_METRIC,
                json!({
                    "run_id": run_id,
                    "key": key,
                    "value": value,
                    "timestamp": Utc::now().timestamp_millis(),
                    "step": 0,
                }),
            )
            .await
            .map(drop)
    }

    /// Sets the run status and end time.
    pub async fn update_run(&self, run_id: &str, status: RunStatus) -> Result<(), RegistryError> {
        self.transport
            .post(
                UPDATE_RUN,
                json!({
                    "run_id": run_id,
                    "status": status,
                    "end_time": Utc::now().timestamp_millis(),
                }),
            )
            .await
            .map(drop)
    }
}

fn field<D: DeserializeOwned>(endpoint: &str, mut reply: Value, key: &str) -> Result<D, RegistryError> {
    let decode = |reason: String| RegistryError::Decode {
        endpoint: endpoint.to_string(),
        reason,
    };
    let value = reply
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| decode(format!("missing `{key}`")))?;
    serde_json::from_value(value).map_err(|err| decode(err.to_string()))
}
