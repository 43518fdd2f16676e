//! In-memory transport replaying scripted replies.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::client::{RegistryError, RegistryTransport};

#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Value, RegistryError>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, value: Value) {
        self.script.lock().push_back(Ok(value));
    }

    pub fn fail(&self, err: RegistryError) {
        self.script.lock().push_back(Err(err));
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(e, _)| e.clone()).collect()
    }
}

#[async_trait]
impl RegistryTransport for ScriptedTransport {
    async fn post(&self, endpoint: &str, body: Value) -> Result<Value, RegistryError> {
        self.calls.lock().push((endpoint.to_string(), body));
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| {
                Err(RegistryError::Transport {
                    endpoint: endpoint.to_string(),
                    reason: "no scripted reply".into(),
                })
            })
    }
}

pub fn api_failure(endpoint: &str, error_code: &str) -> RegistryError {
    RegistryError::Api {
        endpoint: endpoint.to_string(),
        status: 400,
        error_code: error_code.to_string(),
        message: "rejected by test server".into(),
    }
}

pub fn transport_failure(endpoint: &str) -> RegistryError {
    RegistryError::Transport {
        endpoint: endpoint.to_string(),
        reason: "connection refused".into(),
    }
}
