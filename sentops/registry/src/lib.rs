#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Model registration stage: publishes a trained model version to an MLflow
//! tracking server and promotes it to a lifecycle stage.

/// MLflow REST client and transport seam.
#[path = "../client.rs"]
pub mod client;

/// Trained-model descriptor (`experiment_info.json`).
#[path = "../descriptor.rs"]
pub mod descriptor;

/// Create-then-promote registration procedure.
#[path = "../registrar.rs"]
pub mod registrar;

/// Tracking-server smoke run with random params and metrics.
#[path = "../smoke.rs"]
pub mod smoke;

/// Tracking, registration and smoke settings.
#[path = "../settings.rs"]
pub mod settings;

#[cfg(test)]
#[path = "../testing.rs"]
pub(crate) mod testing;

pub use client::{
    HttpTransport, ModelVersion, RegistryClient, RegistryError, RegistryTransport, RunInfo,
    RunStatus, Stage,
};
pub use descriptor::ModelDescriptor;
pub use registrar::{ModelRegistrar, RegistrationOutcome, StageOutcome};
pub use settings::{RegistrationSettings, SmokeSettings, TrackingSettings};
pub use smoke::{SmokeReport, TrackingSmokeRun};
