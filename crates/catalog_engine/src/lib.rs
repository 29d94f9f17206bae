//! Catalog engine: runs the core screens on tokio against the backend collaborators.
mod config;
mod controller;
pub mod memory;
mod repository;
mod screens;
mod workflow;

pub use config::{CatalogConfig, ConfigError, WorkflowSettings};
pub use controller::{Controller, Executor};
pub use repository::{
    CatalogRepository, RecordStream, RepositoryError, RequestSubmitter, SubmitError,
    SubmitRequest, INVALID_KEY_MARKER,
};
pub use screens::{CatalogExecutor, RequestList, SessionDetail, SessionSearch};
pub use workflow::SubmissionWorkflow;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
