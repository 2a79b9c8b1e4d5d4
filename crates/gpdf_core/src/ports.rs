//! crates/gpdf_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like the HTTP backend
//! or the host platform's key-value storage.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::{ConversionResult, ExportFormat, QaAnswer, SummaryResult, UsageSnapshot};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (network, storage).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// Transport-level failure: the server could not be reached or timed out.
    /// Callers collapse this into a generic reconnect prompt.
    #[error("Server unreachable: {0}")]
    Unreachable(String),
    /// A non-2xx response. The message is the server's own detail text and is
    /// shown to the user verbatim.
    #[error("{0}")]
    Api(String),
    /// A key-value storage fault. Callers always fail open and substitute a
    /// safe default rather than propagating this to the user.
    #[error("Storage fault: {0}")]
    Storage(String),
    /// A catch-all for anything that does not fit the categories above.
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Capability interface over the host platform's key-value store.
///
/// Values are JSON so that structured snapshots and plain strings share one
/// contract. A pure in-memory implementation stands in for the host store in
/// tests.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetches the requested keys. Keys with no stored value are simply
    /// absent from the returned map.
    async fn get(&self, keys: &[&str]) -> PortResult<HashMap<String, serde_json::Value>>;

    /// Stores every entry in the map, overwriting existing values.
    async fn set(&self, entries: HashMap<String, serde_json::Value>) -> PortResult<()>;

    /// Removes the given keys. Removing an absent key is not an error.
    async fn remove(&self, keys: &[&str]) -> PortResult<()>;
}

/// The remote summarization backend.
///
/// None of these operations mutate local state; every result is returned to
/// the caller. Input validation (file extension, size, question screening) is
/// the orchestrator's job, not the client's.
#[async_trait]
pub trait BackendService: Send + Sync {
    /// Probes the backend. An error means the server is unreachable.
    async fn health_check(&self) -> PortResult<()>;

    /// Uploads a document and returns its summary.
    async fn summarize(
        &self,
        file_name: &str,
        file_bytes: Vec<u8>,
        session_id: &str,
    ) -> PortResult<SummaryResult>;

    /// Fetches the current usage snapshot for a session.
    ///
    /// Infallible by contract: any failure (including "not found") yields
    /// [`UsageSnapshot::fallback`] so a usage check can never block the user.
    async fn check_usage(&self, session_id: &str) -> UsageSnapshot;

    /// Converts a summary into a downloadable document.
    async fn convert(
        &self,
        summary_text: &str,
        format: ExportFormat,
        session_id: &str,
    ) -> PortResult<ConversionResult>;

    /// Asks a follow-up question about a previously summarized document.
    async fn ask_question(&self, document_id: &str, question: &str) -> PortResult<QaAnswer>;

    /// Fetches the bytes behind a relative download URL returned by `convert`.
    async fn download(&self, download_url: &str) -> PortResult<Vec<u8>>;
}
