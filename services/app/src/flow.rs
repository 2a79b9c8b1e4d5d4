//! services/app/src/flow.rs
//!
//! The upload/session orchestrator: an explicit finite-state machine over the
//! health check → session resolution → usage fetch → file submission sequence.
//! State is mutated only through the named transition methods below, and each
//! user action drives exactly one in-flight request at a time.

use crate::error::AppError;
use crate::session::SessionTracker;
use crate::validate;
use gpdf_core::domain::{ConversionResult, ExportFormat, QaAnswer, Session, SummaryResult, UsageSnapshot};
use gpdf_core::ports::BackendService;
use std::sync::Arc;
use tracing::{info, warn};

/// The finite set of states the upload flow can occupy. Each variant carries
/// the payload that only exists in that state.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Probing the backend; the initial state.
    Checking,
    /// The backend is unreachable. The only way out is a user-initiated retry.
    Offline { error: String },
    /// Online and waiting for a file.
    Upload,
    /// A summarize request is in flight.
    Loading,
    /// A summary is available; export and Q&A become possible.
    Summary { result: SummaryResult },
}

/// Drives the upload flow against an injected backend and session tracker.
pub struct AppFlow {
    backend: Arc<dyn BackendService>,
    sessions: SessionTracker,
    phase: Phase,
    session: Option<Session>,
    usage: Option<UsageSnapshot>,
    error: Option<String>,
}

impl AppFlow {
    pub fn new(backend: Arc<dyn BackendService>, sessions: SessionTracker) -> Self {
        Self {
            backend,
            sessions,
            phase: Phase::Checking,
            session: None,
            usage: None,
            error: None,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn usage(&self) -> Option<&UsageSnapshot> {
        self.usage.as_ref()
    }

    /// The most recent user-facing error message, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the upload control should be offered. An unknown quota fails
    /// open; only a snapshot that is definitely exhausted blocks uploads.
    pub fn can_upload(&self) -> bool {
        self.usage.as_ref().map_or(true, |u| !u.exhausted())
    }

    /// Whether follow-up questions are possible in the current state.
    pub fn qa_available(&self) -> bool {
        matches!(&self.phase, Phase::Summary { result } if result.document_id.is_some())
    }

    /// Runs the startup sequence: health check, session resolution, usage
    /// fetch. Ends in `Upload` when the backend is reachable, `Offline`
    /// otherwise.
    pub async fn initialize(&mut self) {
        self.phase = Phase::Checking;
        self.error = None;

        if let Err(e) = self.backend.health_check().await {
            warn!("Health check failed: {}", e);
            let message = AppError::from(e).user_message();
            self.error = Some(message.clone());
            self.phase = Phase::Offline { error: message };
            return;
        }

        // Storage faults fail open to an ephemeral session inside the tracker.
        let session = self.sessions.get_or_create_session().await;

        // A fresh cached snapshot is trusted; otherwise ask the backend, which
        // substitutes a permissive default on any failure.
        let usage = match self.sessions.get_usage_snapshot().await {
            Some(cached) => cached,
            None => {
                let fetched = self.backend.check_usage(&session.id).await;
                self.sessions.set_usage_snapshot(&fetched).await;
                fetched
            }
        };

        info!(session_id = %session.id, remaining = usage.remaining, "Flow initialized");
        self.session = Some(session);
        self.usage = Some(usage);
        self.phase = Phase::Upload;
    }

    /// User-initiated retry after going offline; the only retry path.
    pub async fn retry(&mut self) {
        self.initialize().await;
    }

    /// Validates and submits a candidate file for summarization.
    ///
    /// Local constraint violations (extension, size, quota) set an error and
    /// return without any network call. On success the flow ends in `Summary`
    /// and the usage snapshot is refreshed best-effort.
    pub async fn submit_file(
        &mut self,
        file_name: &str,
        file_bytes: Vec<u8>,
    ) -> Result<(), AppError> {
        if self.phase != Phase::Upload {
            return Err(AppError::Internal(
                "submit_file is only valid in the upload state".to_string(),
            ));
        }

        if !self.can_upload() {
            let err = AppError::Validation(
                "Daily usage limit reached. Try again tomorrow.".to_string(),
            );
            self.error = Some(err.user_message());
            return Err(err);
        }

        if let Err(err) = validate::validate_file(file_name, file_bytes.len() as u64) {
            self.error = Some(err.user_message());
            return Err(err);
        }

        let session_id = match &self.session {
            Some(session) => session.id.clone(),
            None => {
                return Err(AppError::Internal(
                    "no session resolved before upload".to_string(),
                ))
            }
        };

        self.phase = Phase::Loading;
        self.error = None;

        match self.backend.summarize(file_name, file_bytes, &session_id).await {
            Ok(result) => {
                self.phase = Phase::Summary { result };
                // Best-effort refresh; failures are absorbed by the port
                // contract and the tracker, never reverting the transition.
                let usage = self.backend.check_usage(&session_id).await;
                self.sessions.set_usage_snapshot(&usage).await;
                self.usage = Some(usage);
                Ok(())
            }
            Err(e) => {
                let err = AppError::from(e);
                self.error = Some(err.user_message());
                self.phase = Phase::Upload;
                Err(err)
            }
        }
    }

    /// Converts the current summary into a downloadable document.
    pub async fn export(&self, format: ExportFormat) -> Result<ConversionResult, AppError> {
        let summary = match &self.phase {
            Phase::Summary { result } => &result.summary,
            _ => {
                return Err(AppError::Internal(
                    "export is only valid once a summary exists".to_string(),
                ))
            }
        };
        let session_id = self
            .session
            .as_ref()
            .map(|s| s.id.clone())
            .ok_or_else(|| AppError::Internal("no session resolved".to_string()))?;

        Ok(self.backend.convert(summary, format, &session_id).await?)
    }

    /// Asks a follow-up question scoped to the current document.
    pub async fn ask(&self, question: &str) -> Result<QaAnswer, AppError> {
        let document_id = match &self.phase {
            Phase::Summary { result } => result.document_id.clone().ok_or_else(|| {
                AppError::Validation("Q&A is not available for this document.".to_string())
            })?,
            _ => {
                return Err(AppError::Internal(
                    "ask is only valid once a summary exists".to_string(),
                ))
            }
        };

        validate::validate_question(question)?;
        Ok(self.backend.ask_question(&document_id, question).await?)
    }

    /// Returns to the upload state, discarding the summary and any error.
    pub fn new_upload(&mut self) {
        if matches!(self.phase, Phase::Summary { .. }) {
            self.phase = Phase::Upload;
            self.error = None;
        }
    }
}
