//! crates/gpdf_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any storage backend or serialization format.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// A day-scoped opaque identifier correlating a user's requests without
/// authentication. A session is only valid on the calendar day it was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub created_on: NaiveDate,
}

impl Session {
    /// Whether this session may still be used on `today`.
    pub fn is_valid_on(&self, today: NaiveDate) -> bool {
        self.created_on == today
    }
}

/// The count/limit/remaining/reset-time tuple bounding daily summarization
/// requests for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub usage_count: u32,
    pub limit: u32,
    pub remaining: u32,
    pub reset_time: DateTime<Utc>,
}

impl UsageSnapshot {
    /// Builds a snapshot from a raw count and limit, clamping `remaining` at
    /// zero so the invariant `remaining <= limit` always holds.
    pub fn new(usage_count: u32, limit: u32, reset_time: DateTime<Utc>) -> Self {
        Self {
            usage_count,
            limit,
            remaining: limit.saturating_sub(usage_count),
            reset_time,
        }
    }

    /// The default snapshot substituted when the backend cannot report usage.
    /// A usage-check failure must never block the user.
    pub fn fallback(now: DateTime<Utc>) -> Self {
        Self::new(0, 3, now + Duration::hours(24))
    }

    /// True when the daily quota is exhausted.
    pub fn exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// The outcome of a successful summarization request.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryResult {
    pub summary: String,
    pub page_count: u32,
    /// Server-side processing time in seconds, when reported.
    pub processing_time: Option<f64>,
    /// Backend-assigned handle used to scope follow-up questions. Older
    /// servers do not return one, in which case Q&A is unavailable.
    pub document_id: Option<String>,
}

/// The outcome of converting a summary into a downloadable document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    /// Path relative to the API base URL.
    pub download_url: String,
    pub filename: String,
    pub file_size: u64,
}

/// The answer to a follow-up question about a summarized document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaAnswer {
    pub answer: String,
    /// Excerpt of the document text the answer was grounded on.
    pub context: Option<String>,
}

/// The document formats a summary can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Docx,
    Pdf,
    Txt,
}

impl ExportFormat {
    /// The wire name the backend expects in the `format` form field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Docx => "docx",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Txt => "txt",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docx" => Ok(ExportFormat::Docx),
            "pdf" => Ok(ExportFormat::Pdf),
            "txt" => Ok(ExportFormat::Txt),
            other => Err(format!("unsupported export format: '{}'", other)),
        }
    }
}
