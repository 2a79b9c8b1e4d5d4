//! services/app/src/validate.rs
//!
//! Local, pre-network input screening. A rejected file or question never
//! reaches the backend.

use crate::error::AppError;
use regex::Regex;
use std::sync::LazyLock;

/// Uploads above this size are rejected without contacting the backend.
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Questions above this length are rejected locally.
pub const MAX_QUESTION_LEN: usize = 500;

/// Patterns that indicate a prompt-injection attempt or malformed input.
static SUSPICIOUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)system:",
        r"(?i)assistant:",
        r"(?i)user:",
        r"(?i)ignore previous",
        r"(?i)ignore above",
        r"(?i)forget",
        r"(?i)new prompt",
        r"\{.*\}", // JSON-shaped input
        r"<.*>",   // XML/HTML tags
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Checks a candidate upload against the two local constraints: the filename
/// must end in `.pdf` and the size must not exceed 5 MiB.
pub fn validate_file(file_name: &str, size: u64) -> Result<(), AppError> {
    if !file_name.to_lowercase().ends_with(".pdf") {
        return Err(AppError::Validation(
            "Only PDF files can be uploaded.".to_string(),
        ));
    }
    if size > MAX_FILE_SIZE {
        return Err(AppError::Validation(
            "File size exceeds the 5MB limit.".to_string(),
        ));
    }
    Ok(())
}

/// Screens a follow-up question before it is sent to the Q&A endpoint.
pub fn validate_question(text: &str) -> Result<(), AppError> {
    if text.trim().is_empty() {
        return Err(AppError::Validation("Please enter a question.".to_string()));
    }
    if text.chars().count() > MAX_QUESTION_LEN {
        return Err(AppError::Validation(
            "Question is too long (500 characters max).".to_string(),
        ));
    }
    if SUSPICIOUS_PATTERNS.iter().any(|p| p.is_match(text)) {
        return Err(AppError::Validation("Invalid input.".to_string()));
    }
    Ok(())
}
