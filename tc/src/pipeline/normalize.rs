//! Text normalizer - first pipeline stage
//!
//! Pure validation: trims the raw capture text and rejects input the rest of
//! the pipeline should never see. This is the only stage that can fail a
//! capture request outright.

use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

/// Raw text that passed validation; everything downstream takes this type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate and trim raw capture text
///
/// Rejects empty/whitespace-only input and anything longer than `max_chars`.
pub fn normalize(raw: &str, max_chars: usize) -> Result<NormalizedText, CaptureError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(CaptureError::Validation("Input text is empty".to_string()));
    }

    let char_count = trimmed.chars().count();
    if char_count > max_chars {
        return Err(CaptureError::Validation(format!(
            "Input text is {} characters, maximum is {}",
            char_count, max_chars
        )));
    }

    Ok(NormalizedText(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 5_000;

    #[test]
    fn test_normalize_trims() {
        let text = normalize("  buy milk  \n", MAX).unwrap();
        assert_eq!(text.as_str(), "buy milk");
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(normalize("", MAX), Err(CaptureError::Validation(_))));
        assert!(matches!(normalize("   \t\n", MAX), Err(CaptureError::Validation(_))));
    }

    #[test]
    fn test_rejects_oversized() {
        let big = "x".repeat(10_000);
        assert!(matches!(normalize(&big, MAX), Err(CaptureError::Validation(_))));
    }

    #[test]
    fn test_boundary_exact_max_accepted() {
        let exact = "x".repeat(MAX);
        assert!(normalize(&exact, MAX).is_ok());
    }

    #[test]
    fn test_single_word_accepted() {
        assert!(normalize("mustard", MAX).is_ok());
    }
}
