use serde::{Deserialize, Serialize};

/// Aggregate outcome shared by every import operation.
///
/// `error` is fatal and document-level; `errors` are per-record reasons for
/// skipped rows; `warnings` never block success. A result with zero
/// successfully applied records is a failure even when no one complained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success_count: u64,
    pub error: Option<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ImportResult {
    pub fn new() -> Self {
        ImportResult::default()
    }

    pub fn failed(message: impl Into<String>) -> Self {
        ImportResult {
            error: Some(message.into()),
            ..ImportResult::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.success_count > 0 && self.error.is_none()
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_successes_is_a_failure() {
        let mut result = ImportResult::new();
        assert!(!result.is_success());
        result.record_error("ligne 2 ignorée");
        assert!(!result.is_success());
    }

    #[test]
    fn partial_success_without_fatal_error_succeeds() {
        let mut result = ImportResult::new();
        result.success_count = 3;
        result.record_error("ligne 4 ignorée");
        result.warn("doublon");
        assert!(result.is_success());
    }

    #[test]
    fn fatal_error_overrides_counts() {
        let mut result = ImportResult::new();
        result.success_count = 5;
        result.error = Some("flux illisible".into());
        assert!(!result.is_success());
    }
}
