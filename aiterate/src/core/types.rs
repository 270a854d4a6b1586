//! Shared value types passed between the controller and its collaborators.

use serde::{Deserialize, Serialize};

/// Outcome of one test-tool invocation.
///
/// `success == false` is the expected negative outcome that drives repair, not an
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub success: bool,
    /// Combined stdout followed by stderr.
    pub output: String,
}

impl TestResult {
    pub fn passed(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}
