//! Session and iteration records.
//!
//! These are the durable product of a run. Field names are part of the persisted
//! JSON layout and must stay stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::language::Language;

/// One recorded test run within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iteration {
    /// 1-based position in the parent session.
    pub number: u32,
    pub test_code: String,
    pub code: String,
    /// Raw combined output of the test run.
    pub test_logs: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

/// Durable record of one generate/repair run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub description: String,
    pub language: Language,
    #[serde(default)]
    pub iterations: Vec<Iteration>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Fresh session with a random v4 id and no iterations.
    pub fn new(description: &str, language: Language, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description: description.to_string(),
            language,
            iterations: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn next_iteration_number(&self) -> u32 {
        self.iterations.len() as u32 + 1
    }

    /// Append the next-numbered iteration and bump `updated_at`.
    pub fn push_iteration(
        &mut self,
        test_code: &str,
        code: &str,
        test_logs: &str,
        success: bool,
        now: DateTime<Utc>,
    ) -> &Iteration {
        let iteration = Iteration {
            number: self.next_iteration_number(),
            test_code: test_code.to_string(),
            code: code.to_string(),
            test_logs: test_logs.to_string(),
            success,
            timestamp: now,
        };
        self.iterations.push(iteration);
        self.updated_at = now;
        &self.iterations[self.iterations.len() - 1]
    }

    /// True if any recorded run passed.
    pub fn passed(&self) -> bool {
        self.iterations.iter().any(|iteration| iteration.success)
    }
}

/// Check structural invariants of a loaded session.
///
/// Returns human-readable violations; empty means valid.
pub fn validate_session(session: &Session) -> Vec<String> {
    let mut errors = Vec::new();
    if Uuid::parse_str(&session.id).is_err() {
        errors.push(format!("id '{}' is not a uuid", session.id));
    }
    for (idx, iteration) in session.iterations.iter().enumerate() {
        let expected = idx as u32 + 1;
        if iteration.number != expected {
            errors.push(format!(
                "iteration at position {expected} has number {}",
                iteration.number
            ));
        }
    }
    if session.updated_at < session.created_at {
        errors.push("updated_at precedes created_at".to_string());
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_assigns_sequential_numbers() {
        let now = Utc::now();
        let mut session = Session::new("add two integers", Language::Go, now);
        for _ in 0..3 {
            session.push_iteration("t", "c", "out", false, now);
        }
        let numbers: Vec<u32> = session.iterations.iter().map(|it| it.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(validate_session(&session).is_empty());
        assert!(!session.passed());
    }

    #[test]
    fn validate_reports_gaps_in_numbering() {
        let now = Utc::now();
        let mut session = Session::new("x", Language::Python, now);
        session.push_iteration("t", "c", "out", false, now);
        session.push_iteration("t", "c", "out", true, now);
        session.iterations[1].number = 5;

        let errors = validate_session(&session);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("position 2"));
    }

    #[test]
    fn validate_rejects_non_uuid_id() {
        let mut session = Session::new("x", Language::Go, Utc::now());
        session.id = "../escape".to_string();
        assert!(validate_session(&session)[0].contains("not a uuid"));
    }
}
