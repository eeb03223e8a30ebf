//! Judging pipeline
//!
//! Verdict types, the sandbox runner, the submission dispatcher, and the
//! worker procedure.

pub mod dispatcher;
pub mod languages;
pub mod sandbox;
pub mod worker;

pub use dispatcher::{Dispatcher, Job};
pub use sandbox::SandboxRunner;

use serde::{Deserialize, Serialize};

/// Per-test verdict vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "Accepted")]
    Accepted,
    #[serde(rename = "Wrong Answer")]
    WrongAnswer,
    #[serde(rename = "Time Limit Exceeded")]
    TimeLimitExceeded,
    #[serde(rename = "Runtime Error")]
    RuntimeError,
    #[serde(rename = "Compilation Error")]
    CompilationError,
    #[serde(rename = "Judge Error")]
    JudgeError,
    #[serde(rename = "Internal Error")]
    InternalError,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "Accepted",
            Self::WrongAnswer => "Wrong Answer",
            Self::TimeLimitExceeded => "Time Limit Exceeded",
            Self::RuntimeError => "Runtime Error",
            Self::CompilationError => "Compilation Error",
            Self::JudgeError => "Judge Error",
            Self::InternalError => "Internal Error",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one test run inside the sandbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestVerdict {
    pub verdict: Verdict,
    pub stdout: String,
    pub stderr: String,
}

/// A failure that aborts the whole submission
#[derive(Debug, Clone)]
pub enum FatalError {
    /// Compiler rejected the source; carries the diagnostics
    Compilation(String),
    /// The submission exceeded the whole-run wall-clock budget
    OverallTimeout,
    /// Sandbox-internal failure: process launch, harness I/O, transport
    System(String),
}

impl FatalError {
    /// Verdict string recorded in history for this failure
    pub fn verdict_str(&self) -> &'static str {
        match self {
            Self::Compilation(_) => "Compilation Error",
            Self::OverallTimeout => "Time Limit Exceeded (Overall)",
            Self::System(_) => "Internal Error",
        }
    }
}

/// What the sandbox returned for one submission
#[derive(Debug, Clone, Default)]
pub struct JudgeOutcome {
    pub verdicts: Vec<TestVerdict>,
    pub fatal: Option<FatalError>,
}

impl JudgeOutcome {
    pub fn fatal(error: FatalError) -> Self {
        Self {
            verdicts: Vec::new(),
            fatal: Some(error),
        }
    }

    pub fn passed_count(&self) -> i64 {
        self.verdicts
            .iter()
            .filter(|v| v.verdict == Verdict::Accepted)
            .count() as i64
    }

    /// Verdict string for the history row: `Accepted` on a clean full pass,
    /// the fatal verdict when fatal, otherwise the first failing verdict.
    pub fn history_verdict(&self, total_tests: i64) -> String {
        if let Some(fatal) = &self.fatal {
            return fatal.verdict_str().to_string();
        }
        if total_tests > 0 && self.passed_count() == total_tests {
            return Verdict::Accepted.as_str().to_string();
        }
        self.verdicts
            .iter()
            .find(|v| v.verdict != Verdict::Accepted)
            .map(|v| v.verdict.as_str().to_string())
            .unwrap_or_else(|| Verdict::WrongAnswer.as_str().to_string())
    }
}

/// Per-test line of a personal result payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDetail {
    pub test_num: usize,
    pub verdict: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// Result pushed to a participant after their submission is judged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalResult {
    pub task_id: i64,
    pub passed_count: i64,
    pub total_tests: i64,
    pub new_score: i64,
    pub passed: bool,
    pub verdict: String,
    pub details: Vec<TestDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tv(verdict: Verdict) -> TestVerdict {
        TestVerdict {
            verdict,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    #[test]
    fn history_verdict_full_pass() {
        let outcome = JudgeOutcome {
            verdicts: vec![tv(Verdict::Accepted), tv(Verdict::Accepted)],
            fatal: None,
        };
        assert_eq!(outcome.history_verdict(2), "Accepted");
    }

    #[test]
    fn history_verdict_first_failure() {
        let outcome = JudgeOutcome {
            verdicts: vec![
                tv(Verdict::Accepted),
                tv(Verdict::TimeLimitExceeded),
                tv(Verdict::WrongAnswer),
            ],
            fatal: None,
        };
        assert_eq!(outcome.history_verdict(3), "Time Limit Exceeded");
    }

    #[test]
    fn history_verdict_fatal_wins() {
        let outcome = JudgeOutcome::fatal(FatalError::Compilation("boom".into()));
        assert_eq!(outcome.history_verdict(5), "Compilation Error");
        assert_eq!(outcome.passed_count(), 0);
    }

    #[test]
    fn verdict_serializes_with_spaces() {
        let json = serde_json::to_string(&Verdict::WrongAnswer).unwrap();
        assert_eq!(json, r#""Wrong Answer""#);
    }
}
