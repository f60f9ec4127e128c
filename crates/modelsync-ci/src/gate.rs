//! Decides whether a sync run should turn into a pull request.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::WorkflowError;
use modelsync_core::SyncExit;

/// Which sync exit codes open a pull request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrTriggerPolicy {
    /// Only exit 1 (files modified). Other non-zero codes fail the workflow.
    #[default]
    ChangesPendingOnly,
    /// Any non-zero exit, matching an `if: failure()` step.
    AnyFailure,
}

impl FromStr for PrTriggerPolicy {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "changes-pending" | "changes_pending_only" => Ok(PrTriggerPolicy::ChangesPendingOnly),
            "any-failure" | "any_failure" => Ok(PrTriggerPolicy::AnyFailure),
            other => Err(WorkflowError::InvalidWorkflow(format!(
                "unknown PR trigger policy `{other}`"
            ))),
        }
    }
}

/// Gate evaluation verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateVerdict {
    /// Whether the PR step should run.
    pub open_pull_request: bool,

    /// Whether the sync step itself is considered successful.
    pub passed: bool,

    /// Reasons the sync step counts as failed (empty if passed).
    pub violations: Vec<String>,

    /// Summary message.
    pub message: String,
}

/// PR gate rules.
pub struct PrGate;

impl PrGate {
    /// Evaluate the sync step's exit code under `policy`.
    ///
    /// | exit | ChangesPendingOnly | AnyFailure |
    /// |------|--------------------|------------|
    /// | 0    | no PR, passed      | no PR, passed |
    /// | 1    | PR, passed         | PR, passed |
    /// | else | no PR, failed      | PR, failed |
    pub fn evaluate(exit_code: i32, policy: PrTriggerPolicy) -> GateVerdict {
        match SyncExit::from_code(exit_code) {
            Some(SyncExit::Clean) => GateVerdict {
                open_pull_request: false,
                passed: true,
                violations: Vec::new(),
                message: "No footprint changes; no pull request needed".to_string(),
            },
            Some(SyncExit::ChangesPending) => GateVerdict {
                open_pull_request: true,
                passed: true,
                violations: Vec::new(),
                message: "Footprints were modified; opening a pull request".to_string(),
            },
            _ => {
                let violation = if exit_code == SyncExit::Failed.code() as i32 {
                    format!("Sync step reported failure (exit {exit_code})")
                } else {
                    format!("Sync step exited with unexpected code {exit_code}")
                };
                let open_pull_request = policy == PrTriggerPolicy::AnyFailure;
                let message = if open_pull_request {
                    "Sync step failed; opening a pull request with whatever changed".to_string()
                } else {
                    "Sync step failed; no pull request opened".to_string()
                };
                GateVerdict {
                    open_pull_request,
                    passed: false,
                    violations: vec![violation],
                    message,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_exit_opens_nothing() {
        for policy in [PrTriggerPolicy::ChangesPendingOnly, PrTriggerPolicy::AnyFailure] {
            let verdict = PrGate::evaluate(0, policy);
            assert!(!verdict.open_pull_request);
            assert!(verdict.passed);
            assert!(verdict.violations.is_empty());
        }
    }

    #[test]
    fn test_changes_pending_opens_pr() {
        for policy in [PrTriggerPolicy::ChangesPendingOnly, PrTriggerPolicy::AnyFailure] {
            let verdict = PrGate::evaluate(1, policy);
            assert!(verdict.open_pull_request);
            assert!(verdict.passed);
        }
    }

    #[test]
    fn test_failure_under_default_policy() {
        let verdict = PrGate::evaluate(2, PrTriggerPolicy::default());
        assert!(!verdict.open_pull_request);
        assert!(!verdict.passed);
        assert_eq!(verdict.violations.len(), 1);
        assert_eq!(verdict.violations[0], "Sync step reported failure (exit 2)");
    }

    #[test]
    fn test_unexpected_code_names_it() {
        let verdict = PrGate::evaluate(101, PrTriggerPolicy::ChangesPendingOnly);
        assert!(!verdict.passed);
        assert!(verdict.violations[0].contains("101"));
    }

    #[test]
    fn test_any_failure_policy_opens_pr_on_error() {
        for code in [2, -1, 127] {
            let verdict = PrGate::evaluate(code, PrTriggerPolicy::AnyFailure);
            assert!(verdict.open_pull_request, "exit {code}");
            assert!(!verdict.passed);
        }
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "changes-pending".parse::<PrTriggerPolicy>().unwrap(),
            PrTriggerPolicy::ChangesPendingOnly
        );
        assert_eq!(
            "any-failure".parse::<PrTriggerPolicy>().unwrap(),
            PrTriggerPolicy::AnyFailure
        );
        assert!("sometimes".parse::<PrTriggerPolicy>().is_err());
    }
}
