//! Path-filtered workflow triggers.
//!
//! Mirrors the `on.<event>.paths` filters of a GitHub workflow: a run fires
//! when at least one changed path matches the event's rules. A rule starting
//! with `!` excludes paths again; later rules override earlier ones.

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, WorkflowError};

/// Paths that fire the sync workflow by default.
pub const DEFAULT_FOOTPRINT_GLOB: &str = "**/*.kicad_mod";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Repository events the workflow listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    Push,
    PullRequest,
}

impl TriggerEvent {
    /// Key of the event in a workflow's `on:` block.
    pub fn key(&self) -> &'static str {
        match self {
            TriggerEvent::Push => "push",
            TriggerEvent::PullRequest => "pull_request",
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for TriggerEvent {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "push" => Ok(TriggerEvent::Push),
            "pull_request" | "pull-request" => Ok(TriggerEvent::PullRequest),
            other => Err(WorkflowError::InvalidWorkflow(format!(
                "unknown trigger event `{other}`"
            ))),
        }
    }
}

/// One entry of a `paths` list.
#[derive(Debug, Clone, PartialEq)]
pub struct PathRule {
    pub pattern: Pattern,
    pub negated: bool,
}

impl PathRule {
    pub fn parse(rule: &str) -> Result<Self> {
        let (negated, raw) = match rule.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, rule),
        };
        let pattern = Pattern::new(raw).map_err(|source| WorkflowError::InvalidPattern {
            pattern: rule.to_string(),
            source,
        })?;
        Ok(Self { pattern, negated })
    }

    fn matches(&self, path: &str) -> bool {
        self.pattern.matches_with(path, MATCH_OPTIONS)
    }
}

/// Path rules per event.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerFilter {
    push: Vec<PathRule>,
    pull_request: Vec<PathRule>,
}

impl Default for TriggerFilter {
    fn default() -> Self {
        // Constant pattern; the fallback is unreachable.
        Self::from_rules(&[DEFAULT_FOOTPRINT_GLOB], &[DEFAULT_FOOTPRINT_GLOB]).unwrap_or(Self {
            push: Vec::new(),
            pull_request: Vec::new(),
        })
    }
}

impl TriggerFilter {
    /// Build a filter from raw rule strings. An empty list never fires.
    pub fn from_rules<S: AsRef<str>>(push: &[S], pull_request: &[S]) -> Result<Self> {
        let parse_all = |rules: &[S]| -> Result<Vec<PathRule>> {
            rules.iter().map(|r| PathRule::parse(r.as_ref())).collect()
        };
        Ok(Self {
            push: parse_all(push)?,
            pull_request: parse_all(pull_request)?,
        })
    }

    pub fn rules(&self, event: TriggerEvent) -> &[PathRule] {
        match event {
            TriggerEvent::Push => &self.push,
            TriggerEvent::PullRequest => &self.pull_request,
        }
    }

    /// Whether a single path passes the event's rules.
    pub fn path_matches(&self, event: TriggerEvent, path: &str) -> bool {
        let path = path.trim_start_matches("./").replace('\\', "/");
        let mut included = false;
        for rule in self.rules(event) {
            if rule.matches(&path) {
                included = !rule.negated;
            }
        }
        included
    }

    /// Whether any of `changed_paths` fires the workflow for `event`.
    pub fn matches<I, S>(&self, event: TriggerEvent, changed_paths: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        changed_paths
            .into_iter()
            .any(|p| self.path_matches(event, p.as_ref()))
    }
}
