//! Sequential workflow orchestration: trigger, sync, gate, PR plan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::gate::{GateVerdict, PrGate, PrTriggerPolicy};
use crate::pull_request::{PullRequestPlan, WorkingTree};
use crate::runner::{StepExecutor, StepResult};
use crate::spec::WorkflowSpec;
use crate::step::{StepCondition, StepConfig};
use crate::trigger::TriggerFilter;
use modelsync_core::SyncReport;

/// Something that happened during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowEventKind {
    NotTriggered,
    StepStarted { step: String },
    StepReturned { step: String, exit_code: i32, duration_ms: u64 },
    StepFailed { step: String, error: String },
    StepSkipped { step: String, reason: String },
    GateEvaluated { verdict: GateVerdict },
    PullRequestPlanned { branch: String, files: Vec<String> },
    Finished { success: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: WorkflowEventKind,
}

/// Result of a complete workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub run_id: Uuid,

    /// Whether the changed paths fired the workflow at all.
    pub triggered: bool,

    /// Whether every executed step passed its gate.
    pub success: bool,

    /// Results of executed steps, in order.
    pub steps: Vec<StepResult>,

    pub gate: Option<GateVerdict>,

    pub pull_request: Option<PullRequestPlan>,

    pub events: Vec<WorkflowEvent>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,

    pub steps_digest: String,
}

impl WorkflowResult {
    pub fn passed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.steps.iter().filter(|s| !s.passed()).count()
    }

    /// 2 on failure, 1 when a pull request was planned, else 0.
    pub fn exit_code(&self) -> u8 {
        if !self.success {
            2
        } else if self.pull_request.is_some() {
            1
        } else {
            0
        }
    }
}

struct EventLog {
    events: Vec<WorkflowEvent>,
}

impl EventLog {
    fn record(&mut self, kind: WorkflowEventKind) {
        self.events.push(WorkflowEvent {
            seq: self.events.len() as u64 + 1,
            timestamp: Utc::now(),
            kind,
        });
    }
}

/// The model-sync workflow.
#[derive(Debug, Clone, Default)]
pub struct SyncWorkflow {
    pub filter: TriggerFilter,
    pub policy: PrTriggerPolicy,
    /// Report written by the sync step, used for the PR body.
    pub report_path: Option<PathBuf>,
}

impl SyncWorkflow {
    pub fn new(filter: TriggerFilter, policy: PrTriggerPolicy) -> Self {
        Self {
            filter,
            policy,
            report_path: None,
        }
    }

    pub fn with_report_path(mut self, path: Option<PathBuf>) -> Self {
        self.report_path = path;
        self
    }

    /// Run `steps` in order against the workspace named by `spec`.
    ///
    /// Step failures never abort the run; they are recorded and later steps
    /// still get the chance to run if their condition allows it.
    pub async fn run(
        &self,
        executor: &dyn StepExecutor,
        tree: &dyn WorkingTree,
        spec: &WorkflowSpec,
        steps: Vec<StepConfig>,
    ) -> WorkflowResult {
        let start = Instant::now();
        let run_id = Uuid::new_v4();
        let mut log = EventLog { events: Vec::new() };

        let triggered = self.filter.matches(spec.event, &spec.changed_paths);
        if !triggered {
            info!(run_id = %run_id, event = %spec.event, "no changed path matches the trigger filter");
            log.record(WorkflowEventKind::NotTriggered);
            log.record(WorkflowEventKind::Finished { success: true });
            return WorkflowResult {
                run_id,
                triggered,
                success: true,
                steps: Vec::new(),
                gate: None,
                pull_request: None,
                events: log.events,
                duration_ms: start.elapsed().as_millis() as u64,
                steps_digest: spec.steps_digest.clone(),
            };
        }

        info!(run_id = %run_id, event = %spec.event, "Starting sync workflow");

        let mut results = Vec::new();
        let mut gate: Option<GateVerdict> = None;
        let mut pull_request = None;
        let mut failed = false;

        for config in steps {
            if !config.enabled {
                info!(step = %config.name, "Skipping disabled step");
                log.record(WorkflowEventKind::StepSkipped {
                    step: config.name.clone(),
                    reason: "disabled".to_string(),
                });
                continue;
            }

            let gate_open = gate.as_ref().is_some_and(|g| g.open_pull_request);
            let runnable = match config.condition {
                StepCondition::Always => true,
                StepCondition::OnGateOpen => gate_open,
                StepCondition::OnFailure => failed,
            };
            if !runnable {
                info!(step = %config.name, condition = ?config.condition, "Skipping step");
                log.record(WorkflowEventKind::StepSkipped {
                    step: config.name.clone(),
                    reason: format!("condition {:?} not met", config.condition),
                });
                continue;
            }

            info!(step = %config.name, "Executing step");
            log.record(WorkflowEventKind::StepStarted {
                step: config.name.clone(),
            });
            let step_start = Instant::now();

            if config.is_pull_request_plan() {
                match tree.modified_paths().await {
                    Ok(changed) => {
                        let report = self.load_report();
                        let plan = PullRequestPlan::build(run_id, report.as_ref(), &changed);
                        let duration_ms = step_start.elapsed().as_millis() as u64;
                        log.record(WorkflowEventKind::StepReturned {
                            step: config.name.clone(),
                            exit_code: 0,
                            duration_ms,
                        });
                        if plan.is_empty() {
                            warn!("gate opened but no footprint files changed in the working tree");
                        } else {
                            info!(branch = %plan.branch, files = plan.files.len(), "Planned pull request");
                            log.record(WorkflowEventKind::PullRequestPlanned {
                                branch: plan.branch.clone(),
                                files: plan.files.clone(),
                            });
                            pull_request = Some(plan);
                        }
                        results.push(StepResult {
                            step_name: config.name.clone(),
                            exit_code: 0,
                            stdout: changed.join("\n"),
                            stderr: String::new(),
                            duration_ms,
                            success: true,
                        });
                    }
                    Err(e) => {
                        failed = true;
                        log.record(WorkflowEventKind::StepFailed {
                            step: config.name.clone(),
                            error: e.to_string(),
                        });
                        results.push(StepResult::errored(
                            &config.name,
                            &e.to_string(),
                            step_start.elapsed().as_millis() as u64,
                        ));
                    }
                }
                continue;
            }

            let result = match executor.execute(&config, &spec.workspace_path).await {
                Ok(result) => {
                    log.record(WorkflowEventKind::StepReturned {
                        step: config.name.clone(),
                        exit_code: result.exit_code,
                        duration_ms: result.duration_ms,
                    });
                    result
                }
                Err(e) => {
                    warn!(step = %config.name, error = %e, "Step execution error");
                    log.record(WorkflowEventKind::StepFailed {
                        step: config.name.clone(),
                        error: e.to_string(),
                    });
                    StepResult::errored(
                        &config.name,
                        &e.to_string(),
                        step_start.elapsed().as_millis() as u64,
                    )
                }
            };

            if config.is_sync() {
                let verdict = PrGate::evaluate(result.exit_code, self.policy);
                info!(open_pull_request = verdict.open_pull_request, passed = verdict.passed, "{}", verdict.message);
                if !verdict.passed {
                    failed = true;
                }
                log.record(WorkflowEventKind::GateEvaluated {
                    verdict: verdict.clone(),
                });
                gate = Some(verdict);
            } else if !result.passed() {
                failed = true;
            }
            results.push(result);
        }

        let success = !failed;
        log.record(WorkflowEventKind::Finished { success });
        if success {
            info!(run_id = %run_id, "Sync workflow completed successfully");
        } else {
            info!(run_id = %run_id, "Sync workflow failed");
        }

        WorkflowResult {
            run_id,
            triggered,
            success,
            steps: results,
            gate,
            pull_request,
            events: log.events,
            duration_ms: start.elapsed().as_millis() as u64,
            steps_digest: spec.steps_digest.clone(),
        }
    }

    fn load_report(&self) -> Option<SyncReport> {
        let path = self.report_path.as_ref()?;
        match SyncReport::read_json(path) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read sync report");
                None
            }
        }
    }
}
