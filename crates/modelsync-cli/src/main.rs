//! kicad-model-sync - keep `${KIPRJMOD}` 3D model entries in step with
//! their `${KICAD_3RD_PARTY}` counterparts.
//!
//! Invoked without a subcommand it syncs every `.kicad_mod` file below the
//! search directory. Exit codes: 0 clean, 1 files modified, 2 failure.
//!
//! ## Commands
//!
//! - `trigger`: check whether a set of changed paths fires the workflow
//! - `workflow`: run sync, PR gate and PR planning end to end

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use modelsync_ci::{
    default_steps, load_trigger_filter, CommandExecutor, GitWorkingTree, PrTriggerPolicy,
    StepConfig, SyncWorkflow, TriggerEvent, TriggerFilter, WorkflowResult, WorkflowSpec,
};
use modelsync_core::{
    process_tree, telemetry, SyncConfig, SyncExit, DEFAULT_PROJECT_MODEL_DIR,
    GITHUB_WORKSPACE_ENV, PROJECT_MODEL_DIR_ENV,
};

/// Default timeout for workflow steps, in seconds.
const STEP_TIMEOUT_SECS: u64 = 600;

#[derive(Parser, Debug)]
#[command(name = "kicad-model-sync")]
#[command(author = "Stevedores Org")]
#[command(version = modelsync_core::VERSION)]
#[command(about = "Sync KiCad footprint 3D model references", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    sync: SyncArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug)]
struct SyncArgs {
    /// Directory to search for .kicad_mod files (GITHUB_WORKSPACE wins when set)
    #[arg(short, long, default_value = ".")]
    directory: PathBuf,

    /// Show what would be changed without modifying files
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Write a JSON report of the run to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Directory below ${KIPRJMOD} for newly added project models
    #[arg(long, env = PROJECT_MODEL_DIR_ENV, default_value = DEFAULT_PROJECT_MODEL_DIR)]
    project_model_dir: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check whether changed paths fire the sync workflow (exit 0 = fires)
    Trigger {
        /// Repository event
        #[arg(long, value_enum, default_value = "push")]
        event: EventArg,

        /// Workflow file to read path filters from (default: **/*.kicad_mod)
        #[arg(long)]
        workflow: Option<PathBuf>,

        /// Changed paths, relative to the repository root
        paths: Vec<String>,
    },

    /// Run the whole workflow: sync, PR gate, PR plan
    Workflow {
        /// Repository checkout to run in
        #[arg(long, default_value = ".")]
        workspace: PathBuf,

        /// Repository event
        #[arg(long, value_enum, default_value = "push")]
        event: EventArg,

        /// Which sync exit codes open a pull request
        #[arg(long, value_enum, default_value = "changes-pending")]
        policy: PolicyArg,

        /// Workflow file to read path filters from (default: **/*.kicad_mod)
        #[arg(long)]
        workflow: Option<PathBuf>,

        /// Command line for the sync step (default: this executable)
        #[arg(long)]
        sync_command: Option<String>,

        /// Step timeout in seconds (0 = none)
        #[arg(long, default_value_t = STEP_TIMEOUT_SECS)]
        timeout: u64,

        /// Write the pull-request plan as JSON to this file
        #[arg(long)]
        plan_out: Option<PathBuf>,

        /// Write the full workflow result as JSON to this file
        #[arg(long)]
        result_out: Option<PathBuf>,

        /// Changed paths, relative to the repository root
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EventArg {
    Push,
    PullRequest,
}

impl From<EventArg> for TriggerEvent {
    fn from(arg: EventArg) -> Self {
        match arg {
            EventArg::Push => TriggerEvent::Push,
            EventArg::PullRequest => TriggerEvent::PullRequest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    ChangesPending,
    AnyFailure,
}

impl From<PolicyArg> for PrTriggerPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::ChangesPending => PrTriggerPolicy::ChangesPendingOnly,
            PolicyArg::AnyFailure => PrTriggerPolicy::AnyFailure,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    telemetry::init_tracing(cli.json, telemetry::level_for(cli.verbose));

    let outcome = match cli.command {
        None => {
            let config = sync_config(&cli.sync, std::env::var(GITHUB_WORKSPACE_ENV).ok());
            run_sync(&config).map(|exit| exit.code())
        }
        Some(Commands::Trigger {
            event,
            workflow,
            paths,
        }) => cmd_trigger(event.into(), workflow.as_deref(), &paths),
        Some(Commands::Workflow {
            workspace,
            event,
            policy,
            workflow,
            sync_command,
            timeout,
            plan_out,
            result_out,
            paths,
        }) => {
            cmd_workflow(WorkflowArgs {
                workspace,
                event: event.into(),
                policy: policy.into(),
                workflow,
                sync_command,
                timeout,
                plan_out,
                result_out,
                paths,
            })
            .await
        }
    };

    match outcome {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(SyncExit::Failed.code())
        }
    }
}

fn sync_config(args: &SyncArgs, workspace_env: Option<String>) -> SyncConfig {
    SyncConfig::new(SyncConfig::resolve_root_with(&args.directory, workspace_env))
        .with_dry_run(args.dry_run)
        .with_project_model_dir(args.project_model_dir.clone())
        .with_report_path(args.report.clone())
}

fn run_sync(config: &SyncConfig) -> Result<SyncExit> {
    let report = process_tree(config)
        .with_context(|| format!("Failed to sync footprints in {}", config.root.display()))?;

    print!("\n{}", report.render_summary());

    if let Some(path) = &config.report_path {
        report.write_json(path)?;
        info!(path = %path.display(), "wrote sync report");
    }

    Ok(report.exit_status())
}

fn trigger_filter(workflow: Option<&Path>) -> Result<TriggerFilter> {
    match workflow {
        Some(path) => load_trigger_filter(path)
            .with_context(|| format!("Failed to load trigger filter from {}", path.display())),
        None => Ok(TriggerFilter::default()),
    }
}

fn cmd_trigger(event: TriggerEvent, workflow: Option<&Path>, paths: &[String]) -> Result<u8> {
    let filter = trigger_filter(workflow)?;
    let matched: Vec<&String> = paths
        .iter()
        .filter(|p| filter.path_matches(event, p))
        .collect();

    if matched.is_empty() {
        println!("Workflow not triggered by {event}: no matching paths");
        return Ok(1);
    }

    println!("Workflow triggered by {event}:");
    for path in matched {
        println!("  {path}");
    }
    Ok(0)
}

struct WorkflowArgs {
    workspace: PathBuf,
    event: TriggerEvent,
    policy: PrTriggerPolicy,
    workflow: Option<PathBuf>,
    sync_command: Option<String>,
    timeout: u64,
    plan_out: Option<PathBuf>,
    result_out: Option<PathBuf>,
    paths: Vec<String>,
}

/// Sync step command line: explicit, or this executable writing a report.
fn sync_step_command(explicit: Option<&str>, report_path: &Path) -> Result<Vec<String>> {
    if let Some(command) = explicit {
        let parts: Vec<String> = command.split_whitespace().map(str::to_string).collect();
        anyhow::ensure!(!parts.is_empty(), "--sync-command must not be empty");
        return Ok(parts);
    }
    let exe = std::env::current_exe().context("Failed to locate the current executable")?;
    Ok(vec![
        exe.to_string_lossy().to_string(),
        "--report".to_string(),
        report_path.to_string_lossy().to_string(),
    ])
}

async fn cmd_workflow(args: WorkflowArgs) -> Result<u8> {
    let filter = trigger_filter(args.workflow.as_deref())?;
    let scratch = tempfile::tempdir().context("Failed to create scratch directory")?;
    let report_path = scratch.path().join("sync-report.json");

    let sync_command = sync_step_command(args.sync_command.as_deref(), &report_path)?;
    let uses_own_report = args.sync_command.is_none();
    let steps: Vec<StepConfig> = default_steps(sync_command, args.timeout);

    let tree = GitWorkingTree::new(&args.workspace);
    let spec = WorkflowSpec::new(
        args.workspace.clone(),
        args.event,
        args.paths,
        tree.head_sha().await,
        &steps,
    );

    println!("Running sync workflow for workspace: {:?}", spec.workspace_path);
    println!("Event: {}", spec.event);
    println!("Git SHA: {}", spec.git_sha.as_deref().unwrap_or("unknown"));
    println!();

    let workflow = SyncWorkflow::new(filter, args.policy)
        .with_report_path(uses_own_report.then(|| report_path.clone()));
    let result = workflow.run(&CommandExecutor, &tree, &spec, steps).await;

    print_workflow_result(&result);

    if let (Some(path), Some(plan)) = (&args.plan_out, &result.pull_request) {
        plan.write_json(path)?;
        println!("PR plan written to {}", path.display());
    }
    if let Some(path) = &args.result_out {
        let content = serde_json::to_string_pretty(&result).context("serialize workflow result")?;
        std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    }

    Ok(result.exit_code())
}

fn print_workflow_result(result: &WorkflowResult) {
    println!("Run ID: {}", result.run_id);
    if !result.triggered {
        println!("Status: not triggered (no matching paths)");
        return;
    }
    println!("Status: {}", if result.success { "✓ PASSED" } else { "✗ FAILED" });
    println!("Duration: {}ms", result.duration_ms);
    println!();

    for step in &result.steps {
        let status = if step.passed() { "✓" } else { "✗" };
        println!(
            "  {} {} ({}ms, exit code: {})",
            status, step.step_name, step.duration_ms, step.exit_code
        );
    }

    if let Some(gate) = &result.gate {
        println!();
        println!("Gate: {}", gate.message);
        for violation in &gate.violations {
            println!("  - {}", violation);
        }
    }

    if let Some(plan) = &result.pull_request {
        println!();
        println!("Pull request: {} ({})", plan.title, plan.branch);
        for file in &plan.files {
            println!("  {}", file);
        }
    }
}
