use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing::info;

use procflow_config::{Message, ProcessDef};
use procflow_environment::Environment;
use procflow_execution::{ActivityExecution, ExecutionConfig, ExecutionState};
use procflow_process::Process;
use procflow_resolver::ExpressionResolver;

/// Procflow - activity execution for process graphs
#[derive(Parser)]
#[command(name = "procflow")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run one step of an activity and print its execution report
  Step {
    /// Path to the process definition (JSON)
    definition_file: PathBuf,

    /// The activity ID to execute
    #[arg(long)]
    activity: String,

    /// Inbound flow that triggered the activity
    #[arg(long)]
    inbound: Option<String>,

    /// Persisted execution state to resume from (JSON). Pending flows and
    /// entered form values are restored
    #[arg(long)]
    state: Option<PathBuf>,

    /// Complete the step with this JSON value
    #[arg(long)]
    signal: Option<String>,

    /// Fail when persisted state references flows the process no longer has
    #[arg(long)]
    strict: bool,
  },
}

struct StepArgs {
  definition_file: PathBuf,
  activity: String,
  inbound: Option<String>,
  state: Option<PathBuf>,
  signal: Option<String>,
  strict: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
    )
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Step {
      definition_file,
      activity,
      inbound,
      state,
      signal,
      strict,
    }) => {
      run_step(StepArgs {
        definition_file,
        activity,
        inbound,
        state,
        signal,
        strict,
      })?;
    }
    None => {
      println!("procflow - use --help to see available commands");
    }
  }

  Ok(())
}

fn run_step(args: StepArgs) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run_step_async(args).await })
}

async fn run_step_async(args: StepArgs) -> Result<()> {
  let process = load_process(&args.definition_file).await?;

  let activity = process
    .activity(&args.activity)
    .with_context(|| format!("activity '{}' not found in process", args.activity))?
    .clone();

  let variables = match read_payload_from_stdin()? {
    Value::Object(variables) => variables,
    other => bail!("variables must be a JSON object, got {}", other),
  };

  let config = if args.strict {
    ExecutionConfig::strict()
  } else {
    ExecutionConfig::default()
  };

  let mut execution = ActivityExecution::new(
    activity.clone(),
    Message::default(),
    Environment::with_variables(variables),
    Arc::new(ExpressionResolver::new()),
  )
  .with_config(config);

  if let Some(flow_id) = &args.inbound {
    let flow = activity
      .inbound_flow(flow_id)
      .with_context(|| format!("'{}' is not an inbound flow of '{}'", flow_id, activity.id))?
      .clone();
    execution = execution.triggered_by(flow);
  }

  if let Some(path) = &args.state {
    let state = read_state(path).await?;
    execution
      .apply_state(&state)
      .context("failed to apply persisted state")?;
  }

  let input = execution.input().context("failed to resolve input")?;

  let signal = args
    .signal
    .as_deref()
    .map(|raw| serde_json::from_str::<Value>(raw))
    .transpose()
    .context("failed to parse --signal JSON")?;

  let result = match signal {
    Some(value) => {
      let receiver = execution.postpone().context("failed to postpone step")?;
      execution.signal(value)?;
      match receiver.await? {
        Ok(value) => value.unwrap_or(Value::Null),
        Err(failure) => bail!("step failed: {}", failure),
      }
    }
    None if activity.form.is_some() => {
      let _receiver = execution.postpone().context("failed to postpone step")?;
      info!(execution_id = %execution.id(), "step postponed waiting for form");

      let report = json!({
        "executionId": execution.id(),
        "input": input.as_ref(),
        "postponed": true,
        "form": execution.form(),
        "state": execution.state(None),
      });
      println!("{}", serde_json::to_string_pretty(&report)?);
      return Ok(());
    }
    // Pass-through: an activity without a behavior hands its input on.
    None => input.as_ref().clone(),
  };

  execution.set_result(result);

  let output = execution.output().context("failed to resolve output")?;
  let eligible: Vec<String> = execution
    .eligible_outbound()
    .context("failed to evaluate outbound flows")?
    .iter()
    .map(|f| f.id.clone())
    .collect();

  let report = json!({
    "executionId": execution.id(),
    "input": input.as_ref(),
    "output": output,
    "eligibleOutbound": eligible,
    "state": execution.state(None),
  });
  println!("{}", serde_json::to_string_pretty(&report)?);

  Ok(())
}

async fn load_process(path: &Path) -> Result<Process> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read process file: {}", path.display()))?;

  let def: ProcessDef = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse process file: {}", path.display()))?;

  info!(process_id = %def.id, activities = def.activities.len(), "loaded process");

  Process::new(def).with_context(|| format!("invalid process: {}", path.display()))
}

async fn read_state(path: &Path) -> Result<ExecutionState> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read state file: {}", path.display()))?;

  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse state file: {}", path.display()))
}

fn read_payload_from_stdin() -> Result<Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, use empty object
    Ok(json!({}))
  } else {
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read variables from stdin")?;

    if input.trim().is_empty() {
      Ok(json!({}))
    } else {
      serde_json::from_str(&input).context("failed to parse variables JSON from stdin")
    }
  }
}
