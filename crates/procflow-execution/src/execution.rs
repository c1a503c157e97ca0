//! Activity execution context.
//!
//! An [`ActivityExecution`] wraps one activity for one visit of the graph. It
//! resolves the activity's input and output, tracks which inbound flows are
//! still pending (joins) and in which order outbound flows are considered
//! (forks), suspends the step on `postpone` and produces the snapshot needed
//! to resume it later.
//!
//! # Lifecycle
//! ```text
//! new(activity, message, environment, resolver)
//!   ├── input()                      memoized
//!   ├── set_result(data) / output()
//!   ├── postpone() -> CompletionReceiver
//!   │     └── signal / error / complete   (exactly one)
//!   ├── eligible_outbound()
//!   └── state() ──persist──> apply_state() on a fresh execution
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use procflow_config::{LoopMessage, Message};
use procflow_environment::{Environment, Scope};
use procflow_process::{Activity, SequenceFlow};
use procflow_resolver::{ExpressionResolver, Parameter, is_truthy};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::behaviour::ActivityBehaviour;
use crate::completion::{Completion, CompletionReceiver, Postponement};
use crate::config::{ExecutionConfig, RestorePolicy};
use crate::error::{ActivityFailure, ExecutionError};
use crate::form::Form;
use crate::state::{ExecutionState, FORM_KEY, PENDING_OUTBOUND_KEY};

/// One execution of one activity.
pub struct ActivityExecution {
  id: String,
  activity: Arc<dyn ActivityBehaviour>,
  message: Message,
  environment: Environment,
  inbound_flow: Option<Arc<SequenceFlow>>,
  root_flow: Option<String>,
  resolver: Arc<ExpressionResolver>,
  config: ExecutionConfig,
  input: OnceLock<Arc<Value>>,
  result: Option<Value>,
  pending_inbound: OnceLock<Vec<Arc<SequenceFlow>>>,
  pending_outbound: OnceLock<Vec<Arc<SequenceFlow>>>,
  saved_state: Option<ExecutionState>,
  restored_form: Option<Value>,
  postponement: Postponement,
  stop: CancellationToken,
}

impl ActivityExecution {
  /// Create an execution for `activity` triggered by `message`.
  ///
  /// Only the identity is computed here. A message carrying a parallel loop
  /// iteration gets a unique suffix so sibling iterations never share an id.
  pub fn new(
    activity: Arc<dyn ActivityBehaviour>,
    message: Message,
    environment: Environment,
    resolver: Arc<ExpressionResolver>,
  ) -> Self {
    let id = execution_id(&activity.activity().id, &message);

    debug!(
      execution_id = %id,
      activity_id = %activity.activity().id,
      activity_type = %activity.activity().activity_type,
      "execution created"
    );

    Self {
      id,
      activity,
      message,
      environment,
      inbound_flow: None,
      root_flow: None,
      resolver,
      config: ExecutionConfig::default(),
      input: OnceLock::new(),
      result: None,
      pending_inbound: OnceLock::new(),
      pending_outbound: OnceLock::new(),
      saved_state: None,
      restored_form: None,
      postponement: Postponement::NotPostponed,
      stop: CancellationToken::new(),
    }
  }

  /// Record the inbound flow whose token started this execution.
  pub fn triggered_by(mut self, inbound_flow: Arc<SequenceFlow>) -> Self {
    self.inbound_flow = Some(inbound_flow);
    self
  }

  /// Record the flow that started the enclosing loop, for correlation.
  pub fn with_root_flow(mut self, root_flow: impl Into<String>) -> Self {
    self.root_flow = Some(root_flow.into());
    self
  }

  pub fn with_config(mut self, config: ExecutionConfig) -> Self {
    self.config = config;
    self
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn activity(&self) -> &Activity {
    self.activity.activity()
  }

  pub fn message(&self) -> &Message {
    &self.message
  }

  pub fn environment(&self) -> &Environment {
    &self.environment
  }

  pub fn inbound_flow(&self) -> Option<&Arc<SequenceFlow>> {
    self.inbound_flow.as_ref()
  }

  pub fn root_flow(&self) -> Option<&str> {
    self.root_flow.as_deref()
  }

  // ---------------------------------------------------------------------------
  // Input / output
  // ---------------------------------------------------------------------------

  /// Resolved input, memoized for the lifetime of the execution.
  ///
  /// Without declared input parameters this is the whole environment scope.
  /// Every call returns the same allocation.
  pub fn input(&self) -> Result<Arc<Value>, ExecutionError> {
    if let Some(input) = self.input.get() {
      return Ok(input.clone());
    }
    let resolved = Arc::new(self.resolve_input()?);
    Ok(self.input.get_or_init(|| resolved).clone())
  }

  fn resolve_input(&self) -> Result<Value, ExecutionError> {
    let parameters = self.activity().input_parameters();
    let scope = self.environment.variables_and_services(None);

    if parameters.is_empty() {
      return Ok(scope.to_value());
    }

    let mut input = Map::with_capacity(parameters.len());
    for def in parameters {
      let parameter = Parameter::new(def, &self.resolver);
      let value = parameter.input_value(&self.message, &scope)?;
      input.insert(parameter.name().to_string(), value);
    }

    debug!(execution_id = %self.id, input = ?input, "input resolved");

    Ok(Value::Object(input))
  }

  /// Store the raw behavior result. Later calls overwrite.
  pub fn set_result(&mut self, data: Value) {
    self.result = Some(data);
  }

  pub fn result(&self) -> Option<&Value> {
    self.result.as_ref()
  }

  /// Output of the execution.
  ///
  /// Without declared output parameters this is the raw result (`null` when
  /// none was set). Otherwise each parameter is resolved against the raw
  /// result merged over the resolved input and the environment scope. The
  /// resolved input is also available whole under `input`. Neither can
  /// replace `variables` or `services`.
  pub fn output(&self) -> Result<Value, ExecutionError> {
    let parameters = self.activity().output_parameters();
    let raw = self.result.clone().unwrap_or(Value::Null);

    if parameters.is_empty() {
      return Ok(raw);
    }

    let input = self.input()?;
    let extra = match input.as_ref() {
      Value::Object(fields) => fields.clone(),
      _ => Map::new(),
    };
    let scope = self
      .environment
      .variables_and_services(Some(extra))
      .with("input", input.as_ref().clone());

    let mut output = Map::with_capacity(parameters.len());
    for def in parameters {
      let parameter = Parameter::new(def, &self.resolver);
      let value = parameter.output_value(&raw, &scope)?;
      output.insert(parameter.name().to_string(), value);
    }

    Ok(Value::Object(output))
  }

  /// Environment scope with the resolved input under `input`.
  pub fn context_input(&self) -> Result<Scope, ExecutionError> {
    let input = self.input()?;
    Ok(
      self
        .environment
        .variables_and_services(None)
        .with("input", input.as_ref().clone()),
    )
  }

  /// Environment scope with the resolved input under `input` and the
  /// output under `output`.
  pub fn context_output(&self) -> Result<Scope, ExecutionError> {
    let output = self.output()?;
    Ok(self.context_input()?.with("output", output))
  }

  // ---------------------------------------------------------------------------
  // Postponement
  // ---------------------------------------------------------------------------

  /// Suspend the step until `signal`, `error` or `complete` is called.
  ///
  /// If the activity declares a form, a form bound to the current input and
  /// environment becomes available through [`ActivityExecution::form`].
  /// Field values from a form restored by `apply_state` are carried over.
  /// Postponing again replaces the handles; the previous receiver then
  /// resolves to [`ExecutionError::Abandoned`].
  #[instrument(name = "execution_postpone", skip(self), fields(execution_id = %self.id))]
  pub fn postpone(&mut self) -> Result<CompletionReceiver, ExecutionError> {
    let form = match &self.activity().form {
      Some(def) => {
        let input = self.input()?;
        let mut form = Form::new(def);
        form.init(&input, &self.environment, &self.resolver)?;
        if let Some(snapshot) = &self.restored_form {
          let restored = form.restore(snapshot);
          debug!(restored, "form values restored");
        }
        Some(form)
      }
      None => None,
    };

    if matches!(self.postponement, Postponement::Postponed(_)) {
      warn!("execution postponed again, previous completion handle abandoned");
    }

    let (postponement, receiver) = Postponement::install(&self.id, form);
    self.postponement = postponement;

    info!(has_form = self.form().is_some(), "execution postponed");

    Ok(receiver)
  }

  /// True while the step waits for `signal`, `error` or `complete`.
  pub fn is_postponed(&self) -> bool {
    match &self.postponement {
      Postponement::Postponed(handles) => handles.is_pending(),
      Postponement::NotPostponed => false,
    }
  }

  /// The form bound by `postpone`, if the activity declares one.
  pub fn form(&self) -> Option<&Form> {
    match &self.postponement {
      Postponement::Postponed(handles) => handles.form.as_ref(),
      Postponement::NotPostponed => None,
    }
  }

  pub fn form_mut(&mut self) -> Option<&mut Form> {
    match &mut self.postponement {
      Postponement::Postponed(handles) => handles.form.as_mut(),
      Postponement::NotPostponed => None,
    }
  }

  /// Complete the postponed step with a failure.
  pub fn error(&mut self, failure: ActivityFailure) -> Result<(), ExecutionError> {
    self.complete(Err(failure))
  }

  /// Complete the postponed step with a value.
  pub fn signal(&mut self, value: Value) -> Result<(), ExecutionError> {
    self.complete(Ok(Some(value)))
  }

  /// Complete the postponed step with `completion` as is.
  pub fn complete(&mut self, completion: Completion) -> Result<(), ExecutionError> {
    let Postponement::Postponed(handles) = &mut self.postponement else {
      return Err(ExecutionError::NotPostponed {
        execution_id: self.id.clone(),
      });
    };

    let failed = completion.is_err();
    let delivered = handles.fire(&self.id, completion)?;

    if !delivered {
      warn!(execution_id = %self.id, "completion receiver dropped, completion discarded");
    } else if failed {
      info!(execution_id = %self.id, "postponed execution failed");
    } else {
      info!(execution_id = %self.id, "postponed execution completed");
    }

    Ok(())
  }

  // ---------------------------------------------------------------------------
  // State
  // ---------------------------------------------------------------------------

  /// Snapshot of the execution.
  ///
  /// Merged in increasing precedence: the activity's own state, the bound
  /// form, the pending outbound ids (fork points only), `override_state`,
  /// and finally whatever was stashed with `set_state`.
  pub fn state(&self, override_state: Option<ExecutionState>) -> ExecutionState {
    let mut state = ExecutionState::new();

    if let Some(own) = self.activity.state() {
      state.merge(own);
    }

    if let Some(form) = self.form() {
      state.insert(FORM_KEY, form.state());
    }

    if self.activity().is_fork_point() {
      let ids = self
        .pending_outbound()
        .iter()
        .map(|f| Value::String(f.id.clone()))
        .collect();
      state.insert(PENDING_OUTBOUND_KEY, Value::Array(ids));
    }

    if let Some(override_state) = override_state {
      state.merge(override_state.into_inner());
    }

    if let Some(saved) = &self.saved_state {
      state.merge(saved.as_map().clone());
    }

    state
  }

  /// Stash state that wins over everything else in the next `state()`.
  pub fn set_state(&mut self, state: ExecutionState) {
    self.saved_state = Some(state);
  }

  /// Restore pending flows and entered form values from a persisted snapshot.
  ///
  /// Ids are looked up among the activity's live flows. Ids that no longer
  /// exist are dropped with a warning, or rejected under
  /// [`RestorePolicy::Strict`]. Restored sets replace any cached ones.
  #[instrument(name = "execution_apply_state", skip(self, state), fields(execution_id = %self.id))]
  pub fn apply_state(&mut self, state: &ExecutionState) -> Result<(), ExecutionError> {
    if let Some(ids) = state.pending_inbound()? {
      let flows = self.restore_flows(&ids, &self.activity().inbound, "inbound")?;
      debug!(pending_inbound = ?ids, restored = flows.len(), "pending inbound restored");
      self.pending_inbound = OnceLock::from(flows);
    }

    if let Some(ids) = state.pending_outbound()? {
      let flows = self.restore_flows(&ids, &self.activity().outbound, "outbound")?;
      debug!(pending_outbound = ?ids, restored = flows.len(), "pending outbound restored");
      self.pending_outbound = OnceLock::from(flows);
    }

    if let Some(form) = state.form() {
      self.restored_form = Some(form.clone());
    }

    Ok(())
  }

  fn restore_flows(
    &self,
    ids: &[String],
    live: &[Arc<SequenceFlow>],
    direction: &'static str,
  ) -> Result<Vec<Arc<SequenceFlow>>, ExecutionError> {
    let mut flows = Vec::with_capacity(ids.len());

    for id in ids {
      match live.iter().find(|f| f.id == *id) {
        Some(flow) => flows.push(flow.clone()),
        None => match self.config.restore_policy {
          RestorePolicy::Lenient => {
            warn!(
              execution_id = %self.id,
              direction,
              flow_id = %id,
              "dropping unknown flow from persisted state"
            );
          }
          RestorePolicy::Strict => {
            return Err(ExecutionError::UnknownFlow {
              execution_id: self.id.clone(),
              direction,
              flow_id: id.clone(),
            });
          }
        },
      }
    }

    Ok(flows)
  }

  // ---------------------------------------------------------------------------
  // Pending flows
  // ---------------------------------------------------------------------------

  /// Inbound flows not yet consumed, computed once.
  ///
  /// The flow that triggered this execution is excluded.
  pub fn pending_inbound(&self) -> &[Arc<SequenceFlow>] {
    self.pending_inbound.get_or_init(|| {
      let inbound = &self.activity().inbound;
      match &self.inbound_flow {
        Some(trigger) => inbound
          .iter()
          .filter(|f| f.id != trigger.id)
          .cloned()
          .collect(),
        None => inbound.clone(),
      }
    })
  }

  /// Outbound flows in evaluation order, computed once.
  ///
  /// The default flow, if any, is moved last; the others keep their order.
  pub fn pending_outbound(&self) -> &[Arc<SequenceFlow>] {
    self.pending_outbound.get_or_init(|| {
      let (defaults, mut flows): (Vec<_>, Vec<_>) = self
        .activity()
        .outbound
        .iter()
        .cloned()
        .partition(|f| f.is_default);
      flows.extend(defaults);
      flows
    })
  }

  /// Outbound flows to activate once the step has completed.
  ///
  /// Walks [`ActivityExecution::pending_outbound`] in order. Unconditional
  /// flows and flows whose condition is truthy against
  /// [`ActivityExecution::context_output`] are taken. The default flow is
  /// taken only when nothing else was.
  pub fn eligible_outbound(&self) -> Result<Vec<Arc<SequenceFlow>>, ExecutionError> {
    let pending = self.pending_outbound();
    if pending.is_empty() {
      return Ok(Vec::new());
    }

    let scope = self.context_output()?;
    let mut taken = Vec::new();
    let mut default_flow = None;

    for flow in pending {
      if flow.is_default {
        default_flow = Some(flow.clone());
        continue;
      }
      let selected = match &flow.condition {
        Some(condition) => is_truthy(&self.resolve_expression(condition, Some(&scope))?),
        None => true,
      };
      debug!(execution_id = %self.id, flow_id = %flow.id, selected, "outbound flow evaluated");
      if selected {
        taken.push(flow.clone());
      }
    }

    if taken.is_empty() {
      taken.extend(default_flow);
    }

    Ok(taken)
  }

  // ---------------------------------------------------------------------------
  // Loops
  // ---------------------------------------------------------------------------

  /// A fresh execution for one loop iteration of the same activity.
  ///
  /// The iteration gets a scoped environment, its own identity and its own
  /// caches. Nothing is shared with this execution except the activity,
  /// flows, resolver and config.
  pub fn iteration(&self, loop_message: LoopMessage) -> ActivityExecution {
    let environment = self.environment.clone_for_iteration(&loop_message);
    let message = self.message.clone().with_loop(loop_message);

    let mut iteration = ActivityExecution::new(
      self.activity.clone(),
      message,
      environment,
      self.resolver.clone(),
    )
    .with_config(self.config.clone());
    iteration.inbound_flow = self.inbound_flow.clone();
    iteration.root_flow = self.root_flow.clone();
    iteration
  }

  // ---------------------------------------------------------------------------
  // Cancellation
  // ---------------------------------------------------------------------------

  pub fn cancel(&self) {
    debug!(execution_id = %self.id, "cancelling activity");
    self.activity.cancel();
  }

  /// Discard this branch, attributing it to the inbound and root flows it
  /// was created with.
  pub fn discard(&self) {
    debug!(execution_id = %self.id, "discarding activity");
    self
      .activity
      .discard(self.inbound_flow.as_deref(), self.root_flow.as_deref());
  }

  /// Mark this execution stopped. Advisory only.
  pub fn stop(&self) {
    self.stop.cancel();
  }

  pub fn is_stopped(&self) -> bool {
    self.stop.is_cancelled()
  }

  /// Token cancelled by `stop`, for callers that want to await it.
  pub fn stopped(&self) -> CancellationToken {
    self.stop.clone()
  }

  // ---------------------------------------------------------------------------
  // Expressions
  // ---------------------------------------------------------------------------

  /// Evaluate an expression, against the environment scope by default.
  pub fn resolve_expression(
    &self,
    expression: &str,
    scope: Option<&Scope>,
  ) -> Result<Value, ExecutionError> {
    let value = match scope {
      Some(scope) => self.resolver.resolve(expression, scope)?,
      None => self
        .resolver
        .resolve(expression, &self.environment.variables_and_services(None))?,
    };
    Ok(value)
  }
}

impl fmt::Debug for ActivityExecution {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ActivityExecution")
      .field("id", &self.id)
      .field("activity_id", &self.activity().id)
      .field("inbound_flow", &self.inbound_flow.as_ref().map(|f| &f.id))
      .field("root_flow", &self.root_flow)
      .field("postponed", &self.is_postponed())
      .field("stopped", &self.is_stopped())
      .finish()
  }
}

fn execution_id(activity_id: &str, message: &Message) -> String {
  if message.is_parallel_iteration() {
    format!("{}_{}", activity_id, uuid::Uuid::new_v4().simple())
  } else {
    activity_id.to_string()
  }
}
