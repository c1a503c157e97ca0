//! Integration tests for ActivityExecution against small process graphs.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use procflow_config::{
  ActivityDef, FormDef, FormFieldDef, IoDef, LoopMessage, Message, ParameterDef, ProcessDef,
  SequenceFlowDef,
};
use procflow_environment::{Environment, ServiceError};
use procflow_execution::{
  ActivityBehaviour, ActivityExecution, ActivityFailure, ExecutionConfig, ExecutionError,
  ExecutionState,
};
use procflow_process::{Activity, Process, SequenceFlow};
use procflow_resolver::ExpressionResolver;
use serde_json::{Map, Value, json};

fn object(value: Value) -> Map<String, Value> {
  value.as_object().cloned().unwrap_or_default()
}

fn ids(flows: &[Arc<SequenceFlow>]) -> Vec<String> {
  flows.iter().map(|f| f.id.clone()).collect()
}

/// start -> review -> {A: a, B: b (default), C: c}, plus a second inbound edge.
fn review_process(review: ActivityDef) -> Process {
  Process::new(ProcessDef {
    id: "order".to_string(),
    name: "Order review".to_string(),
    activities: vec![
      ActivityDef::new("start", "startEvent"),
      ActivityDef::new("retry", "task"),
      review,
      ActivityDef::new("a", "task"),
      ActivityDef::new("b", "task"),
      ActivityDef::new("c", "task"),
    ],
    sequence_flows: vec![
      SequenceFlowDef::new("toReview", "start", "review"),
      SequenceFlowDef::new("retryReview", "retry", "review"),
      SequenceFlowDef::new("A", "review", "a").with_condition("output.approved"),
      SequenceFlowDef::new("B", "review", "b").default_flow(),
      SequenceFlowDef::new("C", "review", "c").with_condition("output.amount > 100"),
    ],
  })
  .unwrap()
}

fn execution_for(process: &Process, message: Message, variables: Value) -> ActivityExecution {
  ActivityExecution::new(
    process.activity("review").unwrap().clone(),
    message,
    Environment::with_variables(object(variables)),
    Arc::new(ExpressionResolver::new()),
  )
}

/// Environment with `limit` set and a `double` service.
fn environment_with_services(variables: Value) -> Environment {
  let mut environment = Environment::with_variables(object(variables));
  environment.register_service(
    "double",
    Arc::new(|args: Vec<Value>| -> Result<Value, ServiceError> {
      let n = args
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| ServiceError("expected a number".to_string()))?;
      Ok(json!(n * 2))
    }),
  );
  environment
}

fn execution_with_io(io: IoDef, message: Message) -> ActivityExecution {
  let process = review_process(ActivityDef::new("review", "serviceTask").with_io(io));
  ActivityExecution::new(
    process.activity("review").unwrap().clone(),
    message,
    environment_with_services(json!({ "limit": 5 })),
    Arc::new(ExpressionResolver::new()),
  )
}

/// Activity with its own state and recorded lifecycle calls.
struct Tracked {
  activity: Activity,
  own_state: Map<String, Value>,
  calls: Mutex<Vec<String>>,
}

impl Tracked {
  fn new(activity: &Activity, own_state: Value) -> Self {
    Self {
      activity: activity.clone(),
      own_state: object(own_state),
      calls: Mutex::new(Vec::new()),
    }
  }
}

impl ActivityBehaviour for Tracked {
  fn activity(&self) -> &Activity {
    &self.activity
  }

  fn state(&self) -> Option<Map<String, Value>> {
    Some(self.own_state.clone())
  }

  fn cancel(&self) {
    self.calls.lock().unwrap().push("cancel".to_string());
  }

  fn discard(&self, inbound_flow: Option<&SequenceFlow>, root_flow: Option<&str>) {
    self.calls.lock().unwrap().push(format!(
      "discard:{}:{}",
      inbound_flow.map(|f| f.id.as_str()).unwrap_or("-"),
      root_flow.unwrap_or("-")
    ));
  }
}

// -----------------------------------------------------------------------------
// Input / output
// -----------------------------------------------------------------------------

#[test]
fn test_input_without_parameters_is_environment_scope() {
  let process = review_process(ActivityDef::new("review", "userTask"));
  let execution = execution_for(&process, Message::default(), json!({ "amount": 5 }));

  let input = execution.input().unwrap();
  assert_eq!(*input, json!({ "variables": { "amount": 5 }, "services": [] }));
}

#[test]
fn test_input_is_memoized() {
  let review = ActivityDef::new("review", "userTask").with_io(IoDef {
    input: vec![
      ParameterDef::named("orderId"),
      ParameterDef::expression("double", "${ variables.amount * 2 }"),
      ParameterDef::literal("retries", json!(3)),
    ],
    output: vec![],
  });
  let process = review_process(review);
  let execution = execution_for(
    &process,
    Message::from_value(json!({ "orderId": 7 })),
    json!({ "amount": 21 }),
  );

  let first = execution.input().unwrap();
  let second = execution.input().unwrap();
  assert!(Arc::ptr_eq(&first, &second));
  assert_eq!(*first, json!({ "orderId": 7, "double": 42, "retries": 3 }));
}

#[test]
fn test_output_parameters_map_raw_result() {
  let review = ActivityDef::new("review", "serviceTask").with_io(IoDef {
    input: vec![],
    output: vec![ParameterDef::expression("result", "r")],
  });
  let process = review_process(review);
  let mut execution = execution_for(&process, Message::default(), json!({}));

  execution.set_result(json!({ "r": 10 }));
  assert_eq!(execution.output().unwrap(), json!({ "result": 10 }));
}

#[test]
fn test_output_without_parameters_is_raw_result() {
  let process = review_process(ActivityDef::new("review", "task"));
  let mut execution = execution_for(&process, Message::default(), json!({}));

  assert_eq!(execution.output().unwrap(), Value::Null);
  execution.set_result(json!({ "r": 1 }));
  execution.set_result(json!({ "r": 2 }));
  assert_eq!(execution.output().unwrap(), json!({ "r": 2 }));
}

#[test]
fn test_output_calls_services_without_input_parameters() {
  let mut execution = execution_with_io(
    IoDef {
      input: vec![],
      output: vec![
        ParameterDef::expression("doubled", "services.double(r)"),
        ParameterDef::expression("limit", "variables.limit"),
      ],
    },
    Message::default(),
  );

  execution.set_result(json!({ "r": 21 }));
  assert_eq!(
    execution.output().unwrap(),
    json!({ "doubled": 42, "limit": 5 })
  );
}

#[test]
fn test_output_reads_input_variables_and_services() {
  let mut execution = execution_with_io(
    IoDef {
      input: vec![ParameterDef::named("orderId"), ParameterDef::literal("qty", json!(4))],
      output: vec![
        ParameterDef::expression("order", "orderId"),
        ParameterDef::expression("total", "services.double(qty) + variables.limit"),
        ParameterDef::expression("fromInput", "input.qty"),
        ParameterDef::expression("raw", "r"),
      ],
    },
    Message::from_value(json!({ "orderId": "o-7" })),
  );

  execution.set_result(json!({ "r": 1 }));
  assert_eq!(
    execution.output().unwrap(),
    json!({ "order": "o-7", "total": 13, "fromInput": 4, "raw": 1 })
  );
}

#[test]
fn test_payload_fields_do_not_hide_environment() {
  let mut execution = execution_with_io(
    IoDef {
      input: vec![ParameterDef::expression("lim", "variables.limit")],
      output: vec![ParameterDef::expression("doubled", "services.double(variables.limit)")],
    },
    Message::from_value(json!({ "variables": "x" })),
  );

  assert_eq!(*execution.input().unwrap(), json!({ "lim": 5 }));

  execution.set_result(json!({ "services": [], "variables": null }));
  assert_eq!(execution.output().unwrap(), json!({ "doubled": 10 }));
}

#[test]
fn test_context_input_exposes_input() {
  let execution = execution_with_io(
    IoDef {
      input: vec![ParameterDef::named("orderId")],
      output: vec![],
    },
    Message::from_value(json!({ "orderId": 9 })),
  );

  let scope = execution.context_input().unwrap();
  assert_eq!(scope.get("input"), Some(json!({ "orderId": 9 })));
  assert_eq!(scope.get("variables"), Some(json!({ "limit": 5 })));
  assert_eq!(scope.get("services"), Some(json!(["double"])));
  assert_eq!(scope.get("output"), None);
  assert_eq!(
    execution.resolve_expression("services.double(input.orderId)", Some(&scope)).unwrap(),
    json!(18)
  );
}

#[test]
fn test_context_output_exposes_input_and_output() {
  let process = review_process(ActivityDef::new("review", "task"));
  let mut execution = execution_for(&process, Message::default(), json!({ "k": 1 }));
  execution.set_result(json!({ "approved": true }));

  let scope = execution.context_output().unwrap();
  assert_eq!(scope.get("output"), Some(json!({ "approved": true })));
  assert_eq!(scope.get("variables"), Some(json!({ "k": 1 })));
  assert!(scope.get("input").is_some());
}

// -----------------------------------------------------------------------------
// Pending flows
// -----------------------------------------------------------------------------

#[test]
fn test_default_flow_is_last() {
  let process = review_process(ActivityDef::new("review", "exclusiveGateway"));
  let execution = execution_for(&process, Message::default(), json!({}));

  assert_eq!(ids(execution.pending_outbound()), vec!["A", "C", "B"]);
  assert_eq!(ids(execution.pending_outbound()), vec!["A", "C", "B"]);
}

#[test]
fn test_triggering_flow_excluded_from_pending_inbound() {
  let process = review_process(ActivityDef::new("review", "parallelGateway"));
  let trigger = process.flow("toReview").unwrap().clone();

  let triggered = execution_for(&process, Message::default(), json!({})).triggered_by(trigger);
  assert_eq!(ids(triggered.pending_inbound()), vec!["retryReview"]);

  let untriggered = execution_for(&process, Message::default(), json!({}));
  assert_eq!(
    ids(untriggered.pending_inbound()),
    vec!["toReview", "retryReview"]
  );
}

#[test]
fn test_eligible_outbound_scenarios() {
  let process = review_process(ActivityDef::new("review", "exclusiveGateway"));

  let mut approved = execution_for(&process, Message::default(), json!({}));
  approved.set_result(json!({ "approved": true, "amount": 50 }));
  assert_eq!(ids(&approved.eligible_outbound().unwrap()), vec!["A"]);

  let mut both = execution_for(&process, Message::default(), json!({}));
  both.set_result(json!({ "approved": true, "amount": 500 }));
  assert_eq!(ids(&both.eligible_outbound().unwrap()), vec!["A", "C"]);

  let mut neither = execution_for(&process, Message::default(), json!({}));
  neither.set_result(json!({ "approved": false, "amount": 1 }));
  assert_eq!(ids(&neither.eligible_outbound().unwrap()), vec!["B"]);
}

// -----------------------------------------------------------------------------
// Identity
// -----------------------------------------------------------------------------

#[test]
fn test_sequential_iterations_share_activity_id() {
  let process = review_process(ActivityDef::new("review", "task"));
  let base = execution_for(&process, Message::default(), json!({}));
  assert_eq!(base.id(), "review");

  let first = base.iteration(LoopMessage::sequential(0));
  let second = base.iteration(LoopMessage::sequential(1));
  assert_eq!(first.id(), "review");
  assert_eq!(second.id(), "review");
}

#[test]
fn test_parallel_iterations_get_unique_ids() {
  let process = review_process(ActivityDef::new("review", "task"));
  let base = execution_for(&process, Message::default(), json!({}));

  let ids: HashSet<String> = (0..3)
    .map(|i| base.iteration(LoopMessage::parallel(i)).id().to_string())
    .collect();

  assert_eq!(ids.len(), 3);
  assert!(ids.iter().all(|id| id.starts_with("review_")));
}

#[test]
fn test_iteration_scopes_environment() {
  let process = review_process(ActivityDef::new("review", "task"));
  let base = execution_for(&process, Message::default(), json!({ "k": 1 }))
    .with_root_flow("toReview");

  let iteration = base.iteration(LoopMessage::parallel(2).with_item(json!("sku-3")));
  assert_eq!(iteration.root_flow(), Some("toReview"));
  assert_eq!(
    iteration.resolve_expression("item ~ '/' ~ loop.index", None).unwrap(),
    json!("sku-3/2")
  );
  assert!(base.environment().iteration().is_none());

  let input = iteration.input().unwrap();
  assert_eq!(input["item"], json!("sku-3"));
  assert!(!Arc::ptr_eq(&input, &base.input().unwrap()));
}

// -----------------------------------------------------------------------------
// State
// -----------------------------------------------------------------------------

#[test]
fn test_state_round_trip_restores_outbound_order() {
  let process = review_process(ActivityDef::new("review", "exclusiveGateway"));
  let mut execution = execution_for(&process, Message::default(), json!({}));
  execution
    .apply_state(&ExecutionState::try_from(json!({ "pendingOutbound": ["C", "A", "B"] })).unwrap())
    .unwrap();

  let snapshot = execution.state(None);
  assert_eq!(snapshot.get("pendingOutbound"), Some(&json!(["C", "A", "B"])));

  let persisted = serde_json::to_string(&snapshot).unwrap();
  let restored: ExecutionState = serde_json::from_str(&persisted).unwrap();

  let mut fresh = execution_for(&process, Message::default(), json!({}));
  fresh.apply_state(&restored).unwrap();
  assert_eq!(ids(fresh.pending_outbound()), vec!["C", "A", "B"]);
}

#[test]
fn test_state_omits_outbound_when_not_fork_point() {
  let process = Process::new(ProcessDef {
    id: "p".to_string(),
    name: String::new(),
    activities: vec![ActivityDef::new("one", "task"), ActivityDef::new("two", "task")],
    sequence_flows: vec![SequenceFlowDef::new("f", "one", "two")],
  })
  .unwrap();
  let execution = ActivityExecution::new(
    process.activity("one").unwrap().clone(),
    Message::default(),
    Environment::new(),
    Arc::new(ExpressionResolver::new()),
  );

  assert_eq!(execution.state(None), ExecutionState::new());
}

#[test]
fn test_state_precedence() {
  let process = review_process(ActivityDef::new("review", "task"));
  let activity = Arc::new(Tracked::new(
    process.activity("review").unwrap(),
    json!({ "x": 0, "own": true }),
  ));
  let mut execution = ActivityExecution::new(
    activity,
    Message::default(),
    Environment::new(),
    Arc::new(ExpressionResolver::new()),
  );

  execution.set_state(ExecutionState::from(object(json!({ "x": 1 }))));
  let state = execution.state(Some(ExecutionState::from(object(json!({ "y": 2, "x": 3 })))));

  assert_eq!(state.get("x"), Some(&json!(1)));
  assert_eq!(state.get("y"), Some(&json!(2)));
  assert_eq!(state.get("own"), Some(&json!(true)));
  assert_eq!(state.get("pendingOutbound"), Some(&json!(["A", "C", "B"])));
}

#[test]
fn test_strict_restore_fails_on_unknown_flow() {
  let process = review_process(ActivityDef::new("review", "exclusiveGateway"));
  let mut execution = execution_for(&process, Message::default(), json!({}))
    .with_config(ExecutionConfig::strict());

  let err = execution
    .apply_state(&ExecutionState::try_from(json!({ "pendingInbound": ["removed"] })).unwrap())
    .unwrap_err();
  assert!(matches!(err, ExecutionError::UnknownFlow { direction: "inbound", .. }));
}

#[test]
fn test_apply_state_rejects_malformed_ids() {
  let process = review_process(ActivityDef::new("review", "exclusiveGateway"));
  let mut execution = execution_for(&process, Message::default(), json!({}));

  let err = execution
    .apply_state(&ExecutionState::try_from(json!({ "pendingOutbound": "A" })).unwrap())
    .unwrap_err();
  assert!(matches!(err, ExecutionError::InvalidState { .. }));
}

// -----------------------------------------------------------------------------
// Postponement
// -----------------------------------------------------------------------------

#[tokio::test]
async fn test_postpone_then_signal() {
  let process = review_process(ActivityDef::new("review", "userTask"));
  let mut execution = execution_for(&process, Message::default(), json!({}));

  let receiver = execution.postpone().unwrap();
  assert!(execution.is_postponed());
  assert_eq!(receiver.execution_id(), "review");

  execution.signal(json!({ "value": 42 })).unwrap();
  assert!(!execution.is_postponed());
  assert!(matches!(
    execution.signal(json!({ "value": 43 })),
    Err(ExecutionError::AlreadyCompleted { .. })
  ));

  let completion = receiver.await.unwrap();
  assert_eq!(completion, Ok(Some(json!({ "value": 42 }))));
}

#[tokio::test]
async fn test_postpone_then_error() {
  let process = review_process(ActivityDef::new("review", "userTask"));
  let mut execution = execution_for(&process, Message::default(), json!({}));

  let receiver = execution.postpone().unwrap();
  execution
    .error(ActivityFailure::new("rejected").with_code("E_REJECT"))
    .unwrap();

  let completion = receiver.await.unwrap();
  assert_eq!(
    completion,
    Err(ActivityFailure {
      message: "rejected".to_string(),
      code: Some("E_REJECT".to_string()),
    })
  );
}

#[tokio::test]
async fn test_complete_without_value() {
  let process = review_process(ActivityDef::new("review", "userTask"));
  let mut execution = execution_for(&process, Message::default(), json!({}));

  let receiver = execution.postpone().unwrap();
  execution.complete(Ok(None)).unwrap();
  assert_eq!(receiver.await.unwrap(), Ok(None));
}

#[tokio::test]
async fn test_repostpone_abandons_previous_receiver() {
  let process = review_process(ActivityDef::new("review", "userTask"));
  let mut execution = execution_for(&process, Message::default(), json!({}));

  let stale = execution.postpone().unwrap();
  let current = execution.postpone().unwrap();
  execution.signal(json!(1)).unwrap();

  assert!(matches!(stale.await, Err(ExecutionError::Abandoned { .. })));
  assert_eq!(current.await.unwrap(), Ok(Some(json!(1))));
}

#[tokio::test]
async fn test_dropped_execution_abandons_receiver() {
  let process = review_process(ActivityDef::new("review", "userTask"));
  let mut execution = execution_for(&process, Message::default(), json!({}));

  let receiver = execution.postpone().unwrap();
  drop(execution);
  assert!(matches!(receiver.await, Err(ExecutionError::Abandoned { .. })));
}

#[test]
fn test_postpone_binds_form() {
  let mut limit = FormFieldDef::new("limit");
  limit.field_type = "long".to_string();
  limit.default_value = Some("{{ variables.limit }}".to_string());

  let review = ActivityDef::new("review", "userTask").with_form(FormDef {
    key: Some("approval".to_string()),
    fields: vec![limit],
  });
  let process = review_process(review);
  let mut execution = execution_for(&process, Message::default(), json!({ "limit": 250 }));

  assert!(execution.form().is_none());
  let _receiver = execution.postpone().unwrap();

  let form = execution.form().unwrap();
  assert_eq!(form.key(), Some("approval"));
  assert_eq!(form.field("limit").unwrap().default_value, Some(json!(250)));

  assert!(execution.form_mut().unwrap().set_value("limit", json!(300)));
  let state = execution.state(None);
  assert_eq!(state.get("form").unwrap()["fields"][0]["value"], json!(300));
}

#[test]
fn test_resumed_form_keeps_entered_values() {
  let mut approved = FormFieldDef::new("approved");
  approved.field_type = "boolean".to_string();
  approved.default_value = Some("false".to_string());
  let note = FormFieldDef::new("note");

  let review = ActivityDef::new("review", "userTask").with_form(FormDef {
    key: None,
    fields: vec![approved, note],
  });
  let process = review_process(review);

  let mut first = execution_for(&process, Message::default(), json!({}));
  let _receiver = first.postpone().unwrap();
  first.form_mut().unwrap().set_value("note", json!("call back"));
  let persisted = serde_json::to_value(first.state(None)).unwrap();

  let mut resumed = execution_for(&process, Message::default(), json!({}));
  resumed
    .apply_state(&ExecutionState::try_from(persisted).unwrap())
    .unwrap();
  let _receiver = resumed.postpone().unwrap();

  let form = resumed.form().unwrap();
  assert_eq!(form.values()["note"], json!("call back"));
  assert_eq!(form.values()["approved"], json!(false));
}

// -----------------------------------------------------------------------------
// Lifecycle hooks
// -----------------------------------------------------------------------------

#[test]
fn test_cancel_and_discard_delegate_to_activity() {
  let process = review_process(ActivityDef::new("review", "task"));
  let activity = Arc::new(Tracked::new(process.activity("review").unwrap(), json!({})));
  let execution = ActivityExecution::new(
    activity.clone(),
    Message::default(),
    Environment::new(),
    Arc::new(ExpressionResolver::new()),
  )
  .triggered_by(process.flow("toReview").unwrap().clone())
  .with_root_flow("loopStart");

  execution.cancel();
  execution.discard();

  assert_eq!(
    *activity.calls.lock().unwrap(),
    vec!["cancel".to_string(), "discard:toReview:loopStart".to_string()]
  );
}
