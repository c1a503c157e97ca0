//! Completion of postponed steps.
//!
//! `postpone` hands out a [`CompletionReceiver`] and keeps the matching sender
//! on the execution. Exactly one of `error`, `signal` or `complete` can fire it.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{ActivityFailure, ExecutionError};
use crate::form::Form;

/// Outcome of a postponed step: a value (possibly none) or a failure.
pub type Completion = Result<Option<Value>, ActivityFailure>;

/// Resolves once the postponed step is completed.
///
/// Yields [`ExecutionError::Abandoned`] if the execution is dropped, or
/// postponed again, before completing.
#[derive(Debug)]
pub struct CompletionReceiver {
  execution_id: String,
  rx: oneshot::Receiver<Completion>,
}

impl CompletionReceiver {
  pub fn execution_id(&self) -> &str {
    &self.execution_id
  }
}

impl Future for CompletionReceiver {
  type Output = Result<Completion, ExecutionError>;

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let execution_id = self.execution_id.clone();
    Pin::new(&mut self.rx)
      .poll(cx)
      .map(|r| r.map_err(|_| ExecutionError::Abandoned { execution_id }))
  }
}

/// Handles installed by `postpone`.
#[derive(Debug)]
pub(crate) struct Handles {
  pub(crate) form: Option<Form>,
  sender: Option<oneshot::Sender<Completion>>,
}

impl Handles {
  /// The completion has not fired yet.
  pub(crate) fn is_pending(&self) -> bool {
    self.sender.is_some()
  }

  /// Returns `true` when the completion was delivered, `false` when the
  /// receiver was already dropped.
  pub(crate) fn fire(
    &mut self,
    execution_id: &str,
    completion: Completion,
  ) -> Result<bool, ExecutionError> {
    let sender = self
      .sender
      .take()
      .ok_or_else(|| ExecutionError::AlreadyCompleted {
        execution_id: execution_id.to_string(),
      })?;
    Ok(sender.send(completion).is_ok())
  }
}

/// Whether an execution is waiting for external completion.
#[derive(Debug, Default)]
pub(crate) enum Postponement {
  #[default]
  NotPostponed,
  Postponed(Handles),
}

impl Postponement {
  /// Install fresh handles and return the receiving side.
  pub(crate) fn install(
    execution_id: &str,
    form: Option<Form>,
  ) -> (Postponement, CompletionReceiver) {
    let (tx, rx) = oneshot::channel();
    let handles = Handles {
      form,
      sender: Some(tx),
    };
    let receiver = CompletionReceiver {
      execution_id: execution_id.to_string(),
      rx,
    };
    (Postponement::Postponed(handles), receiver)
  }
}
