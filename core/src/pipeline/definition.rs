// academy_flow/src/pipeline/definition.rs

//! The `Pipeline<TData, Err>` struct and its construction.

use crate::core::handler::Handler;
use crate::core::step::{SkipCondition, StepDef};
use crate::error::FlowError;
use std::collections::HashMap;

/// The three handler slots of every step, run in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
  Before,
  On,
  After,
}

impl Phase {
  pub const ALL: [Phase; 3] = [Phase::Before, Phase::On, Phase::After];

  pub fn as_str(&self) -> &'static str {
    match self {
      Phase::Before => "before",
      Phase::On => "on",
      Phase::After => "after",
    }
  }
}

pub(crate) struct StepHandlers<TData, Err>
where
  TData: 'static + Send + Sync,
{
  before: Vec<Handler<TData, Err>>,
  on: Vec<Handler<TData, Err>>,
  after: Vec<Handler<TData, Err>>,
}

impl<TData, Err> Default for StepHandlers<TData, Err>
where
  TData: 'static + Send + Sync,
{
  fn default() -> Self {
    Self {
      before: Vec::new(),
      on: Vec::new(),
      after: Vec::new(),
    }
  }
}

impl<TData, Err> StepHandlers<TData, Err>
where
  TData: 'static + Send + Sync,
{
  pub(crate) fn phase(&self, phase: Phase) -> &[Handler<TData, Err>] {
    match phase {
      Phase::Before => &self.before,
      Phase::On => &self.on,
      Phase::After => &self.after,
    }
  }

  pub(crate) fn phase_mut(&mut self, phase: Phase) -> &mut Vec<Handler<TData, Err>> {
    match phase {
      Phase::Before => &mut self.before,
      Phase::On => &mut self.on,
      Phase::After => &mut self.after,
    }
  }

  pub(crate) fn is_empty(&self) -> bool {
    self.before.is_empty() && self.on.is_empty() && self.after.is_empty()
  }
}

/// An ordered list of named steps over the context data `TData`.
///
/// `Err` is what the handlers return. It must absorb engine failures through
/// `From<FlowError>` so that a run reports a single error type.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) label: String,
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) handlers: HashMap<String, StepHandlers<TData, Err>>,
  /// Names passed to registration methods that match no declared step.
  pub(crate) unknown_steps: Vec<String>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Declares the steps as `(name, optional, skip_if)` tuples, in execution order.
  pub fn new(step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, optional, skip_if)| StepDef {
        name: (*name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      label: std::any::type_name::<TData>().to_string(),
      steps,
      handlers: HashMap::new(),
      unknown_steps: Vec::new(),
    }
  }

  /// Name used in logs and spans instead of the context type name.
  pub fn labelled(mut self, label: &str) -> Self {
    self.label = label.to_string();
    self
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub(crate) fn has_step(&self, step_name: &str) -> bool {
    self.steps.iter().any(|s| s.name == step_name)
  }

  pub(crate) fn set_optional(&mut self, step_name: &str, optional: bool) {
    if let Some(step) = self.steps.iter_mut().find(|s| s.name == step_name) {
      step.optional = optional;
    }
  }
}
