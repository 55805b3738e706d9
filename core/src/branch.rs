// academy_flow/src/branch.rs

//! Branch steps: a step whose `on` slot picks one of several sub-pipelines
//! depending on the current context.
//!
//! Arms share the parent's context data type and error type, and the selected
//! sub-pipeline runs against the very same `ContextData`, so whatever it writes
//! is visible to the parent's later steps.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::core::handler::Handler;
use crate::error::FlowError;
use crate::pipeline::{Phase, Pipeline};

use std::sync::Arc;
use tracing::{event, Level};

type ArmCondition<TData> = Arc<dyn Fn(&ContextData<TData>) -> bool + Send + Sync + 'static>;

struct BranchArm<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  label: String,
  condition: ArmCondition<TData>,
  pipeline: Arc<Pipeline<TData, Err>>,
}

/// Collects the arms of a branch step. Nothing is installed until [`BranchBuilder::finalize`].
pub struct BranchBuilder<'p, TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipeline: &'p mut Pipeline<TData, Err>,
  step_name: String,
  arms: Vec<BranchArm<TData, Err>>,
  otherwise: Option<PipelineControl>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Starts configuring `step_name` as a branch step.
  pub fn branch_step(&mut self, step_name: &str) -> BranchBuilder<'_, TData, Err> {
    BranchBuilder {
      pipeline: self,
      step_name: step_name.to_string(),
      arms: Vec::new(),
      otherwise: None,
    }
  }
}

impl<'p, TData, Err> BranchBuilder<'p, TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Adds an arm. Arms are tested in the order they were added; the first match wins.
  pub fn when(
    mut self,
    label: &str,
    condition: impl Fn(&ContextData<TData>) -> bool + Send + Sync + 'static,
    pipeline: Arc<Pipeline<TData, Err>>,
  ) -> Self {
    self.arms.push(BranchArm {
      label: label.to_string(),
      condition: Arc::new(condition),
      pipeline,
    });
    self
  }

  /// Control returned when no arm matches. Without it, an unmatched branch is
  /// a `FlowError::NoBranchMatched`.
  pub fn otherwise(mut self, control: PipelineControl) -> Self {
    self.otherwise = Some(control);
    self
  }

  /// Installs the branch as the step's only `on` handler. When `optional` is
  /// set, arm failures are logged and the parent continues.
  pub fn finalize(self, optional: bool) {
    let BranchBuilder {
      pipeline,
      step_name,
      arms,
      otherwise,
    } = self;

    event!(Level::DEBUG, %step_name, arms = arms.len(), optional, "Installing branch step.");

    let arms = Arc::new(arms);
    let step_for_handler = step_name.clone();
    let handler: Handler<TData, Err> = Box::new(move |ctx_data: ContextData<TData>| {
      let arms = Arc::clone(&arms);
      let step_name = step_for_handler.clone();
      Box::pin(async move {
        let Some(arm) = arms.iter().find(|arm| (arm.condition)(&ctx_data)) else {
          return match otherwise {
            Some(control) => Ok(control),
            None if optional => Ok(PipelineControl::Continue),
            None => Err(Err::from(FlowError::NoBranchMatched { step_name })),
          };
        };

        event!(Level::DEBUG, %step_name, arm = %arm.label, "Branch arm selected.");
        match arm.pipeline.run(ctx_data).await {
          Ok(result) => Ok(result.into()),
          Err(e) if optional => {
            event!(Level::WARN, %step_name, arm = %arm.label, error = %e, "Optional branch failed; continuing.");
            Ok(PipelineControl::Continue)
          }
          Err(e) => Err(e),
        }
      })
    });

    pipeline.set_optional(&step_name, optional);
    pipeline.clear_phase(Phase::On, &step_name);
    pipeline.push_handler(Phase::On, &step_name, handler);
  }
}
