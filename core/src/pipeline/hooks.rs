// academy_flow/src/pipeline/hooks.rs

//! Registration of `before`, `on` and `after` handlers.

use tracing::{event, Level};

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::core::handler::Handler;
use crate::error::FlowError;
use crate::pipeline::definition::{Phase, Pipeline};
use std::future::Future;

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs before the step's `on` handlers.
  pub fn before_step<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.add_handler(Phase::Before, step_name, handler_fn);
  }

  /// The step's main work.
  pub fn on_step<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.add_handler(Phase::On, step_name, handler_fn);
  }

  /// Runs once the step's `on` handlers all continued.
  pub fn after_step<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.add_handler(Phase::After, step_name, handler_fn);
  }

  fn add_handler<F, HandlerErr>(
    &mut self,
    phase: Phase,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    let handler: Handler<TData, Err> = Box::new(move |ctx_data| {
      let fut = handler_fn(ctx_data);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    self.push_handler(phase, step_name, handler);
  }

  pub(crate) fn push_handler(&mut self, phase: Phase, step_name: &str, handler: Handler<TData, Err>) {
    if !self.has_step(step_name) {
      event!(Level::ERROR, pipeline = %self.label, %step_name, phase = phase.as_str(), "Handler registered for an undeclared step.");
      self.unknown_steps.push(step_name.to_string());
      return;
    }
    self
      .handlers
      .entry(step_name.to_string())
      .or_default()
      .phase_mut(phase)
      .push(handler);
  }

  /// Drops every handler of `phase` for the step. Used when a branch takes over the `on` slot.
  pub(crate) fn clear_phase(&mut self, phase: Phase, step_name: &str) {
    if let Some(handlers) = self.handlers.get_mut(step_name) {
      handlers.phase_mut(phase).clear();
    }
  }
}
