// academy_flow/src/pipeline/execution.rs

//! `Pipeline::run()`.

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::core::handler::Handler;
use crate::error::FlowError;
use crate::pipeline::definition::{Phase, Pipeline};
use tracing::{event, span, Instrument, Level};

/// What a phase ended with.
enum PhaseOutcome {
  Continue,
  Stopped,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Executes the steps in declaration order against `ctx_data`.
  ///
  /// A setup problem (handler registered on an undeclared step, required step
  /// without handlers) is reported through `Err::from(FlowError)` before or at
  /// the step it concerns. A handler error aborts the run and is returned as-is.
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    let run_span = span!(
      Level::INFO,
      "pipeline_run",
      pipeline = %self.label,
      num_steps = self.steps.len()
    );
    self.run_steps(ctx_data).instrument(run_span).await
  }

  async fn run_steps(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    if let Some(step_name) = self.unknown_steps.first() {
      event!(Level::ERROR, %step_name, "Pipeline has handlers for an undeclared step.");
      return Err(Err::from(FlowError::StepNotFound {
        step_name: step_name.clone(),
      }));
    }

    event!(Level::DEBUG, "Pipeline run starting.");

    for (step_index, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if step_def.should_skip(&ctx_data) {
        event!(Level::DEBUG, %step_name, "Step skipped by its condition.");
        continue;
      }

      let handlers = match self.handlers.get(step_name) {
        Some(h) if !h.is_empty() => h,
        _ if step_def.optional => {
          event!(Level::DEBUG, %step_name, "Optional step has no handlers.");
          continue;
        }
        _ => {
          event!(Level::ERROR, %step_name, "Required step has no handlers.");
          return Err(Err::from(FlowError::HandlerMissing {
            step_name: step_name.to_string(),
          }));
        }
      };

      let step_span = span!(Level::DEBUG, "pipeline_step", %step_name, step_index);
      for phase in Phase::ALL {
        let outcome = run_phase(handlers.phase(phase), phase, &ctx_data)
          .instrument(step_span.clone())
          .await?;
        if let PhaseOutcome::Stopped = outcome {
          event!(Level::INFO, %step_name, phase = phase.as_str(), "Pipeline stopped by a handler.");
          return Ok(PipelineResult::Stopped);
        }
      }
    }

    event!(Level::DEBUG, "Pipeline run completed.");
    Ok(PipelineResult::Completed)
  }
}

async fn run_phase<TData, Err>(
  handlers: &[Handler<TData, Err>],
  phase: Phase,
  ctx_data: &ContextData<TData>,
) -> Result<PhaseOutcome, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + Send + Sync + 'static,
{
  for handler in handlers {
    match handler(ctx_data.clone()).await {
      Ok(PipelineControl::Continue) => {}
      Ok(PipelineControl::Stop) => return Ok(PhaseOutcome::Stopped),
      Err(e) => {
        event!(Level::WARN, phase = phase.as_str(), error = %e, "Handler failed.");
        return Err(e);
      }
    }
  }
  Ok(PhaseOutcome::Continue)
}
