// academy_flow/src/core/control.rs

//! Signals for controlling pipeline flow and the outcome of a pipeline run.

/// Returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  Continue,
  /// Halt the run. No further handler of this step or any later step executes.
  Stop,
}

/// Outcome of a run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  Completed,
  /// A handler returned `PipelineControl::Stop`.
  Stopped,
}

impl From<PipelineResult> for PipelineControl {
  fn from(result: PipelineResult) -> Self {
    match result {
      PipelineResult::Completed => PipelineControl::Continue,
      PipelineResult::Stopped => PipelineControl::Stop,
    }
  }
}
