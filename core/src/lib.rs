// academy_flow/src/lib.rs

//! Asynchronous step pipelines for the academy marketplace.
//!
//! A [`Pipeline`] is an ordered list of named steps. Each step carries `before`,
//! `on` and `after` handlers that receive a shared [`ContextData`] and decide
//! whether the run continues or stops. Steps can be optional, skipped by a
//! condition, or turned into a branch that hands the context to one of several
//! sub-pipelines. A [`FlowRegistry`] keeps one pipeline per context data type so
//! callers only need to build the context and ask the registry to run it.
//!
//! ```rust,ignore
//! let mut p = Pipeline::<SettleCtx, AppError>::new(&[
//!   ("load_order", false, None),
//!   ("record_payment", false, None),
//! ]);
//! p.on_step("load_order", |ctx: ContextData<SettleCtx>| Box::pin(async move {
//!   let order_id = ctx.read().order_id;
//!   // guard is dropped before awaiting
//!   Ok::<_, AppError>(PipelineControl::Continue)
//! }));
//! registry.register_pipeline(p);
//! registry.run(ContextData::new(SettleCtx { .. })).await?;
//! ```

pub mod branch;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::branch::BranchBuilder;
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::handler::{Handler, HandlerFuture};
pub use crate::core::step::{SkipCondition, StepDef};
pub use crate::error::{FlowError, FlowResult};
pub use crate::pipeline::{Phase, Pipeline};
pub use crate::registry::FlowRegistry;
