// tests/registry_tests.rs
mod common;

use academy_flow::{ContextData, FlowError, FlowRegistry, Pipeline, PipelineControl, PipelineResult};
use common::*;
use serial_test::serial;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct AlphaContext {
  val: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct BetaContext {
  num: i32,
}

#[tokio::test]
#[serial]
async fn dispatches_by_context_type() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  let mut p_alpha = Pipeline::<AlphaContext, TestError>::new(&[("alpha_task", false, None)]);
  p_alpha.on_step("alpha_task", |ctx: ContextData<AlphaContext>| {
    Box::pin(async move {
      ctx.write().val = "alpha_processed".to_string();
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  });
  registry.register_pipeline(p_alpha);

  // Pipelines may use a different handler error, as long as the registry's converts from it.
  let mut p_beta = Pipeline::<BetaContext, FlowError>::new(&[("beta_task", false, None)]);
  p_beta.on_step("beta_task", |ctx: ContextData<BetaContext>| {
    Box::pin(async move {
      ctx.write().num = 100;
      Ok::<_, FlowError>(PipelineControl::Continue)
    })
  });
  registry.register_pipeline(p_beta);

  assert!(registry.is_registered::<AlphaContext>());
  assert!(registry.is_registered::<BetaContext>());

  let ctx_alpha = ContextData::new(AlphaContext::default());
  assert_eq!(registry.run(ctx_alpha.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx_alpha.read().val, "alpha_processed");

  let ctx_beta = ContextData::new(BetaContext::default());
  assert_eq!(registry.run(ctx_beta.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx_beta.read().num, 100);
}

#[tokio::test]
#[serial]
async fn unregistered_context_fails_with_not_registered() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  #[derive(Debug, Default)]
  struct UnregisteredContext;

  match registry.run(ContextData::new(UnregisteredContext)).await {
    Err(TestError::Flow(s)) => {
      assert!(s.contains("NotRegistered"));
      assert!(s.contains("UnregisteredContext"));
    }
    other => panic!("expected NotRegistered, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn pipeline_error_is_returned_unchanged() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  let mut p_alpha = Pipeline::<AlphaContext, TestError>::new(&[("alpha_fail", false, None)]);
  p_alpha.on_step("alpha_fail", |_ctx: ContextData<AlphaContext>| {
    Box::pin(async move { Err::<PipelineControl, _>(TestError::Handler("Alpha pipeline failed".to_string())) })
  });
  registry.register_pipeline(p_alpha);

  let err = registry.run(ContextData::new(AlphaContext::default())).await.unwrap_err();
  assert_eq!(err, TestError::Handler("Alpha pipeline failed".to_string()));
}

#[tokio::test]
#[serial]
async fn later_registration_replaces_earlier_one() {
  setup_tracing();
  let registry = FlowRegistry::<FlowError>::default();

  for value in ["first", "second"] {
    let mut p = Pipeline::<AlphaContext, FlowError>::new(&[("set", false, None)]);
    p.on_step("set", move |ctx: ContextData<AlphaContext>| {
      Box::pin(async move {
        ctx.write().val = value.to_string();
        Ok::<_, FlowError>(PipelineControl::Continue)
      })
    });
    registry.register_pipeline(p);
  }

  let ctx = ContextData::new(AlphaContext::default());
  registry.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().val, "second");
}
