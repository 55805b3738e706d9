// tests/error_handling_tests.rs
mod common;

use academy_flow::{ContextData, FlowError, Pipeline, PipelineControl};
use common::*;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn required_step_without_handlers_fails() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<TestContext, TestError>::new(&[("first", false, None), ("step_with_no_handler", false, None)]);
  pipeline.on_step("first", create_simple_handler("first", "F"));

  let ctx = ContextData::new(TestContext::default());
  match pipeline.run(ctx.clone()).await {
    Err(TestError::Flow(s)) => {
      assert!(s.contains("HandlerMissing"));
      assert!(s.contains("step_with_no_handler"));
    }
    other => panic!("expected HandlerMissing, got {:?}", other),
  }
  // Steps before the faulty one still ran.
  assert_eq!(ctx.read().steps_executed, vec!["first"]);
}

#[tokio::test]
#[serial]
async fn handler_on_undeclared_step_is_reported_at_run() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("declared", false, None)]);
  pipeline.on_step("declared", create_simple_handler("declared", "D"));
  pipeline.on_step("typo_step", create_simple_handler("typo_step", "T"));

  let ctx = ContextData::new(TestContext::default());
  match pipeline.run(ctx.clone()).await {
    Err(TestError::Flow(s)) => {
      assert!(s.contains("StepNotFound"));
      assert!(s.contains("typo_step"));
    }
    other => panic!("expected StepNotFound, got {:?}", other),
  }
  // Nothing runs when the pipeline is misconfigured.
  assert!(ctx.read().steps_executed.is_empty());
}

#[tokio::test]
#[serial]
async fn pipeline_can_use_flow_error_directly() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, FlowError>::new(&[("task", false, None)]);
  pipeline.on_step("task", |_ctx: ContextData<TestContext>| {
    Box::pin(async move {
      Err::<PipelineControl, _>(FlowError::from(anyhow::anyhow!("store unavailable")))
    })
  });

  match pipeline.run(ContextData::new(TestContext::default())).await {
    Err(FlowError::Handler { source }) => assert_eq!(source.to_string(), "store unavailable"),
    other => panic!("expected FlowError::Handler, got {:?}", other),
  }
}

#[test]
fn anyhow_wrapped_flow_error_is_recovered() {
  let wrapped = anyhow::Error::new(FlowError::NoBranchMatched {
    step_name: "settle".to_string(),
  });
  match FlowError::from(wrapped) {
    FlowError::NoBranchMatched { step_name } => assert_eq!(step_name, "settle"),
    other => panic!("expected NoBranchMatched, got {:?}", other),
  }
}
