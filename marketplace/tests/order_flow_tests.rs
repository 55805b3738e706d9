// tests/order_flow_tests.rs
mod common;

use academy_flow::{ContextData, PipelineResult};
use academy_market::errors::AppError;
use academy_market::events::{CancelOrderEvent, DomainEvent, PaymentCompletedEvent};
use academy_market::models::{CourseDraft, OrderStatus, OrderView, PaymentMethod, PaymentStatus, Role};
use academy_market::pipelines::contexts::{CreateOrderCtxData, RequestedLine};
use chrono::Utc;
use common::*;
use rust_decimal::Decimal;
use serial_test::serial;
use std::time::Duration;

fn lines(ids: &[i64]) -> Vec<RequestedLine> {
  ids.iter().map(|&course_id| RequestedLine { course_id, price: None }).collect()
}

async fn place_order(app: &TestApp, caller_id: i64, requested: Vec<RequestedLine>) -> Result<OrderView, AppError> {
  let ctx = ContextData::new(CreateOrderCtxData::new(app.state.clone(), caller_id, 0, requested));
  let result = app.state.flows.run(ctx.clone()).await?;
  assert_eq!(result, PipelineResult::Completed);
  let order = ctx.read().order.clone().expect("order stored in context");
  Ok(order)
}

fn payment(order_id: i64, transaction_id: &str, amount: Decimal, status: PaymentStatus) -> DomainEvent {
  DomainEvent::PaymentCompleted(PaymentCompletedEvent {
    order_id,
    transaction_id: transaction_id.to_string(),
    amount,
    payment_date: Utc::now(),
    status,
    method: PaymentMethod::CreditCard,
  })
}

struct Fixture {
  app: TestApp,
  student_id: i64,
  course_ids: Vec<i64>,
}

async fn fixture() -> Fixture {
  setup_tracing();
  let app = TestApp::new();
  let instructor = app.create_user("teacher@example.com", Role::Instructor).await;
  let student = app.create_user("student@example.com", Role::Student).await;
  let category_id = app.create_category("Software Development").await;
  let rust = app.create_course(&instructor, category_id, "Rust from scratch", money(10)).await;
  let sql = app.create_course(&instructor, category_id, "SQL for analysts", money(15)).await;
  Fixture {
    app,
    student_id: student.id,
    course_ids: vec![rust.id, sql.id],
  }
}

#[tokio::test]
#[serial]
async fn order_total_is_the_sum_of_catalog_prices() {
  let f = fixture().await;
  let mut requested = lines(&f.course_ids);
  // Client prices are ignored.
  requested[0].price = Some(money(1));

  let order = place_order(&f.app, f.student_id, requested).await.unwrap();

  assert_eq!(order.status, OrderStatus::Pending);
  assert_eq!(order.total_amount, Decimal::new(2500, 2));
  assert_eq!(order.courses.len(), 2);
  assert_eq!(order.courses[0].price_at_purchase, money(10));
}

#[tokio::test]
#[serial]
async fn price_snapshot_survives_catalog_change() {
  let f = fixture().await;
  let order = place_order(&f.app, f.student_id, lines(&f.course_ids)).await.unwrap();

  let instructor = f.app.state.stores.users.find_user_by_email("teacher@example.com").await.unwrap().unwrap();
  let course = f.app.state.catalog.get_course(f.course_ids[0]).await.unwrap();
  let repriced = CourseDraft {
    title: course.title.clone(),
    description: course.description.clone(),
    price: money(99),
    image_path: course.image_path.clone(),
    category_id: course.category_id,
  };
  f.app.state.catalog.update_course(instructor.id, course.id, repriced).await.unwrap();

  let stored = f.app.state.stores.orders.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.total_amount, money(25));
  let line = stored.courses.iter().find(|c| c.id == course.id).unwrap();
  assert_eq!(line.price_at_purchase, money(10));
}

#[tokio::test]
#[serial]
async fn order_announces_itself_and_arms_the_cancel_timer() {
  let f = fixture().await;
  let order = place_order(&f.app, f.student_id, lines(&f.course_ids)).await.unwrap();

  let published = f.app.published();
  assert_eq!(published.len(), 1);
  match &published[0] {
    DomainEvent::OrderCreated(created) => {
      assert_eq!(created.order_id, order.id);
      assert_eq!(created.user_id, f.student_id);
      assert_eq!(created.total_amount, money(25));
      assert_eq!(created.courses.len(), 2);
    }
    other => panic!("unexpected event {:?}", other),
  }

  let scheduled = f.app.scheduled();
  assert_eq!(scheduled.len(), 1);
  assert_eq!(scheduled[0].0, DomainEvent::CancelOrder(CancelOrderEvent { order_id: order.id }));
  assert_eq!(scheduled[0].1, Duration::from_secs(300));
}

#[tokio::test]
#[serial]
async fn missing_course_rejects_the_whole_order() {
  let f = fixture().await;
  let err = place_order(&f.app, f.student_id, lines(&[f.course_ids[0], 9_999])).await.unwrap_err();

  assert!(matches!(err, AppError::NotFound(_)), "got {:?}", err);
  assert!(f.app.state.stores.orders.orders_for_user(f.student_id).await.unwrap().is_empty());
  assert!(f.app.published().is_empty());
  assert!(f.app.scheduled().is_empty());
}

#[tokio::test]
#[serial]
async fn malformed_order_requests_are_rejected() {
  let f = fixture().await;

  let empty = place_order(&f.app, f.student_id, Vec::new()).await.unwrap_err();
  assert!(matches!(empty, AppError::Validation(_)));

  let dup = place_order(&f.app, f.student_id, lines(&[f.course_ids[0], f.course_ids[0]])).await.unwrap_err();
  assert!(matches!(dup, AppError::Validation(_)));

  let ctx = ContextData::new(CreateOrderCtxData::new(
    f.app.state.clone(),
    f.student_id,
    f.student_id + 100,
    lines(&f.course_ids),
  ));
  let other_user = f.app.state.flows.run(ctx).await.unwrap_err();
  assert!(matches!(other_user, AppError::Forbidden(_)));
}

#[tokio::test]
#[serial]
async fn order_total_beyond_the_money_range_is_rejected() {
  let f = fixture().await;
  let instructor = f.app.state.stores.users.find_user_by_email("teacher@example.com").await.unwrap().unwrap();
  let category_id = f.app.create_category("Finance").await;
  let first = f.app.create_course(&instructor, category_id, "Private banking, part one", money(6_000_000_000)).await;
  let second = f.app.create_course(&instructor, category_id, "Private banking, part two", money(6_000_000_000)).await;

  let err = place_order(&f.app, f.student_id, lines(&[first.id, second.id])).await.unwrap_err();

  assert!(matches!(err, AppError::Validation(_)), "got {:?}", err);
  assert!(f.app.state.stores.orders.orders_for_user(f.student_id).await.unwrap().is_empty());
  assert!(f.app.published().is_empty());
}

#[tokio::test]
#[serial]
async fn successful_payment_completes_and_enrolls() {
  let f = fixture().await;
  let order = place_order(&f.app, f.student_id, lines(&f.course_ids)).await.unwrap();

  f.app.deliver(payment(order.id, "tx-1", money(25), PaymentStatus::Completed)).await.unwrap();

  let stored = f.app.state.stores.orders.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Completed);
  let enrolled = f.app.state.stores.orders.enrollments_for_user(f.student_id).await.unwrap();
  assert_eq!(enrolled.len(), 2);
  let recorded = f.app.state.stores.orders.payment_for_order(order.id).await.unwrap().unwrap();
  assert_eq!(recorded.transaction_id, "tx-1");
  assert_eq!(recorded.status, PaymentStatus::Completed);
}

#[tokio::test]
#[serial]
async fn redelivered_payment_is_idempotent() {
  let f = fixture().await;
  let order = place_order(&f.app, f.student_id, lines(&f.course_ids)).await.unwrap();
  let event = payment(order.id, "tx-dup", money(25), PaymentStatus::Completed);

  f.app.deliver(event.clone()).await.unwrap();
  f.app.deliver(event).await.unwrap();

  let stored = f.app.state.stores.orders.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Completed);
  assert_eq!(f.app.state.stores.orders.enrollments_for_user(f.student_id).await.unwrap().len(), 2);

  // A second transaction for the same order is not stored either.
  f.app.deliver(payment(order.id, "tx-other", money(25), PaymentStatus::Completed)).await.unwrap();
  let recorded = f.app.state.stores.orders.payment_for_order(order.id).await.unwrap().unwrap();
  assert_eq!(recorded.transaction_id, "tx-dup");
}

#[tokio::test]
#[serial]
async fn enrollment_is_not_duplicated_across_orders() {
  let f = fixture().await;
  let first = place_order(&f.app, f.student_id, lines(&f.course_ids[..1])).await.unwrap();
  f.app.deliver(payment(first.id, "tx-a", money(10), PaymentStatus::Completed)).await.unwrap();

  let second = place_order(&f.app, f.student_id, lines(&f.course_ids)).await.unwrap();
  f.app.deliver(payment(second.id, "tx-b", money(25), PaymentStatus::Completed)).await.unwrap();

  let enrolled = f.app.state.stores.orders.enrollments_for_user(f.student_id).await.unwrap();
  let mut ids: Vec<i64> = enrolled.iter().map(|e| e.course_id).collect();
  ids.sort_unstable();
  let mut expected = f.course_ids.clone();
  expected.sort_unstable();
  assert_eq!(ids, expected);
}

#[tokio::test]
#[serial]
async fn failed_payment_marks_order_without_enrolling() {
  let f = fixture().await;
  let order = place_order(&f.app, f.student_id, lines(&f.course_ids)).await.unwrap();

  f.app.deliver(payment(order.id, "tx-declined", money(25), PaymentStatus::Failed)).await.unwrap();

  let stored = f.app.state.stores.orders.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::PaymentFailed);
  assert!(f.app.state.stores.orders.enrollments_for_user(f.student_id).await.unwrap().is_empty());
  assert!(f.app.state.stores.orders.payment_for_order(order.id).await.unwrap().is_some());
}

#[tokio::test]
#[serial]
async fn cancel_timer_cancels_a_pending_order() {
  let f = fixture().await;
  let order = place_order(&f.app, f.student_id, lines(&f.course_ids)).await.unwrap();

  f.app.deliver(DomainEvent::CancelOrder(CancelOrderEvent { order_id: order.id })).await.unwrap();

  let stored = f.app.state.stores.orders.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Cancelled);
}

#[tokio::test]
#[serial]
async fn cancel_timer_is_a_no_op_once_the_order_is_resolved() {
  let f = fixture().await;
  let order = place_order(&f.app, f.student_id, lines(&f.course_ids)).await.unwrap();
  f.app.deliver(payment(order.id, "tx-1", money(25), PaymentStatus::Completed)).await.unwrap();

  f.app.deliver(DomainEvent::CancelOrder(CancelOrderEvent { order_id: order.id })).await.unwrap();

  let stored = f.app.state.stores.orders.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Completed);
  assert_eq!(f.app.state.stores.orders.enrollments_for_user(f.student_id).await.unwrap().len(), 2);
}

#[tokio::test]
#[serial]
async fn payment_after_cancellation_is_recorded_but_not_applied() {
  let f = fixture().await;
  let order = place_order(&f.app, f.student_id, lines(&f.course_ids)).await.unwrap();
  f.app.deliver(DomainEvent::CancelOrder(CancelOrderEvent { order_id: order.id })).await.unwrap();

  f.app.deliver(payment(order.id, "tx-late", money(25), PaymentStatus::Completed)).await.unwrap();

  let stored = f.app.state.stores.orders.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Cancelled);
  assert!(f.app.state.stores.orders.enrollments_for_user(f.student_id).await.unwrap().is_empty());
  assert!(f.app.state.stores.orders.payment_for_order(order.id).await.unwrap().is_some());
}

#[tokio::test]
#[serial]
async fn concurrent_cancel_and_payment_resolve_to_one_outcome() {
  let f = fixture().await;
  for round in 0..20 {
    let order = place_order(&f.app, f.student_id, lines(&f.course_ids)).await.unwrap();
    let cancel = DomainEvent::CancelOrder(CancelOrderEvent { order_id: order.id });
    let paid = payment(order.id, &format!("tx-race-{}", round), money(25), PaymentStatus::Completed);

    let (a, b) = tokio::join!(f.app.deliver(cancel), f.app.deliver(paid));
    a.unwrap();
    b.unwrap();

    let status = f.app.state.stores.orders.get_order(order.id).await.unwrap().unwrap().status;
    assert!(
      status == OrderStatus::Completed || status == OrderStatus::Cancelled,
      "round {} ended in {:?}",
      round,
      status
    );
  }
}

#[tokio::test]
#[serial]
async fn settlement_for_unknown_order_fails_for_redelivery() {
  let f = fixture().await;
  let err = f.app.deliver(payment(424_242, "tx-ghost", money(25), PaymentStatus::Completed)).await.unwrap_err();
  assert!(matches!(err, AppError::NotFound(_)));
}
