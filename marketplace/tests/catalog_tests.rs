// tests/catalog_tests.rs
mod common;

use academy_market::cache::{course_key, CacheStore};
use academy_market::errors::AppError;
use academy_market::models::{CourseSort, PageRequest, Role};
use academy_market::seed::{seed_categories, seed_database, SeedReport, SEED_INSTRUCTOR_EMAIL, SEED_INSTRUCTOR_PASSWORD};
use academy_market::services::auth_service::verify_password;
use common::*;
use rust_decimal::Decimal;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn pages_report_totals_and_empty_pages_are_not_found() {
  setup_tracing();
  let app = TestApp::new();
  let instructor = app.create_user("teacher@example.com", Role::Instructor).await;
  let category_id = app.create_category("Data Science").await;
  for i in 0..23 {
    app.create_course(&instructor, category_id, &format!("Course number {:02}", i), money(10 + i)).await;
  }

  let first = app.state.catalog.list_courses(PageRequest::new(1, 10).unwrap(), CourseSort::Newest).await.unwrap();
  assert_eq!(first.total_record, 23);
  assert_eq!(first.total_page, 3);
  assert_eq!(first.courses.len(), 10);
  assert_eq!(first.courses[0].title, "Course number 22");

  let last = app.state.catalog.list_courses(PageRequest::new(3, 10).unwrap(), CourseSort::Newest).await.unwrap();
  assert_eq!(last.courses.len(), 3);

  let beyond = app.state.catalog.list_courses(PageRequest::new(4, 10).unwrap(), CourseSort::Newest).await;
  assert!(matches!(beyond, Err(AppError::NotFound(_))));
}

#[tokio::test]
#[serial]
async fn sorting_and_search_filters() {
  setup_tracing();
  let app = TestApp::new();
  let instructor = app.create_user("teacher@example.com", Role::Instructor).await;
  let category_id = app.create_category("Data Science").await;
  app.create_course(&instructor, category_id, "Pandas in practice", money(30)).await;
  app.create_course(&instructor, category_id, "Applied statistics", money(20)).await;
  app.create_course(&instructor, category_id, "Deep learning with pandas", money(40)).await;

  let page = PageRequest::new(1, 10).unwrap();
  let cheap_first = app.state.catalog.list_courses(page, CourseSort::PriceLowToHigh).await.unwrap();
  let prices: Vec<_> = cheap_first.courses.iter().map(|c| c.price).collect();
  assert_eq!(prices, vec![money(20), money(30), money(40)]);

  let found = app.state.catalog.search_courses("PANDAS", page, CourseSort::Alphabetical).await.unwrap();
  let titles: Vec<_> = found.courses.iter().map(|c| c.title.as_str()).collect();
  assert_eq!(titles, vec!["Deep learning with pandas", "Pandas in practice"]);

  assert!(matches!(
    app.state.catalog.search_courses("   ", page, CourseSort::Newest).await,
    Err(AppError::Validation(_))
  ));
  assert!(matches!(
    app.state.catalog.search_courses("kotlin", page, CourseSort::Newest).await,
    Err(AppError::NotFound(_))
  ));
}

#[tokio::test]
#[serial]
async fn created_course_reads_back_with_names() {
  setup_tracing();
  let app = TestApp::new();
  let instructor = app.create_user("teacher@example.com", Role::Instructor).await;
  let category_id = app.create_category("Machine Learning").await;

  let created = app.create_course(&instructor, category_id, "Gradient descent", money(12)).await;
  let fetched = app.state.catalog.get_course(created.id).await.unwrap();

  assert_eq!(fetched, created);
  assert_eq!(fetched.category_name, "Machine Learning");
  assert_eq!(fetched.instructor_name, "Test User");
  assert_eq!(fetched.price, money(12));
}

#[tokio::test]
#[serial]
async fn invalid_drafts_are_rejected_field_by_field() {
  setup_tracing();
  let app = TestApp::new();
  let instructor = app.create_user("teacher@example.com", Role::Instructor).await;
  let category_id = app.create_category("Machine Learning").await;

  let mut bad = draft("Short", money(0), category_id);
  bad.description = "tiny".to_string();
  match app.state.catalog.create_course(instructor.id, bad).await.unwrap_err() {
    AppError::Invalid(fields) => {
      assert!(fields.get("title").is_some());
      assert!(fields.get("description").is_some());
      assert!(fields.get("price").is_some());
    }
    other => panic!("expected field errors, got {:?}", other),
  }

  let unknown_category = draft("A perfectly fine title", money(5), category_id + 50);
  assert!(matches!(
    app.state.catalog.create_course(instructor.id, unknown_category).await,
    Err(AppError::Validation(_))
  ));
}

#[tokio::test]
#[serial]
async fn prices_must_fit_the_stored_precision() {
  setup_tracing();
  let app = TestApp::new();
  let instructor = app.create_user("teacher@example.com", Role::Instructor).await;
  let category_id = app.create_category("Machine Learning").await;

  for price in [Decimal::MAX, Decimal::new(10_000_000_000, 0), Decimal::new(10_555, 3)] {
    match app.state.catalog.create_course(instructor.id, draft("A perfectly fine title", price, category_id)).await {
      Err(AppError::Invalid(fields)) => assert!(fields.get("price").is_some(), "price {} accepted", price),
      other => panic!("expected a price error for {}, got {:?}", price, other),
    }
  }

  let top = app.create_course(&instructor, category_id, "The most expensive course", Decimal::new(999_999_999_999, 2)).await;
  assert_eq!(top.price, Decimal::new(999_999_999_999, 2));
}

#[tokio::test]
#[serial]
async fn only_the_owner_may_change_a_course() {
  setup_tracing();
  let app = TestApp::new();
  let owner = app.create_user("owner@example.com", Role::Instructor).await;
  let other = app.create_user("other@example.com", Role::Instructor).await;
  let category_id = app.create_category("Machine Learning").await;
  let course = app.create_course(&owner, category_id, "Gradient descent", money(12)).await;

  let update = draft("Gradient descent, revised", money(14), category_id);
  assert!(matches!(
    app.state.catalog.update_course(other.id, course.id, update.clone()).await,
    Err(AppError::Forbidden(_))
  ));
  assert!(matches!(
    app.state.catalog.delete_course(other.id, course.id).await,
    Err(AppError::Forbidden(_))
  ));
  assert!(matches!(
    app.state.catalog.update_course(owner.id, 9_999, update).await,
    Err(AppError::NotFound(_))
  ));

  app.state.catalog.delete_course(owner.id, course.id).await.unwrap();
  assert!(matches!(app.state.catalog.get_course(course.id).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
#[serial]
async fn writes_invalidate_cached_listings_and_entries() {
  setup_tracing();
  let app = TestApp::new();
  let instructor = app.create_user("teacher@example.com", Role::Instructor).await;
  let category_id = app.create_category("Machine Learning").await;
  let course = app.create_course(&instructor, category_id, "Gradient descent", money(12)).await;
  let page = PageRequest::new(1, 10).unwrap();

  app.state.catalog.list_courses(page, CourseSort::Newest).await.unwrap();
  app.state.catalog.get_course(course.id).await.unwrap();
  assert_eq!(app.cache.len(), 2);

  app
    .state
    .catalog
    .update_course(instructor.id, course.id, draft("Gradient descent, revised", money(14), category_id))
    .await
    .unwrap();
  assert!(app.cache.is_empty());
  assert!(app.cache.get(&course_key(course.id)).await.unwrap().is_none());

  let listed = app.state.catalog.list_courses(page, CourseSort::Newest).await.unwrap();
  assert_eq!(listed.courses[0].title, "Gradient descent, revised");
  assert_eq!(listed.courses[0].price, money(14));
}

#[tokio::test]
#[serial]
async fn categories_seed_once_and_guard_their_courses() {
  setup_tracing();
  let app = TestApp::new();
  assert!(matches!(app.state.catalog.list_categories().await, Err(AppError::NotFound(_))));

  let seeded = seed_categories(app.state.stores.catalog.as_ref()).await.unwrap();
  assert!(seeded > 0);
  assert_eq!(seed_categories(app.state.stores.catalog.as_ref()).await.unwrap(), 0);

  let categories = app.state.catalog.list_categories().await.unwrap();
  assert_eq!(categories.len(), seeded);

  let instructor = app.create_user("teacher@example.com", Role::Instructor).await;
  let used = categories[0].id;
  app.create_course(&instructor, used, "Gradient descent", money(12)).await;
  assert!(matches!(app.state.catalog.delete_category(used).await, Err(AppError::Conflict(_))));

  app.state.catalog.delete_category(categories[1].id).await.unwrap();
  assert!(matches!(
    app.state.catalog.delete_category(categories[1].id).await,
    Err(AppError::NotFound(_))
  ));
}

#[tokio::test]
#[serial]
async fn database_seed_is_idempotent_and_provides_an_instructor() {
  setup_tracing();
  let app = TestApp::new();

  let first = seed_database(&app.state.stores).await.unwrap();
  assert_eq!(first.categories, 10);
  assert_eq!(first.users, 3);
  assert_eq!(first.courses, 16);
  let again = seed_database(&app.state.stores).await.unwrap();
  assert_eq!(again, SeedReport::default());

  let instructor = app
    .state
    .stores
    .users
    .find_user_by_email(SEED_INSTRUCTOR_EMAIL)
    .await
    .unwrap()
    .expect("seeded instructor");
  assert!(instructor.roles.contains(&Role::Instructor));
  assert!(verify_password(&instructor.password_hash, SEED_INSTRUCTOR_PASSWORD).unwrap());

  let page = app
    .state
    .catalog
    .instructor_courses(instructor.id, PageRequest::new(1, 50).unwrap())
    .await
    .unwrap();
  assert_eq!(page.total_record, 16);

  let categories = app.state.catalog.list_categories().await.unwrap();
  let created = app.create_course(&instructor, categories[0].id, "Rust for course authors", money(40)).await;
  assert_eq!(created.instructor_id, instructor.id);
}
