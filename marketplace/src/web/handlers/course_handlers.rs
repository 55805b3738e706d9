// academy/marketplace/src/web/handlers/course_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::instrument;

use super::PageQuery;
use crate::errors::AppError;
use crate::models::{CourseDraft, CourseSort, Role};
use crate::state::AppState;
use crate::web::auth::AuthenticatedUser;

#[instrument(name = "handler::list_courses", skip(app_state))]
pub async fn list_courses_handler(
  app_state: web::Data<AppState>,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
  let page = app_state
    .catalog
    .list_courses(query.page()?, query.sort(CourseSort::Newest)?)
    .await?;
  Ok(HttpResponse::Ok().json(page))
}

#[instrument(name = "handler::get_course", skip(app_state))]
pub async fn get_course_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let course = app_state.catalog.get_course(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(course))
}

#[instrument(name = "handler::search_courses", skip(app_state))]
pub async fn search_courses_handler(
  app_state: web::Data<AppState>,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
  let term = query.search_term.clone().unwrap_or_default();
  let page = app_state
    .catalog
    .search_courses(&term, query.page()?, query.sort(CourseSort::Newest)?)
    .await?;
  Ok(HttpResponse::Ok().json(page))
}

#[instrument(name = "handler::instructor_courses", skip(app_state, caller), fields(user_id = caller.user_id))]
pub async fn instructor_courses_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedUser,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
  let page = app_state.catalog.instructor_courses(caller.user_id, query.page()?).await?;
  Ok(HttpResponse::Ok().json(page))
}

#[instrument(name = "handler::create_course", skip(app_state, caller, payload), fields(user_id = caller.user_id))]
pub async fn create_course_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedUser,
  payload: web::Json<CourseDraft>,
) -> Result<HttpResponse, AppError> {
  caller.require_role(Role::Instructor)?;
  let course = app_state
    .catalog
    .create_course(caller.user_id, payload.into_inner())
    .await?;
  Ok(HttpResponse::Created().json(course))
}

#[instrument(name = "handler::update_course", skip(app_state, caller, payload), fields(user_id = caller.user_id))]
pub async fn update_course_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedUser,
  path: web::Path<i64>,
  payload: web::Json<CourseDraft>,
) -> Result<HttpResponse, AppError> {
  caller.require_role(Role::Instructor)?;
  app_state
    .catalog
    .update_course(caller.user_id, path.into_inner(), payload.into_inner())
    .await?;
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::delete_course", skip(app_state, caller), fields(user_id = caller.user_id))]
pub async fn delete_course_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  caller.require_role(Role::Instructor)?;
  app_state.catalog.delete_course(caller.user_id, path.into_inner()).await?;
  Ok(HttpResponse::NoContent().finish())
}
