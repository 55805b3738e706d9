// academy/marketplace/src/web/handlers/category_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::instrument;

use super::PageQuery;
use crate::errors::AppError;
use crate::models::{CourseSort, Role};
use crate::state::AppState;
use crate::web::auth::AuthenticatedUser;

#[instrument(name = "handler::list_categories", skip(app_state))]
pub async fn list_categories_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(app_state.catalog.list_categories().await?))
}

#[instrument(name = "handler::category_courses", skip(app_state))]
pub async fn category_courses_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
  let page = app_state
    .catalog
    .category_courses(path.into_inner(), query.page()?, query.sort(CourseSort::Alphabetical)?)
    .await?;
  Ok(HttpResponse::Ok().json(page))
}

#[instrument(name = "handler::delete_category", skip(app_state, caller), fields(user_id = caller.user_id))]
pub async fn delete_category_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  caller.require_role(Role::Instructor)?;
  app_state.catalog.delete_category(path.into_inner()).await?;
  Ok(HttpResponse::NoContent().finish())
}
