// academy/marketplace/src/web/routes.rs

use actix_web::{error::InternalError, web, HttpRequest, HttpResponse, ResponseError};

use crate::errors::AppError;
use crate::web::handlers::{
  auth_handlers, category_handlers, course_handlers, order_handlers, payment_handlers, user_handlers,
};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Malformed bodies, paths and query strings get the same error body as every other 400.
fn as_validation_error<E>(err: E, _req: &HttpRequest) -> actix_web::Error
where
  E: std::fmt::Debug + std::fmt::Display + 'static,
{
  let response = AppError::Validation(err.to_string()).error_response();
  InternalError::from_response(err, response).into()
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(web::JsonConfig::default().error_handler(as_validation_error))
    .app_data(web::QueryConfig::default().error_handler(as_validation_error))
    .app_data(web::PathConfig::default().error_handler(as_validation_error));

  cfg.service(
    web::scope("/api")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/auth")
          .route("/register", web::post().to(auth_handlers::register_handler))
          .route("/login", web::post().to(auth_handlers::login_handler))
          .route("/refresh-token", web::post().to(auth_handlers::refresh_token_handler))
          .route("/update-password", web::post().to(auth_handlers::update_password_handler)),
      )
      // Literal segments are registered before `/{id}`.
      .service(
        web::scope("/course")
          .route("", web::get().to(course_handlers::list_courses_handler))
          .route("", web::post().to(course_handlers::create_course_handler))
          .route("/search", web::get().to(course_handlers::search_courses_handler))
          .route("/instructor", web::get().to(course_handlers::instructor_courses_handler))
          .route("/{id}", web::get().to(course_handlers::get_course_handler))
          .route("/{id}", web::put().to(course_handlers::update_course_handler))
          .route("/{id}", web::delete().to(course_handlers::delete_course_handler)),
      )
      .service(
        web::scope("/category")
          .route("", web::get().to(category_handlers::list_categories_handler))
          .route("/{id}", web::get().to(category_handlers::category_courses_handler))
          .route("/{id}", web::delete().to(category_handlers::delete_category_handler)),
      )
      .service(
        web::scope("/order")
          .route("", web::post().to(order_handlers::create_order_handler))
          .route("/user", web::get().to(order_handlers::user_orders_handler))
          .route("/{id}", web::get().to(order_handlers::get_order_handler))
          .route("/{id}/status", web::put().to(order_handlers::update_order_status_handler)),
      )
      .service(web::scope("/payment").route("/complete", web::post().to(payment_handlers::payment_complete_handler)))
      .service(
        web::scope("/user")
          .route("", web::get().to(user_handlers::get_profile_handler))
          .route("", web::put().to(user_handlers::update_profile_handler))
          .route("", web::delete().to(user_handlers::delete_account_handler))
          .route("/courses", web::get().to(user_handlers::my_courses_handler)),
      ),
  );
}
