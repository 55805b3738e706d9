// academy/marketplace/src/web/handlers/mod.rs

pub mod auth_handlers;
pub mod category_handlers;
pub mod course_handlers;
pub mod order_handlers;
pub mod payment_handlers;
pub mod user_handlers;

use academy_flow::PipelineResult;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{CourseSort, PageRequest};

/// Request-driven pipelines are expected to run to the end; a stop is a bug.
pub(crate) fn expect_completed(result: PipelineResult, flow: &str) -> Result<(), AppError> {
  match result {
    PipelineResult::Completed => Ok(()),
    PipelineResult::Stopped => {
      tracing::warn!(%flow, "Pipeline stopped before completing.");
      Err(AppError::Internal(format!("{} was halted by an internal step.", flow)))
    }
  }
}

fn default_page_number() -> i64 {
  1
}

fn default_page_size() -> i64 {
  10
}

/// Paging and sorting query parameters shared by the course listings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
  #[serde(default = "default_page_number")]
  pub page_number: i64,
  #[serde(default = "default_page_size")]
  pub page_size: i64,
  pub sort_by: Option<String>,
  pub sort_order: Option<String>,
  pub search_term: Option<String>,
}

impl PageQuery {
  pub fn page(&self) -> Result<PageRequest, AppError> {
    PageRequest::new(self.page_number, self.page_size)
  }

  /// `sortBy` or `sortOrder`, whichever is present.
  pub fn sort(&self, default: CourseSort) -> Result<CourseSort, AppError> {
    CourseSort::parse_or(self.sort_by.as_deref().or(self.sort_order.as_deref()), default)
  }
}
