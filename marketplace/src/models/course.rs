// academy/marketplace/src/models/course.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

use crate::errors::AppError;

pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, FromRow)]
pub struct Course {
  pub id: i64,
  pub title: String,
  pub description: String,
  pub price: Decimal,
  pub image_path: String,
  pub category_id: i64,
  pub instructor_id: i64,
  pub created_date: DateTime<Utc>,
  pub updated_date: DateTime<Utc>,
}

/// A course joined with its category and instructor names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CourseView {
  pub id: i64,
  pub title: String,
  pub description: String,
  pub price: Decimal,
  pub image_path: String,
  pub category_id: i64,
  pub category_name: String,
  pub instructor_id: i64,
  pub instructor_name: String,
  pub created_date: DateTime<Utc>,
  pub updated_date: DateTime<Utc>,
}

/// Body of course create and update requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDraft {
  pub title: String,
  pub description: String,
  pub price: Decimal,
  #[serde(default)]
  pub image_path: String,
  pub category_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseSort {
  Alphabetical,
  PriceLowToHigh,
  PriceHighToLow,
  Newest,
}

impl CourseSort {
  pub fn as_str(&self) -> &'static str {
    match self {
      CourseSort::Alphabetical => "Alphabetical",
      CourseSort::PriceLowToHigh => "PriceLowToHigh",
      CourseSort::PriceHighToLow => "PriceHighToLow",
      CourseSort::Newest => "Newest",
    }
  }

  /// Parses an optional query value, falling back to `default` when absent or blank.
  pub fn parse_or(raw: Option<&str>, default: CourseSort) -> Result<CourseSort, AppError> {
    match raw.map(str::trim) {
      None | Some("") => Ok(default),
      Some(value) => value.parse(),
    }
  }
}

impl FromStr for CourseSort {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    [
      CourseSort::Alphabetical,
      CourseSort::PriceLowToHigh,
      CourseSort::PriceHighToLow,
      CourseSort::Newest,
    ]
    .into_iter()
    .find(|sort| sort.as_str().eq_ignore_ascii_case(s))
    .ok_or_else(|| AppError::Validation("Invalid sorting parameter".to_string()))
  }
}

/// Which courses a listing covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourseFilter {
  All,
  /// Case-insensitive substring of the title.
  TitleContains(String),
  Instructor(i64),
  Category(i64),
}

/// A validated 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  pub number: i64,
  pub size: i64,
}

impl PageRequest {
  pub fn new(number: i64, size: i64) -> Result<Self, AppError> {
    if number < 1 || size < 1 {
      return Err(AppError::Validation(
        "pageNumber and pageSize must be greater than zero".to_string(),
      ));
    }
    let size = size.min(MAX_PAGE_SIZE);
    if (number - 1).checked_mul(size).is_none() {
      return Err(AppError::Validation("pageNumber is too large".to_string()));
    }
    Ok(Self { number, size })
  }

  pub fn offset(&self) -> i64 {
    (self.number - 1) * self.size
  }

  pub fn total_pages(&self, total_records: i64) -> i64 {
    (total_records + self.size - 1) / self.size
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePage {
  pub page_size: i64,
  pub page_number: i64,
  pub total_page: i64,
  pub total_record: i64,
  pub courses: Vec<CourseView>,
}

impl CoursePage {
  pub fn new(page: PageRequest, total_record: i64, courses: Vec<CourseView>) -> Self {
    Self {
      page_size: page.size,
      page_number: page.number,
      total_page: page.total_pages(total_record),
      total_record,
      courses,
    }
  }
}
