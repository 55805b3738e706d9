// academy/marketplace/src/models/enrollment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One of the caller's enrolled courses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentView {
  pub course_id: i64,
  pub title: String,
  pub description: String,
  pub image_path: String,
  pub instructor_name: String,
  pub enrollment_date: DateTime<Utc>,
}
