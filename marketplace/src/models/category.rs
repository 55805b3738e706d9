// academy/marketplace/src/models/category.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
  pub id: i64,
  pub name: String,
}

/// Names inserted by `SEED_DB`.
pub const DEFAULT_CATEGORIES: [&str; 10] = [
  "Software Development",
  "Data Science",
  "Machine Learning",
  "Artificial Intelligence",
  "Cyber Security",
  "Web Development",
  "Mobile Development",
  "Game Development",
  "DevOps",
  "Cloud Computing",
];
