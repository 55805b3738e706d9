// academy/marketplace/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
  Student,
  Instructor,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::Student => "Student",
      Role::Instructor => "Instructor",
    }
  }
}

impl FromStr for Role {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "Student" => Ok(Role::Student),
      "Instructor" => Ok(Role::Instructor),
      other => Err(format!("unknown role '{}'", other)),
    }
  }
}

#[derive(Debug, Clone)]
pub struct User {
  pub id: i64,
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  pub avatar_path: String,
  pub password_hash: String,
  pub roles: Vec<Role>,
  pub created_at: DateTime<Utc>,
}

impl User {
  pub fn display_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
  }
}

#[derive(Debug, Clone)]
pub struct NewUser {
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  pub avatar_path: String,
  pub password_hash: String,
  pub roles: Vec<Role>,
}

/// A stored refresh token. Usable only while it is neither revoked nor expired.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
  pub id: i64,
  pub user_id: i64,
  pub token: String,
  pub expires_at: DateTime<Utc>,
  pub created_at: DateTime<Utc>,
  pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
  pub fn is_active(&self, now: DateTime<Utc>) -> bool {
    self.revoked_at.is_none() && self.expires_at > now
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  pub id: i64,
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  pub avatar_path: String,
}

impl From<&User> for UserProfile {
  fn from(user: &User) -> Self {
    Self {
      id: user.id,
      email: user.email.clone(),
      first_name: user.first_name.clone(),
      last_name: user.last_name.clone(),
      avatar_path: user.avatar_path.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  fn token(expires_in: Duration, revoked: bool) -> RefreshToken {
    let now = Utc::now();
    RefreshToken {
      id: 1,
      user_id: 1,
      token: "t".to_string(),
      expires_at: now + expires_in,
      created_at: now,
      revoked_at: revoked.then_some(now),
    }
  }

  #[test]
  fn refresh_token_activity() {
    let now = Utc::now();
    assert!(token(Duration::days(1), false).is_active(now));
    assert!(!token(Duration::days(1), true).is_active(now));
    assert!(!token(Duration::seconds(-1), false).is_active(now));
  }
}
