// academy/marketplace/src/services/validation.rs

//! Input rules. Each check records a message against the field it concerns so
//! the response can report every violation at once.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::errors::AppError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&mut self, field: &str, message: impl Into<String>) {
    self.0.entry(field.to_string()).or_default().push(message.into());
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn get(&self, field: &str) -> Option<&[String]> {
    self.0.get(field).map(Vec::as_slice)
  }

  /// `Ok(())` when nothing was recorded, otherwise `AppError::Invalid`.
  pub fn into_result(self) -> Result<(), AppError> {
    if self.is_empty() {
      Ok(())
    } else {
      Err(AppError::Invalid(self))
    }
  }
}

impl std::fmt::Display for FieldErrors {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut first = true;
    for (field, messages) in &self.0 {
      for message in messages {
        if !first {
          f.write_str("; ")?;
        }
        write!(f, "{}: {}", field, message)?;
        first = false;
      }
    }
    Ok(())
  }
}

pub fn check_email(errors: &mut FieldErrors, field: &str, email: &str) {
  let email = email.trim();
  if email.is_empty() {
    errors.add(field, "Email is required.");
    return;
  }
  let well_formed = match email.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
    }
    None => false,
  };
  if !well_formed {
    errors.add(field, "Email is not a valid email address.");
  }
}

/// Registration and password-change rule.
pub fn check_new_password(errors: &mut FieldErrors, field: &str, password: &str) {
  let length = password.chars().count();
  if !(8..=15).contains(&length) {
    errors.add(field, "Password must be between 8 and 15 characters.");
  }
  if !password.chars().any(|c| c.is_ascii_uppercase()) {
    errors.add(field, "Password must contain at least one uppercase letter.");
  }
  if !password.chars().any(|c| c.is_ascii_lowercase()) {
    errors.add(field, "Password must contain at least one lowercase letter.");
  }
  if !password.chars().any(|c| c.is_ascii_digit()) {
    errors.add(field, "Password must contain at least one digit.");
  }
}

pub fn check_login_password(errors: &mut FieldErrors, field: &str, password: &str) {
  if password.chars().count() < 2 {
    errors.add(field, "Password must be at least 2 characters.");
  }
}

pub fn check_length(errors: &mut FieldErrors, field: &str, value: &str, min: usize, max: usize) {
  let length = value.trim().chars().count();
  if length < min || length > max {
    errors.add(field, format!("{} must be between {} and {} characters.", field, min, max));
  }
}

pub fn check_name(errors: &mut FieldErrors, field: &str, value: &str) {
  check_length(errors, field, value, 3, 20);
}

pub fn check_avatar(errors: &mut FieldErrors, field: &str, value: &str) {
  if value.chars().count() > 255 {
    errors.add(field, "AvatarPath must be at most 255 characters.");
  }
}

/// Exclusive upper bound of stored money, the range of `NUMERIC(12,2)`.
pub const MONEY_LIMIT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

/// Money is stored with two decimal places.
pub const MONEY_SCALE: u32 = 2;

/// Positive, below [`MONEY_LIMIT`] and with at most two decimal places.
pub fn check_money(errors: &mut FieldErrors, field: &str, label: &str, amount: Decimal) {
  if amount <= Decimal::ZERO {
    errors.add(field, format!("{} must be greater than zero.", label));
  } else if amount >= MONEY_LIMIT {
    errors.add(field, format!("{} must be less than {}.", label, MONEY_LIMIT));
  }
  if amount.normalize().scale() > MONEY_SCALE {
    errors.add(field, format!("{} can have at most {} decimal places.", label, MONEY_SCALE));
  }
}

pub fn check_course_fields(errors: &mut FieldErrors, title: &str, description: &str, price: Decimal) {
  check_length(errors, "title", title, 10, 100);
  check_length(errors, "description", description, 10, 150);
  check_money(errors, "price", "Price", price);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn email_shapes() {
    for ok in ["a@b.co", "first.last@school.edu"] {
      let mut errors = FieldErrors::new();
      check_email(&mut errors, "email", ok);
      assert!(errors.is_empty(), "{} should pass", ok);
    }
    for bad in ["", "plain", "@b.co", "a@b", "a@@b.co", "a b@c.io", "a@.co"] {
      let mut errors = FieldErrors::new();
      check_email(&mut errors, "email", bad);
      assert!(!errors.is_empty(), "{} should fail", bad);
    }
  }

  #[test]
  fn new_password_rules_report_each_violation() {
    let mut errors = FieldErrors::new();
    check_new_password(&mut errors, "password", "Secret123");
    assert!(errors.is_empty());

    let mut errors = FieldErrors::new();
    check_new_password(&mut errors, "password", "short");
    // Too short, no uppercase, no digit.
    assert_eq!(errors.get("password").map(<[String]>::len), Some(3));

    let mut errors = FieldErrors::new();
    check_new_password(&mut errors, "password", "Abcdefgh12345678");
    assert_eq!(errors.get("password").map(<[String]>::len), Some(1));
  }

  #[test]
  fn course_rules() {
    let mut errors = FieldErrors::new();
    check_course_fields(&mut errors, "Too short", "Long enough text", Decimal::ZERO);
    assert!(errors.get("title").is_some());
    assert!(errors.get("description").is_none());
    assert!(errors.get("price").is_some());
    assert!(matches!(errors.into_result(), Err(AppError::Invalid(_))));
  }

  #[test]
  fn money_bounds_follow_the_stored_precision() {
    assert_eq!(MONEY_LIMIT, Decimal::new(10_000_000_000, 0));

    for ok in [Decimal::new(1, 2), Decimal::new(1999, 2), Decimal::new(15000, 3), Decimal::new(999_999_999_999, 2)] {
      let mut errors = FieldErrors::new();
      check_money(&mut errors, "amount", "Amount", ok);
      assert!(errors.is_empty(), "{} should pass", ok);
    }
    for bad in [Decimal::ZERO, Decimal::new(-5, 0), MONEY_LIMIT, Decimal::MAX, Decimal::new(10555, 3)] {
      let mut errors = FieldErrors::new();
      check_money(&mut errors, "amount", "Amount", bad);
      assert!(errors.get("amount").is_some(), "{} should fail", bad);
    }
  }

  #[test]
  fn display_joins_messages() {
    let mut errors = FieldErrors::new();
    errors.add("b", "second");
    errors.add("a", "first");
    assert_eq!(errors.to_string(), "a: first; b: second");
  }
}
