// academy/marketplace/src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

use super::{CatalogStore, OrderStore, UserStore};
use crate::errors::{AppError, Result};
use crate::models::{
  Category, CourseDraft, CourseFilter, CourseSort, CourseView, EnrollmentView, NewOrderLine, NewPayment, NewUser,
  Order, OrderCourseView, OrderStatus, OrderView, PageRequest, Payment, RefreshToken, Role, User,
};

const COURSE_VIEW_SELECT: &str = "SELECT c.id, c.title, c.description, c.price, c.image_path, c.category_id, \
  cat.name AS category_name, c.instructor_id, (u.first_name || ' ' || u.last_name) AS instructor_name, \
  c.created_date, c.updated_date \
  FROM courses c \
  JOIN categories cat ON cat.id = c.category_id \
  JOIN users u ON u.id = c.instructor_id";

const USER_COLUMNS: &str = "id, email, first_name, last_name, avatar_path, password_hash, roles, created_at";

const TOKEN_COLUMNS: &str = "id, user_id, token, expires_at, created_at, revoked_at";

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[derive(FromRow)]
struct UserRow {
  id: i64,
  email: String,
  first_name: String,
  last_name: String,
  avatar_path: String,
  password_hash: String,
  roles: Vec<String>,
  created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
  fn from(row: UserRow) -> Self {
    let roles = row
      .roles
      .iter()
      .filter_map(|raw| match raw.parse::<Role>() {
        Ok(role) => Some(role),
        Err(e) => {
          warn!(user_id = row.id, error = %e, "Ignoring unknown stored role.");
          None
        }
      })
      .collect();
    User {
      id: row.id,
      email: row.email,
      first_name: row.first_name,
      last_name: row.last_name,
      avatar_path: row.avatar_path,
      password_hash: row.password_hash,
      roles,
      created_at: row.created_at,
    }
  }
}

#[derive(FromRow)]
struct OrderLineRow {
  order_id: i64,
  id: i64,
  title: String,
  price_at_purchase: Decimal,
  image_path: String,
}

impl From<OrderLineRow> for OrderCourseView {
  fn from(row: OrderLineRow) -> Self {
    OrderCourseView {
      id: row.id,
      title: row.title,
      price_at_purchase: row.price_at_purchase,
      image_path: row.image_path,
    }
  }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
  matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
  matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

/// Escapes `LIKE` wildcards so the term matches literally.
fn like_pattern(term: &str) -> String {
  let mut escaped = String::with_capacity(term.len() + 2);
  escaped.push('%');
  for ch in term.chars() {
    if matches!(ch, '%' | '_' | '\\') {
      escaped.push('\\');
    }
    escaped.push(ch);
  }
  escaped.push('%');
  escaped
}

fn push_course_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &CourseFilter) {
  match filter {
    CourseFilter::All => {}
    CourseFilter::TitleContains(term) => {
      qb.push(" WHERE c.title ILIKE ").push_bind(like_pattern(term));
    }
    CourseFilter::Instructor(instructor_id) => {
      qb.push(" WHERE c.instructor_id = ").push_bind(*instructor_id);
    }
    CourseFilter::Category(category_id) => {
      qb.push(" WHERE c.category_id = ").push_bind(*category_id);
    }
  }
}

fn order_clause(sort: CourseSort) -> &'static str {
  match sort {
    CourseSort::Alphabetical => " ORDER BY c.title ASC, c.id ASC",
    CourseSort::PriceLowToHigh => " ORDER BY c.price ASC, c.id ASC",
    CourseSort::PriceHighToLow => " ORDER BY c.price DESC, c.id ASC",
    CourseSort::Newest => " ORDER BY c.created_date DESC, c.id DESC",
  }
}

impl PgStore {
  async fn order_lines(&self, order_ids: &[i64]) -> Result<HashMap<i64, Vec<OrderCourseView>>> {
    let rows = sqlx::query_as::<_, OrderLineRow>(
      "SELECT oc.order_id, c.id, c.title, oc.price_at_purchase, c.image_path \
       FROM order_courses oc JOIN courses c ON c.id = oc.course_id \
       WHERE oc.order_id = ANY($1) ORDER BY oc.order_id, c.id",
    )
    .bind(order_ids)
    .fetch_all(&self.pool)
    .await?;

    let mut lines: HashMap<i64, Vec<OrderCourseView>> = HashMap::new();
    for row in rows {
      lines.entry(row.order_id).or_default().push(row.into());
    }
    Ok(lines)
  }
}

#[async_trait]
impl CatalogStore for PgStore {
  async fn list_categories(&self) -> Result<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name")
      .fetch_all(&self.pool)
      .await?;
    Ok(categories)
  }

  async fn category_exists(&self, category_id: i64) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
      .bind(category_id)
      .fetch_one(&self.pool)
      .await?;
    Ok(exists)
  }

  async fn insert_category(&self, name: &str) -> Result<Category> {
    sqlx::query_as::<_, Category>("INSERT INTO categories (name) VALUES ($1) RETURNING id, name")
      .bind(name)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| {
        if is_unique_violation(&e) {
          AppError::Conflict(format!("Category '{}' already exists.", name))
        } else {
          AppError::Sqlx(e)
        }
      })
  }

  async fn delete_category(&self, category_id: i64) -> Result<bool> {
    match sqlx::query("DELETE FROM categories WHERE id = $1")
      .bind(category_id)
      .execute(&self.pool)
      .await
    {
      Ok(done) => Ok(done.rows_affected() == 1),
      Err(e) if is_foreign_key_violation(&e) => Err(AppError::Conflict(
        "Category still has courses and cannot be deleted.".to_string(),
      )),
      Err(e) => Err(AppError::Sqlx(e)),
    }
  }

  #[instrument(name = "pg::page_courses", skip(self), err(Display))]
  async fn page_courses(
    &self,
    filter: &CourseFilter,
    sort: CourseSort,
    page: PageRequest,
  ) -> Result<(Vec<CourseView>, i64)> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM courses c");
    push_course_filter(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

    let mut select = QueryBuilder::<Postgres>::new(COURSE_VIEW_SELECT);
    push_course_filter(&mut select, filter);
    select.push(order_clause(sort));
    select.push(" LIMIT ").push_bind(page.size);
    select.push(" OFFSET ").push_bind(page.offset());
    let courses = select.build_query_as::<CourseView>().fetch_all(&self.pool).await?;

    debug!(total, returned = courses.len(), "Course page loaded.");
    Ok((courses, total))
  }

  async fn get_course(&self, course_id: i64) -> Result<Option<CourseView>> {
    let course = sqlx::query_as::<_, CourseView>(&format!("{} WHERE c.id = $1", COURSE_VIEW_SELECT))
      .bind(course_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(course)
  }

  async fn insert_course(&self, instructor_id: i64, draft: &CourseDraft, now: DateTime<Utc>) -> Result<i64> {
    sqlx::query_scalar::<_, i64>(
      "INSERT INTO courses (title, description, price, image_path, category_id, instructor_id, created_date, updated_date) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $7) RETURNING id",
    )
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.price)
    .bind(&draft.image_path)
    .bind(draft.category_id)
    .bind(instructor_id)
    .bind(now)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| {
      if is_foreign_key_violation(&e) {
        AppError::Validation("Category does not exist.".to_string())
      } else {
        AppError::Sqlx(e)
      }
    })
  }

  async fn update_course(&self, course_id: i64, draft: &CourseDraft, now: DateTime<Utc>) -> Result<bool> {
    let done = sqlx::query(
      "UPDATE courses SET title = $1, description = $2, price = $3, image_path = $4, category_id = $5, updated_date = $6 \
       WHERE id = $7",
    )
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.price)
    .bind(&draft.image_path)
    .bind(draft.category_id)
    .bind(now)
    .bind(course_id)
    .execute(&self.pool)
    .await
    .map_err(|e| {
      if is_foreign_key_violation(&e) {
        AppError::Validation("Category does not exist.".to_string())
      } else {
        AppError::Sqlx(e)
      }
    })?;
    Ok(done.rows_affected() == 1)
  }

  async fn delete_course(&self, course_id: i64) -> Result<bool> {
    match sqlx::query("DELETE FROM courses WHERE id = $1")
      .bind(course_id)
      .execute(&self.pool)
      .await
    {
      Ok(done) => Ok(done.rows_affected() == 1),
      Err(e) if is_foreign_key_violation(&e) => Err(AppError::Conflict(
        "Course has been purchased and cannot be deleted.".to_string(),
      )),
      Err(e) => Err(AppError::Sqlx(e)),
    }
  }

  async fn courses_by_ids(&self, course_ids: &[i64]) -> Result<Vec<CourseView>> {
    let courses = sqlx::query_as::<_, CourseView>(&format!("{} WHERE c.id = ANY($1) ORDER BY c.id", COURSE_VIEW_SELECT))
      .bind(course_ids)
      .fetch_all(&self.pool)
      .await?;
    Ok(courses)
  }
}

#[async_trait]
impl UserStore for PgStore {
  async fn insert_user(&self, user: NewUser, now: DateTime<Utc>) -> Result<User> {
    let roles: Vec<String> = user.roles.iter().map(|r| r.as_str().to_string()).collect();
    let row = sqlx::query_as::<_, UserRow>(&format!(
      "INSERT INTO users (email, first_name, last_name, avatar_path, password_hash, roles, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
      USER_COLUMNS
    ))
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.avatar_path)
    .bind(&user.password_hash)
    .bind(&roles)
    .bind(now)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| {
      if is_unique_violation(&e) {
        AppError::Conflict("An account with this email already exists.".to_string())
      } else {
        AppError::Sqlx(e)
      }
    })?;
    Ok(row.into())
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
      .bind(email)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(User::from))
  }

  async fn find_user(&self, user_id: i64) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(User::from))
  }

  async fn update_profile(&self, user_id: i64, first_name: &str, last_name: &str, avatar_path: &str) -> Result<bool> {
    let done = sqlx::query("UPDATE users SET first_name = $1, last_name = $2, avatar_path = $3 WHERE id = $4")
      .bind(first_name)
      .bind(last_name)
      .bind(avatar_path)
      .bind(user_id)
      .execute(&self.pool)
      .await?;
    Ok(done.rows_affected() == 1)
  }

  async fn update_password_hash(&self, user_id: i64, password_hash: &str) -> Result<bool> {
    let done = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
      .bind(password_hash)
      .bind(user_id)
      .execute(&self.pool)
      .await?;
    Ok(done.rows_affected() == 1)
  }

  async fn delete_user(&self, user_id: i64) -> Result<bool> {
    match sqlx::query("DELETE FROM users WHERE id = $1")
      .bind(user_id)
      .execute(&self.pool)
      .await
    {
      Ok(done) => Ok(done.rows_affected() == 1),
      Err(e) if is_foreign_key_violation(&e) => Err(AppError::Conflict(
        "Instructors with published courses cannot be deleted.".to_string(),
      )),
      Err(e) => Err(AppError::Sqlx(e)),
    }
  }

  async fn insert_refresh_token(
    &self,
    user_id: i64,
    token: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
  ) -> Result<RefreshToken> {
    let stored = sqlx::query_as::<_, RefreshToken>(&format!(
      "INSERT INTO refresh_tokens (user_id, token, expires_at, created_at) VALUES ($1, $2, $3, $4) RETURNING {}",
      TOKEN_COLUMNS
    ))
    .bind(user_id)
    .bind(token)
    .bind(expires_at)
    .bind(now)
    .fetch_one(&self.pool)
    .await?;
    Ok(stored)
  }

  async fn find_active_refresh_token(
    &self,
    user_id: i64,
    token: &str,
    now: DateTime<Utc>,
  ) -> Result<Option<RefreshToken>> {
    let stored = sqlx::query_as::<_, RefreshToken>(&format!(
      "SELECT {} FROM refresh_tokens WHERE user_id = $1 AND token = $2 AND revoked_at IS NULL AND expires_at > $3",
      TOKEN_COLUMNS
    ))
    .bind(user_id)
    .bind(token)
    .bind(now)
    .fetch_optional(&self.pool)
    .await?;
    Ok(stored)
  }

  #[instrument(name = "pg::rotate_refresh_token", skip(self, new_token), err(Display))]
  async fn rotate_refresh_token(
    &self,
    old_token_id: i64,
    user_id: i64,
    new_token: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
  ) -> Result<bool> {
    let mut tx = self.pool.begin().await?;
    let revoked = sqlx::query(
      "UPDATE refresh_tokens SET revoked_at = $1 WHERE id = $2 AND user_id = $3 AND revoked_at IS NULL",
    )
    .bind(now)
    .bind(old_token_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;
    if revoked.rows_affected() != 1 {
      tx.rollback().await?;
      return Ok(false);
    }

    sqlx::query("INSERT INTO refresh_tokens (user_id, token, expires_at, created_at) VALUES ($1, $2, $3, $4)")
      .bind(user_id)
      .bind(new_token)
      .bind(expires_at)
      .bind(now)
      .execute(&mut *tx)
      .await?;
    tx.commit().await?;
    Ok(true)
  }

  async fn active_refresh_token_count(&self, user_id: i64, now: DateTime<Utc>) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
      "SELECT COUNT(*) FROM refresh_tokens WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > $2",
    )
    .bind(user_id)
    .bind(now)
    .fetch_one(&self.pool)
    .await?;
    Ok(count)
  }
}

#[async_trait]
impl OrderStore for PgStore {
  #[instrument(name = "pg::create_order", skip(self, lines), fields(lines = lines.len()), err(Display))]
  async fn create_order(
    &self,
    user_id: i64,
    lines: &[NewOrderLine],
    total_amount: Decimal,
    now: DateTime<Utc>,
  ) -> Result<OrderView> {
    let mut tx = self.pool.begin().await?;
    let order = sqlx::query_as::<_, Order>(
      "INSERT INTO orders (user_id, order_date, total_amount, status) VALUES ($1, $2, $3, $4) \
       RETURNING id, user_id, order_date, total_amount, status",
    )
    .bind(user_id)
    .bind(now)
    .bind(total_amount)
    .bind(OrderStatus::Pending)
    .fetch_one(&mut *tx)
    .await?;

    let mut insert_lines =
      QueryBuilder::<Postgres>::new("INSERT INTO order_courses (order_id, course_id, price_at_purchase, purchase_date) ");
    insert_lines.push_values(lines, |mut row, line| {
      row
        .push_bind(order.id)
        .push_bind(line.course_id)
        .push_bind(line.price_at_purchase)
        .push_bind(now);
    });
    insert_lines.build().execute(&mut *tx).await.map_err(|e| {
      if is_foreign_key_violation(&e) {
        AppError::NotFound("One or more courses do not exist.".to_string())
      } else {
        AppError::Sqlx(e)
      }
    })?;

    let courses = sqlx::query_as::<_, OrderCourseView>(
      "SELECT c.id, c.title, oc.price_at_purchase, c.image_path \
       FROM order_courses oc JOIN courses c ON c.id = oc.course_id WHERE oc.order_id = $1 ORDER BY c.id",
    )
    .bind(order.id)
    .fetch_all(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(OrderView::from_parts(order, courses))
  }

  async fn get_order(&self, order_id: i64) -> Result<Option<OrderView>> {
    let Some(order) = sqlx::query_as::<_, Order>(
      "SELECT id, user_id, order_date, total_amount, status FROM orders WHERE id = $1",
    )
    .bind(order_id)
    .fetch_optional(&self.pool)
    .await?
    else {
      return Ok(None);
    };
    let mut lines = self.order_lines(&[order.id]).await?;
    let courses = lines.remove(&order.id).unwrap_or_default();
    Ok(Some(OrderView::from_parts(order, courses)))
  }

  async fn orders_for_user(&self, user_id: i64) -> Result<Vec<OrderView>> {
    let orders = sqlx::query_as::<_, Order>(
      "SELECT id, user_id, order_date, total_amount, status FROM orders WHERE user_id = $1 \
       ORDER BY order_date DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;
    if orders.is_empty() {
      return Ok(Vec::new());
    }

    let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let mut lines = self.order_lines(&ids).await?;
    Ok(
      orders
        .into_iter()
        .map(|order| {
          let courses = lines.remove(&order.id).unwrap_or_default();
          OrderView::from_parts(order, courses)
        })
        .collect(),
    )
  }

  async fn transition_status(&self, order_id: i64, from: OrderStatus, to: OrderStatus) -> Result<bool> {
    let done = sqlx::query("UPDATE orders SET status = $1 WHERE id = $2 AND status = $3")
      .bind(to)
      .bind(order_id)
      .bind(from)
      .execute(&self.pool)
      .await?;
    Ok(done.rows_affected() == 1)
  }

  async fn set_status(&self, order_id: i64, status: OrderStatus) -> Result<bool> {
    let done = sqlx::query("UPDATE orders SET status = $1 WHERE id = $2")
      .bind(status)
      .bind(order_id)
      .execute(&self.pool)
      .await?;
    Ok(done.rows_affected() == 1)
  }

  async fn insert_payment(&self, payment: &NewPayment) -> Result<bool> {
    let done = sqlx::query(
      "INSERT INTO payments (order_id, amount, transaction_id, method, status, payment_date) \
       VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT DO NOTHING",
    )
    .bind(payment.order_id)
    .bind(payment.amount)
    .bind(&payment.transaction_id)
    .bind(payment.method)
    .bind(payment.status)
    .bind(payment.payment_date)
    .execute(&self.pool)
    .await?;
    Ok(done.rows_affected() == 1)
  }

  async fn payment_for_order(&self, order_id: i64) -> Result<Option<Payment>> {
    let payment = sqlx::query_as::<_, Payment>(
      "SELECT id, order_id, amount, transaction_id, method, status, payment_date FROM payments WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(payment)
  }

  async fn enroll(&self, user_id: i64, course_ids: &[i64], now: DateTime<Utc>) -> Result<u64> {
    let done = sqlx::query(
      "INSERT INTO user_courses (user_id, course_id, enrollment_date) \
       SELECT $1, course_id, $3 FROM UNNEST($2::BIGINT[]) AS t(course_id) \
       ON CONFLICT (user_id, course_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(course_ids)
    .bind(now)
    .execute(&self.pool)
    .await?;
    Ok(done.rows_affected())
  }

  async fn enrollments_for_user(&self, user_id: i64) -> Result<Vec<EnrollmentView>> {
    let enrollments = sqlx::query_as::<_, EnrollmentView>(
      "SELECT c.id AS course_id, c.title, c.description, c.image_path, \
       (u.first_name || ' ' || u.last_name) AS instructor_name, uc.enrollment_date \
       FROM user_courses uc \
       JOIN courses c ON c.id = uc.course_id \
       JOIN users u ON u.id = c.instructor_id \
       WHERE uc.user_id = $1 ORDER BY uc.enrollment_date DESC, c.id",
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(enrollments)
  }
}
