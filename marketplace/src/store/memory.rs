// academy/marketplace/src/store/memory.rs

//! In-process tables behind one mutex. Used when no database is configured and
//! by the test suite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};

use super::{CatalogStore, OrderStore, UserStore};
use crate::errors::{AppError, Result};
use crate::models::{
  Category, Course, CourseDraft, CourseFilter, CourseSort, CourseView, EnrollmentView, NewOrderLine, NewPayment,
  NewUser, Order, OrderCourseView, OrderStatus, OrderView, PageRequest, Payment, RefreshToken, User,
};

struct OrderLine {
  order_id: i64,
  course_id: i64,
  price_at_purchase: Decimal,
}

#[derive(Default)]
struct Tables {
  next_id: i64,
  categories: BTreeMap<i64, Category>,
  courses: BTreeMap<i64, Course>,
  users: BTreeMap<i64, User>,
  refresh_tokens: Vec<RefreshToken>,
  orders: BTreeMap<i64, Order>,
  order_lines: Vec<OrderLine>,
  payments: Vec<Payment>,
  enrollments: BTreeMap<(i64, i64), DateTime<Utc>>,
}

impl Tables {
  fn next_id(&mut self) -> i64 {
    self.next_id += 1;
    self.next_id
  }

  fn course_view(&self, course: &Course) -> CourseView {
    let category_name = self
      .categories
      .get(&course.category_id)
      .map(|c| c.name.clone())
      .unwrap_or_default();
    let instructor_name = self
      .users
      .get(&course.instructor_id)
      .map(User::display_name)
      .unwrap_or_default();
    CourseView {
      id: course.id,
      title: course.title.clone(),
      description: course.description.clone(),
      price: course.price,
      image_path: course.image_path.clone(),
      category_id: course.category_id,
      category_name,
      instructor_id: course.instructor_id,
      instructor_name,
      created_date: course.created_date,
      updated_date: course.updated_date,
    }
  }

  fn order_view(&self, order: &Order) -> OrderView {
    let mut courses: Vec<OrderCourseView> = self
      .order_lines
      .iter()
      .filter(|line| line.order_id == order.id)
      .filter_map(|line| {
        self.courses.get(&line.course_id).map(|course| OrderCourseView {
          id: course.id,
          title: course.title.clone(),
          price_at_purchase: line.price_at_purchase,
          image_path: course.image_path.clone(),
        })
      })
      .collect();
    courses.sort_by_key(|c| c.id);
    OrderView::from_parts(order.clone(), courses)
  }
}

fn matches_filter(course: &Course, filter: &CourseFilter) -> bool {
  match filter {
    CourseFilter::All => true,
    CourseFilter::TitleContains(term) => course.title.to_lowercase().contains(&term.to_lowercase()),
    CourseFilter::Instructor(instructor_id) => course.instructor_id == *instructor_id,
    CourseFilter::Category(category_id) => course.category_id == *category_id,
  }
}

fn sort_courses(courses: &mut [CourseView], sort: CourseSort) {
  match sort {
    CourseSort::Alphabetical => courses.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id))),
    CourseSort::PriceLowToHigh => courses.sort_by(|a, b| a.price.cmp(&b.price).then(a.id.cmp(&b.id))),
    CourseSort::PriceHighToLow => courses.sort_by(|a, b| b.price.cmp(&a.price).then(a.id.cmp(&b.id))),
    CourseSort::Newest => courses.sort_by(|a, b| b.created_date.cmp(&a.created_date).then(b.id.cmp(&a.id))),
  }
}

#[derive(Default)]
pub struct MemoryStore {
  tables: Mutex<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl CatalogStore for MemoryStore {
  async fn list_categories(&self) -> Result<Vec<Category>> {
    let tables = self.tables.lock();
    let mut categories: Vec<Category> = tables.categories.values().cloned().collect();
    categories.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(categories)
  }

  async fn category_exists(&self, category_id: i64) -> Result<bool> {
    Ok(self.tables.lock().categories.contains_key(&category_id))
  }

  async fn insert_category(&self, name: &str) -> Result<Category> {
    let mut tables = self.tables.lock();
    if tables.categories.values().any(|c| c.name == name) {
      return Err(AppError::Conflict(format!("Category '{}' already exists.", name)));
    }
    let category = Category {
      id: tables.next_id(),
      name: name.to_string(),
    };
    tables.categories.insert(category.id, category.clone());
    Ok(category)
  }

  async fn delete_category(&self, category_id: i64) -> Result<bool> {
    let mut tables = self.tables.lock();
    if tables.courses.values().any(|c| c.category_id == category_id) {
      return Err(AppError::Conflict(
        "Category still has courses and cannot be deleted.".to_string(),
      ));
    }
    Ok(tables.categories.remove(&category_id).is_some())
  }

  async fn page_courses(
    &self,
    filter: &CourseFilter,
    sort: CourseSort,
    page: PageRequest,
  ) -> Result<(Vec<CourseView>, i64)> {
    let tables = self.tables.lock();
    let mut matching: Vec<CourseView> = tables
      .courses
      .values()
      .filter(|course| matches_filter(course, filter))
      .map(|course| tables.course_view(course))
      .collect();
    let total = matching.len() as i64;
    sort_courses(&mut matching, sort);
    let courses = matching
      .into_iter()
      .skip(page.offset() as usize)
      .take(page.size as usize)
      .collect();
    Ok((courses, total))
  }

  async fn get_course(&self, course_id: i64) -> Result<Option<CourseView>> {
    let tables = self.tables.lock();
    Ok(tables.courses.get(&course_id).map(|course| tables.course_view(course)))
  }

  async fn insert_course(&self, instructor_id: i64, draft: &CourseDraft, now: DateTime<Utc>) -> Result<i64> {
    let mut tables = self.tables.lock();
    if !tables.categories.contains_key(&draft.category_id) {
      return Err(AppError::Validation("Category does not exist.".to_string()));
    }
    let id = tables.next_id();
    tables.courses.insert(
      id,
      Course {
        id,
        title: draft.title.clone(),
        description: draft.description.clone(),
        price: draft.price,
        image_path: draft.image_path.clone(),
        category_id: draft.category_id,
        instructor_id,
        created_date: now,
        updated_date: now,
      },
    );
    Ok(id)
  }

  async fn update_course(&self, course_id: i64, draft: &CourseDraft, now: DateTime<Utc>) -> Result<bool> {
    let mut tables = self.tables.lock();
    if !tables.categories.contains_key(&draft.category_id) {
      return Err(AppError::Validation("Category does not exist.".to_string()));
    }
    let Some(course) = tables.courses.get_mut(&course_id) else {
      return Ok(false);
    };
    course.title = draft.title.clone();
    course.description = draft.description.clone();
    course.price = draft.price;
    course.image_path = draft.image_path.clone();
    course.category_id = draft.category_id;
    course.updated_date = now;
    Ok(true)
  }

  async fn delete_course(&self, course_id: i64) -> Result<bool> {
    let mut tables = self.tables.lock();
    if tables.order_lines.iter().any(|line| line.course_id == course_id) {
      return Err(AppError::Conflict(
        "Course has been purchased and cannot be deleted.".to_string(),
      ));
    }
    Ok(tables.courses.remove(&course_id).is_some())
  }

  async fn courses_by_ids(&self, course_ids: &[i64]) -> Result<Vec<CourseView>> {
    let tables = self.tables.lock();
    let wanted: HashSet<i64> = course_ids.iter().copied().collect();
    Ok(
      tables
        .courses
        .values()
        .filter(|course| wanted.contains(&course.id))
        .map(|course| tables.course_view(course))
        .collect(),
    )
  }
}

#[async_trait]
impl UserStore for MemoryStore {
  async fn insert_user(&self, user: NewUser, now: DateTime<Utc>) -> Result<User> {
    let mut tables = self.tables.lock();
    if tables.users.values().any(|u| u.email == user.email) {
      return Err(AppError::Conflict("An account with this email already exists.".to_string()));
    }
    let stored = User {
      id: tables.next_id(),
      email: user.email,
      first_name: user.first_name,
      last_name: user.last_name,
      avatar_path: user.avatar_path,
      password_hash: user.password_hash,
      roles: user.roles,
      created_at: now,
    };
    tables.users.insert(stored.id, stored.clone());
    Ok(stored)
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    Ok(self.tables.lock().users.values().find(|u| u.email == email).cloned())
  }

  async fn find_user(&self, user_id: i64) -> Result<Option<User>> {
    Ok(self.tables.lock().users.get(&user_id).cloned())
  }

  async fn update_profile(&self, user_id: i64, first_name: &str, last_name: &str, avatar_path: &str) -> Result<bool> {
    let mut tables = self.tables.lock();
    let Some(user) = tables.users.get_mut(&user_id) else {
      return Ok(false);
    };
    user.first_name = first_name.to_string();
    user.last_name = last_name.to_string();
    user.avatar_path = avatar_path.to_string();
    Ok(true)
  }

  async fn update_password_hash(&self, user_id: i64, password_hash: &str) -> Result<bool> {
    let mut tables = self.tables.lock();
    let Some(user) = tables.users.get_mut(&user_id) else {
      return Ok(false);
    };
    user.password_hash = password_hash.to_string();
    Ok(true)
  }

  async fn delete_user(&self, user_id: i64) -> Result<bool> {
    let mut tables = self.tables.lock();
    if tables.courses.values().any(|c| c.instructor_id == user_id) {
      return Err(AppError::Conflict(
        "Instructors with published courses cannot be deleted.".to_string(),
      ));
    }
    if tables.users.remove(&user_id).is_none() {
      return Ok(false);
    }
    let order_ids: HashSet<i64> = tables
      .orders
      .values()
      .filter(|o| o.user_id == user_id)
      .map(|o| o.id)
      .collect();
    tables.orders.retain(|id, _| !order_ids.contains(id));
    tables.order_lines.retain(|line| !order_ids.contains(&line.order_id));
    tables.payments.retain(|p| !order_ids.contains(&p.order_id));
    tables.refresh_tokens.retain(|t| t.user_id != user_id);
    tables.enrollments.retain(|(uid, _), _| *uid != user_id);
    Ok(true)
  }

  async fn insert_refresh_token(
    &self,
    user_id: i64,
    token: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
  ) -> Result<RefreshToken> {
    let mut tables = self.tables.lock();
    let stored = RefreshToken {
      id: tables.next_id(),
      user_id,
      token: token.to_string(),
      expires_at,
      created_at: now,
      revoked_at: None,
    };
    tables.refresh_tokens.push(stored.clone());
    Ok(stored)
  }

  async fn find_active_refresh_token(
    &self,
    user_id: i64,
    token: &str,
    now: DateTime<Utc>,
  ) -> Result<Option<RefreshToken>> {
    Ok(
      self
        .tables
        .lock()
        .refresh_tokens
        .iter()
        .find(|t| t.user_id == user_id && t.token == token && t.is_active(now))
        .cloned(),
    )
  }

  async fn rotate_refresh_token(
    &self,
    old_token_id: i64,
    user_id: i64,
    new_token: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
  ) -> Result<bool> {
    let mut tables = self.tables.lock();
    let Some(old) = tables
      .refresh_tokens
      .iter_mut()
      .find(|t| t.id == old_token_id && t.user_id == user_id && t.revoked_at.is_none())
    else {
      return Ok(false);
    };
    old.revoked_at = Some(now);

    let id = tables.next_id();
    tables.refresh_tokens.push(RefreshToken {
      id,
      user_id,
      token: new_token.to_string(),
      expires_at,
      created_at: now,
      revoked_at: None,
    });
    Ok(true)
  }

  async fn active_refresh_token_count(&self, user_id: i64, now: DateTime<Utc>) -> Result<i64> {
    let tables = self.tables.lock();
    Ok(
      tables
        .refresh_tokens
        .iter()
        .filter(|t| t.user_id == user_id && t.is_active(now))
        .count() as i64,
    )
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn create_order(
    &self,
    user_id: i64,
    lines: &[NewOrderLine],
    total_amount: Decimal,
    now: DateTime<Utc>,
  ) -> Result<OrderView> {
    let mut tables = self.tables.lock();
    if let Some(missing) = lines.iter().find(|line| !tables.courses.contains_key(&line.course_id)) {
      return Err(AppError::NotFound(format!("Course {} does not exist.", missing.course_id)));
    }
    let order = Order {
      id: tables.next_id(),
      user_id,
      order_date: now,
      total_amount,
      status: OrderStatus::Pending,
    };
    tables.orders.insert(order.id, order.clone());
    for line in lines {
      tables.order_lines.push(OrderLine {
        order_id: order.id,
        course_id: line.course_id,
        price_at_purchase: line.price_at_purchase,
      });
    }
    Ok(tables.order_view(&order))
  }

  async fn get_order(&self, order_id: i64) -> Result<Option<OrderView>> {
    let tables = self.tables.lock();
    Ok(tables.orders.get(&order_id).map(|order| tables.order_view(order)))
  }

  async fn orders_for_user(&self, user_id: i64) -> Result<Vec<OrderView>> {
    let tables = self.tables.lock();
    let mut orders: Vec<OrderView> = tables
      .orders
      .values()
      .filter(|o| o.user_id == user_id)
      .map(|o| tables.order_view(o))
      .collect();
    orders.sort_by(|a, b| b.order_date.cmp(&a.order_date).then(b.id.cmp(&a.id)));
    Ok(orders)
  }

  async fn transition_status(&self, order_id: i64, from: OrderStatus, to: OrderStatus) -> Result<bool> {
    let mut tables = self.tables.lock();
    match tables.orders.get_mut(&order_id) {
      Some(order) if order.status == from => {
        order.status = to;
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  async fn set_status(&self, order_id: i64, status: OrderStatus) -> Result<bool> {
    let mut tables = self.tables.lock();
    let Some(order) = tables.orders.get_mut(&order_id) else {
      return Ok(false);
    };
    order.status = status;
    Ok(true)
  }

  async fn insert_payment(&self, payment: &NewPayment) -> Result<bool> {
    let mut tables = self.tables.lock();
    if !tables.orders.contains_key(&payment.order_id) {
      return Err(AppError::NotFound(format!("Order {} does not exist.", payment.order_id)));
    }
    if tables
      .payments
      .iter()
      .any(|p| p.transaction_id == payment.transaction_id || p.order_id == payment.order_id)
    {
      return Ok(false);
    }
    let id = tables.next_id();
    tables.payments.push(Payment {
      id,
      order_id: payment.order_id,
      amount: payment.amount,
      transaction_id: payment.transaction_id.clone(),
      method: payment.method,
      status: payment.status,
      payment_date: payment.payment_date,
    });
    Ok(true)
  }

  async fn payment_for_order(&self, order_id: i64) -> Result<Option<Payment>> {
    Ok(
      self
        .tables
        .lock()
        .payments
        .iter()
        .find(|p| p.order_id == order_id)
        .cloned(),
    )
  }

  async fn enroll(&self, user_id: i64, course_ids: &[i64], now: DateTime<Utc>) -> Result<u64> {
    let mut tables = self.tables.lock();
    let mut inserted = 0;
    for course_id in course_ids {
      if let std::collections::btree_map::Entry::Vacant(slot) = tables.enrollments.entry((user_id, *course_id)) {
        slot.insert(now);
        inserted += 1;
      }
    }
    Ok(inserted)
  }

  async fn enrollments_for_user(&self, user_id: i64) -> Result<Vec<EnrollmentView>> {
    let tables = self.tables.lock();
    let mut enrollments: Vec<EnrollmentView> = tables
      .enrollments
      .iter()
      .filter(|((uid, _), _)| *uid == user_id)
      .filter_map(|((_, course_id), enrolled_at)| {
        tables.courses.get(course_id).map(|course| {
          let view = tables.course_view(course);
          EnrollmentView {
            course_id: view.id,
            title: view.title,
            description: view.description,
            image_path: view.image_path,
            instructor_name: view.instructor_name,
            enrollment_date: *enrolled_at,
          }
        })
      })
      .collect();
    enrollments.sort_by(|a, b| b.enrollment_date.cmp(&a.enrollment_date).then(a.course_id.cmp(&b.course_id)));
    Ok(enrollments)
  }
}
