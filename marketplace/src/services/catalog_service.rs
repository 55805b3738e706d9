// academy/marketplace/src/services/catalog_service.rs

//! Course and category reads and writes. Listings and single courses are read
//! through the cache; every course write drops the listing namespace and the
//! course's own entry. Cache failures never fail a request.

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::cache::{course_key, course_list_key, CacheStore, COURSE_LIST_PREFIX, COURSE_PREFIX};
use crate::errors::{AppError, Result};
use crate::models::{Category, CourseDraft, CourseFilter, CoursePage, CourseSort, CourseView, PageRequest};
use crate::services::validation::{check_course_fields, FieldErrors};
use crate::store::CatalogStore;

pub struct CatalogService {
  catalog: Arc<dyn CatalogStore>,
  cache: Arc<dyn CacheStore>,
  ttl: Duration,
}

impl CatalogService {
  pub fn new(catalog: Arc<dyn CatalogStore>, cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
    Self { catalog, cache, ttl }
  }

  async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    match self.cache.get(key).await {
      Ok(Some(raw)) => match serde_json::from_str(&raw) {
        Ok(value) => {
          debug!(%key, "Cache hit.");
          Some(value)
        }
        Err(e) => {
          warn!(%key, error = %e, "Discarding undecodable cache entry.");
          None
        }
      },
      Ok(None) => None,
      Err(e) => {
        warn!(%key, error = %e, "Cache read failed; using the store.");
        None
      }
    }
  }

  async fn remember<T: Serialize>(&self, key: &str, value: &T) {
    let raw = match serde_json::to_string(value) {
      Ok(raw) => raw,
      Err(e) => {
        warn!(%key, error = %e, "Value not cacheable.");
        return;
      }
    };
    if let Err(e) = self.cache.set(key, &raw, self.ttl).await {
      warn!(%key, error = %e, "Cache write failed.");
    }
  }

  async fn invalidate(&self, course_id: Option<i64>) {
    if let Err(e) = self.cache.remove_by_prefix(COURSE_LIST_PREFIX).await {
      warn!(error = %e, "Course listing invalidation failed.");
    }
    if let Some(course_id) = course_id {
      if let Err(e) = self.cache.remove(&course_key(course_id)).await {
        warn!(course_id, error = %e, "Course entry invalidation failed.");
      }
    }
  }

  /// Drops every cached listing and course. Cached views embed instructor
  /// names, so a profile change makes all of them stale.
  pub async fn forget_cached_courses(&self) {
    for prefix in [COURSE_LIST_PREFIX, COURSE_PREFIX] {
      if let Err(e) = self.cache.remove_by_prefix(prefix).await {
        warn!(prefix, error = %e, "Course cache invalidation failed.");
      }
    }
  }

  async fn page(&self, filter: CourseFilter, sort: CourseSort, page: PageRequest) -> Result<CoursePage> {
    let (courses, total) = self.catalog.page_courses(&filter, sort, page).await?;
    if courses.is_empty() {
      return Err(AppError::NotFound("No courses found.".to_string()));
    }
    Ok(CoursePage::new(page, total, courses))
  }

  #[instrument(name = "catalog::list_courses", skip(self), err(Display))]
  pub async fn list_courses(&self, page: PageRequest, sort: CourseSort) -> Result<CoursePage> {
    let key = course_list_key(page.number, page.size, sort.as_str());
    if let Some(cached) = self.cached::<CoursePage>(&key).await {
      return Ok(cached);
    }
    let result = self.page(CourseFilter::All, sort, page).await?;
    self.remember(&key, &result).await;
    Ok(result)
  }

  #[instrument(name = "catalog::search_courses", skip(self), err(Display))]
  pub async fn search_courses(&self, term: &str, page: PageRequest, sort: CourseSort) -> Result<CoursePage> {
    let term = term.trim();
    if term.is_empty() {
      return Err(AppError::Validation("SearchTerm is required".to_string()));
    }
    self.page(CourseFilter::TitleContains(term.to_string()), sort, page).await
  }

  #[instrument(name = "catalog::instructor_courses", skip(self), err(Display))]
  pub async fn instructor_courses(&self, instructor_id: i64, page: PageRequest) -> Result<CoursePage> {
    self.page(CourseFilter::Instructor(instructor_id), CourseSort::Newest, page).await
  }

  #[instrument(name = "catalog::category_courses", skip(self), err(Display))]
  pub async fn category_courses(&self, category_id: i64, page: PageRequest, sort: CourseSort) -> Result<CoursePage> {
    if category_id <= 0 {
      return Err(AppError::Validation("Invalid category id.".to_string()));
    }
    self.page(CourseFilter::Category(category_id), sort, page).await
  }

  #[instrument(name = "catalog::get_course", skip(self), err(Display))]
  pub async fn get_course(&self, course_id: i64) -> Result<CourseView> {
    let key = course_key(course_id);
    if let Some(cached) = self.cached::<CourseView>(&key).await {
      return Ok(cached);
    }
    let course = self
      .catalog
      .get_course(course_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Course {} not found.", course_id)))?;
    self.remember(&key, &course).await;
    Ok(course)
  }

  async fn validate_draft(&self, draft: &CourseDraft) -> Result<()> {
    let mut errors = FieldErrors::new();
    check_course_fields(&mut errors, &draft.title, &draft.description, draft.price);
    errors.into_result()?;
    if !self.catalog.category_exists(draft.category_id).await? {
      return Err(AppError::Validation("Category does not exist.".to_string()));
    }
    Ok(())
  }

  /// Loads the course and checks that `instructor_id` owns it.
  async fn owned_course(&self, instructor_id: i64, course_id: i64) -> Result<CourseView> {
    let course = self
      .catalog
      .get_course(course_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Course {} not found.", course_id)))?;
    if course.instructor_id != instructor_id {
      return Err(AppError::Forbidden("Only the course's instructor may change it.".to_string()));
    }
    Ok(course)
  }

  #[instrument(name = "catalog::create_course", skip(self, draft), fields(title = %draft.title), err(Display))]
  pub async fn create_course(&self, instructor_id: i64, draft: CourseDraft) -> Result<CourseView> {
    self.validate_draft(&draft).await?;
    let course_id = self.catalog.insert_course(instructor_id, &draft, Utc::now()).await?;
    self.invalidate(None).await;
    info!(course_id, "Course created.");
    self
      .catalog
      .get_course(course_id)
      .await?
      .ok_or_else(|| AppError::Internal(format!("Course {} vanished after insert.", course_id)))
  }

  #[instrument(name = "catalog::update_course", skip(self, draft), err(Display))]
  pub async fn update_course(&self, instructor_id: i64, course_id: i64, draft: CourseDraft) -> Result<()> {
    self.owned_course(instructor_id, course_id).await?;
    self.validate_draft(&draft).await?;
    if !self.catalog.update_course(course_id, &draft, Utc::now()).await? {
      return Err(AppError::NotFound(format!("Course {} not found.", course_id)));
    }
    self.invalidate(Some(course_id)).await;
    Ok(())
  }

  #[instrument(name = "catalog::delete_course", skip(self), err(Display))]
  pub async fn delete_course(&self, instructor_id: i64, course_id: i64) -> Result<()> {
    self.owned_course(instructor_id, course_id).await?;
    if !self.catalog.delete_course(course_id).await? {
      return Err(AppError::NotFound(format!("Course {} not found.", course_id)));
    }
    self.invalidate(Some(course_id)).await;
    Ok(())
  }

  pub async fn list_categories(&self) -> Result<Vec<Category>> {
    let categories = self.catalog.list_categories().await?;
    if categories.is_empty() {
      return Err(AppError::NotFound("No categories found.".to_string()));
    }
    Ok(categories)
  }

  #[instrument(name = "catalog::delete_category", skip(self), err(Display))]
  pub async fn delete_category(&self, category_id: i64) -> Result<()> {
    if !self.catalog.delete_category(category_id).await? {
      return Err(AppError::NotFound(format!("Category {} not found.", category_id)));
    }
    Ok(())
  }
}
