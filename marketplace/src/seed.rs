// academy/marketplace/src/seed.rs

//! Demo data inserted at startup when `SEED_DB` is set. Every step only adds
//! what is missing, so seeding an already seeded database changes nothing.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{info, instrument, warn};

use crate::errors::Result;
use crate::models::category::DEFAULT_CATEGORIES;
use crate::models::{CourseDraft, CourseFilter, CourseSort, NewUser, PageRequest, Role};
use crate::services::auth_service::hash_password;
use crate::store::{CatalogStore, Stores, UserStore};

/// Owner of every seeded course.
pub const SEED_INSTRUCTOR_EMAIL: &str = "instructor@email.com";
pub const SEED_INSTRUCTOR_PASSWORD: &str = "Instructor.33";
pub const SEED_STUDENT_PASSWORD: &str = "Student.33";

const COURSE_IMAGE: &str = "https://via.placeholder.com/150";

struct SeedUser {
  email: &'static str,
  first_name: &'static str,
  last_name: &'static str,
  avatar_path: &'static str,
  password: &'static str,
  roles: &'static [Role],
}

const SEED_USERS: [SeedUser; 3] = [
  SeedUser {
    email: SEED_INSTRUCTOR_EMAIL,
    first_name: "Instructor",
    last_name: "TR",
    avatar_path: "https://img.freepik.com/free-vector/smiling-young-man-illustration_1308-174669.jpg",
    password: SEED_INSTRUCTOR_PASSWORD,
    roles: &[Role::Instructor, Role::Student],
  },
  SeedUser {
    email: "user@email.com",
    first_name: "User",
    last_name: "One",
    avatar_path: "https://img.freepik.com/free-vector/smiling-young-man-illustration_1308-174669.jpg",
    password: SEED_STUDENT_PASSWORD,
    roles: &[Role::Student],
  },
  SeedUser {
    email: "user2@email.com",
    first_name: "User2",
    last_name: "Two",
    avatar_path: "https://w7.pngwing.com/pngs/754/473/png-transparent-avatar-boy-man-avatar-vol-1-icon.png",
    password: SEED_STUDENT_PASSWORD,
    roles: &[Role::Student],
  },
];

/// (title, description, price in cents, category name)
const SEED_COURSES: [(&str, &str, i64, &str); 16] = [
  ("Introduction to C#", "Learn the basics of C# programming language.", 9999, "Software Development"),
  (
    "Advanced Web Development",
    "Deep dive into modern web development with ASP.NET Core and React.",
    19999,
    "Web Development",
  ),
  (
    "Data Science with Python",
    "Master data analysis and machine learning using Python and libraries like pandas and scikit-learn.",
    14999,
    "Data Science",
  ),
  (
    "Digital Marketing Basics",
    "Learn the fundamentals of digital marketing, including SEO, SEM, and social media strategies.",
    7999,
    "Web Development",
  ),
  (
    "Introduction to Java",
    "Get started with Java programming language and learn object-oriented principles.",
    8999,
    "Software Development",
  ),
  (
    "Full Stack Web Development",
    "Learn both front-end and back-end web development with modern technologies.",
    29999,
    "Web Development",
  ),
  (
    "Machine Learning with R",
    "Learn machine learning techniques and algorithms using R programming.",
    17999,
    "Machine Learning",
  ),
  (
    "Front-End Development with React",
    "Master React.js and build modern, responsive web applications.",
    14999,
    "Web Development",
  ),
  (
    "Cloud Computing with AWS",
    "Learn how to deploy, manage, and scale applications on Amazon Web Services (AWS).",
    24999,
    "Cloud Computing",
  ),
  (
    "UI/UX Design Principles",
    "Learn the fundamentals of designing user interfaces and improving user experiences.",
    12999,
    "Web Development",
  ),
  (
    "Data Analysis with Excel",
    "Learn data manipulation, analysis, and visualization techniques using Excel.",
    5999,
    "Data Science",
  ),
  (
    "Introduction to SQL Databases",
    "Learn the basics of relational databases and SQL queries.",
    7999,
    "Data Science",
  ),
  (
    "Blockchain for Beginners",
    "Learn the fundamentals of blockchain technology and how it is transforming industries.",
    19999,
    "Software Development",
  ),
  (
    "Cybersecurity Essentials",
    "Understand the basics of cybersecurity and how to protect systems from potential threats.",
    16999,
    "Cyber Security",
  ),
  (
    "Mobile App Development with Flutter",
    "Learn how to build cross-platform mobile applications using Flutter.",
    15999,
    "Mobile Development",
  ),
  (
    "Digital Photography for Beginners",
    "Learn the basics of digital photography, including camera settings and composition.",
    9999,
    "Software Development",
  ),
];

/// How many rows each seeding step added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
  pub categories: usize,
  pub users: usize,
  pub courses: usize,
}

/// Seeds categories, the demo accounts and the demo courses, in that order.
#[instrument(name = "seed::database", skip(stores))]
pub async fn seed_database(stores: &Stores) -> Result<SeedReport> {
  let report = SeedReport {
    categories: seed_categories(stores.catalog.as_ref()).await?,
    users: seed_users(stores.users.as_ref()).await?,
    courses: seed_courses(stores.catalog.as_ref(), stores.users.as_ref()).await?,
  };
  info!(?report, "Seeding finished.");
  Ok(report)
}

/// Inserts the default categories into an empty catalog. Returns how many were added.
pub async fn seed_categories(catalog: &dyn CatalogStore) -> Result<usize> {
  if !catalog.list_categories().await?.is_empty() {
    info!("Categories already present; skipping seed.");
    return Ok(0);
  }
  for name in DEFAULT_CATEGORIES {
    catalog.insert_category(name).await?;
  }
  info!(count = DEFAULT_CATEGORIES.len(), "Default categories seeded.");
  Ok(DEFAULT_CATEGORIES.len())
}

/// Creates each demo account whose email is not registered yet.
pub async fn seed_users(users: &dyn UserStore) -> Result<usize> {
  let mut added = 0;
  for seed in &SEED_USERS {
    if users.find_user_by_email(seed.email).await?.is_some() {
      continue;
    }
    let new_user = NewUser {
      email: seed.email.to_string(),
      first_name: seed.first_name.to_string(),
      last_name: seed.last_name.to_string(),
      avatar_path: seed.avatar_path.to_string(),
      password_hash: hash_password(seed.password)?,
      roles: seed.roles.to_vec(),
    };
    users.insert_user(new_user, Utc::now()).await?;
    added += 1;
  }
  info!(count = added, "Demo users seeded.");
  Ok(added)
}

/// Adds each demo course whose title is not in the catalog yet, owned by the
/// seeded instructor.
pub async fn seed_courses(catalog: &dyn CatalogStore, users: &dyn UserStore) -> Result<usize> {
  let Some(instructor) = users.find_user_by_email(SEED_INSTRUCTOR_EMAIL).await? else {
    warn!(email = SEED_INSTRUCTOR_EMAIL, "Seed instructor missing; skipping course seed.");
    return Ok(0);
  };
  let categories: HashMap<String, i64> = catalog
    .list_categories()
    .await?
    .into_iter()
    .map(|category| (category.name, category.id))
    .collect();

  let mut added = 0;
  for (title, description, cents, category) in SEED_COURSES {
    let Some(&category_id) = categories.get(category) else {
      warn!(title, category, "Seed category missing; skipping course.");
      continue;
    };
    if course_titled(catalog, title).await? {
      continue;
    }
    let draft = CourseDraft {
      title: title.to_string(),
      description: description.to_string(),
      price: Decimal::new(cents, 2),
      image_path: COURSE_IMAGE.to_string(),
      category_id,
    };
    catalog.insert_course(instructor.id, &draft, Utc::now()).await?;
    added += 1;
  }
  info!(count = added, "Demo courses seeded.");
  Ok(added)
}

async fn course_titled(catalog: &dyn CatalogStore, title: &str) -> Result<bool> {
  let filter = CourseFilter::TitleContains(title.to_string());
  let (found, _) = catalog
    .page_courses(&filter, CourseSort::Newest, PageRequest::new(1, 100)?)
    .await?;
  Ok(found.iter().any(|course| course.title == title))
}
