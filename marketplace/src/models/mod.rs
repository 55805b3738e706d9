// academy/marketplace/src/models/mod.rs

//! Entities, their wire views and request payloads.

pub mod category;
pub mod course;
pub mod enrollment;
pub mod order;
pub mod payment;
pub mod user;

pub use category::Category;
pub use course::{Course, CourseDraft, CourseFilter, CoursePage, CourseSort, CourseView, PageRequest};
pub use enrollment::EnrollmentView;
pub use order::{NewOrderLine, Order, OrderCourseView, OrderStatus, OrderView};
pub use payment::{NewPayment, Payment, PaymentMethod, PaymentStatus};
pub use user::{NewUser, RefreshToken, Role, User, UserProfile};
