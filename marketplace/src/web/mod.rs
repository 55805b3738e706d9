// academy/marketplace/src/web/mod.rs

pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::AuthenticatedUser;
pub use routes::configure_app_routes;
