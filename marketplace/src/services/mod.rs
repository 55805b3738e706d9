// academy/marketplace/src/services/mod.rs

pub mod auth_service;
pub mod catalog_service;
pub mod token_service;
pub mod validation;

pub use catalog_service::CatalogService;
pub use token_service::{AccessClaims, TokenPair, TokenService};
