// academy/marketplace/src/lib.rs

//! Course marketplace service: catalog, identity, orders and the event-driven
//! order lifecycle, served over HTTP with actix-web.

pub mod cache;
pub mod config;
pub mod errors;
pub mod events;
pub mod models;
pub mod pipelines;
pub mod seed;
pub mod services;
pub mod state;
pub mod store;
pub mod web;
