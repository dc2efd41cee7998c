//! # Marketplace API Library
//!
//! Core of the multi-tenant marketplace service: storefronts, catalog,
//! checkout through connected payment accounts, reviews and buyer libraries.

pub mod access;
pub mod auth;
pub mod cart;
pub mod config;
pub mod cursor;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod money;
pub mod payments;
pub mod ratings;
pub mod repositories;
pub mod seeds;
pub mod server;
pub mod telemetry;
pub mod tenant_routing;
pub use migration;
