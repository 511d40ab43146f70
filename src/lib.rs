//! REST service template: configuration, database bootstrap, validated
//! request payloads and a uniform response envelope.

pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod response;
pub mod services;
pub mod utils;
pub mod validation;
