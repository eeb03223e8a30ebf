//! Business logic services

pub mod auth_service;
pub mod contest_service;
pub mod export_service;
pub mod import_service;
pub mod lifecycle;
pub mod registry;
pub mod scoring;

pub use auth_service::AuthService;
pub use contest_service::ContestService;
