//! CRM service skeleton: layered settings resolution and the HTTP surface
//! built from it.

pub mod app;
pub mod config;
pub mod error;
pub mod models;

pub use app::build_app;
pub use config::{ConfigError, Environment, Settings};
pub use error::AppError;
