//! HTTP request handlers, organized by resource.

pub mod appointments;
pub mod health;
pub mod reviews;
pub mod slots;

pub use health::health_check;
