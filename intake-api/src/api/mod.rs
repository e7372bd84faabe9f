//! HTTP API handlers for intake-api

pub mod applications;
pub mod health;

pub use applications::application_routes;
pub use health::health_routes;
