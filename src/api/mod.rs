//! Status HTTP surface (health + diagnostics)

pub mod health;
pub mod status;

pub use health::health_routes;
pub use status::status_routes;
