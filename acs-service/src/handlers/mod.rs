pub mod access;
pub mod health;

pub use access::{provision_access, revoke_access, test_connection};
pub use health::{health_check, metrics_endpoint, readiness_check};
