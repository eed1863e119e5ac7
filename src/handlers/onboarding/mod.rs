// handlers/onboarding/mod.rs - Authenticated handlers that do not need a family yet
//
// Security Level: JWT Authentication Required
// Middleware: jwt_auth_middleware

pub mod families;
pub mod migration;
pub mod portal;

pub use families::create as family_create;
pub use families::join as family_join;

pub use migration::migrate as migration_migrate;
pub use migration::minimal as migration_minimal;
pub use migration::status as migration_status;

pub use portal::detect as portal_detect;
