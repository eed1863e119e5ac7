pub mod auth;
pub mod family;
pub mod response;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use family::validate_family_middleware;
pub use response::{ApiResponse, ApiResult};
