pub mod error;
pub mod family_service;
pub mod identity;
pub mod invite_code;
pub mod member_service;
pub mod migration_service;
pub mod portal_detection;
pub mod provider_service;
pub mod todo_service;

pub use error::{ServiceError, ServiceResult};
pub use family_service::FamilyService;
pub use identity::{require_auth_with_family, resolve_family, FamilyContext};
pub use member_service::MemberService;
pub use migration_service::{LegacyFamilyData, MigrationResult, MigrationService};
pub use portal_detection::{detect_healthcare_portal, PortalDetection};
pub use provider_service::ProviderService;
pub use todo_service::TodoService;
