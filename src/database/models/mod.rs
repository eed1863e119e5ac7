pub mod family;
pub mod family_member;
pub mod provider;
pub mod todo;
pub mod user;

pub use family::{Family, FamilyRow, FamilySettings, FamilyUpdate, NewFamily};
pub use family_member::{
    CreateFamilyMemberInput, FamilyMember, FamilyMemberRow, FamilyMemberUpdate, FamilyPreferences,
    MemberMetadata, ModulePermissions, NewFamilyMember, Relationship, FAMILY_COLORS,
};
pub use provider::{
    CreateProviderInput, FamilyGroup, GroupedProvider, HealthcareProvider, NewProvider,
    ProviderChanges, ProviderRow, ProviderUpdateInput, QuickAddData, Specialty,
};
pub use todo::{CreateTodoInput, DeletedTodo, NewTodo, Todo, TodoRow, TodoUpdate};
pub use user::UserRow;
