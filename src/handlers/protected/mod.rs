// handlers/protected/mod.rs - Family-scoped handlers
//
// Security Level: JWT Authentication + resolved family
// Middleware: jwt_auth_middleware → validate_family_middleware
//
// Every handler here receives `Extension<FamilyContext>` and only ever touches
// records of that family. Ids from other families read as "not found".

pub mod family;
pub mod members;
pub mod modules;
pub mod providers;
pub mod todos;
