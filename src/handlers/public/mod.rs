// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None
// Middleware: None

pub mod invites;
pub mod system;

pub use invites::validate as invite_validate;
pub use system::health;
pub use system::root;
