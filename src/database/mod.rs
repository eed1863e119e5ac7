pub mod error;
pub mod ids;
pub mod manager;
pub mod models;
pub mod postgres;
pub mod schema;
pub mod store;

pub use error::{Constraint, StoreError};
pub use manager::DatabaseManager;
pub use postgres::PgStore;
pub use store::{FamilyStore, StoreResult};
