pub mod json;

pub use json::{ApiJson, ApiQuery};
