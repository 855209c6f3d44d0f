//! API response wrappers.

mod types;

pub use types::{ApiResponse, Created};
