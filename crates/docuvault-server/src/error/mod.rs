//! Error handling for the API server.

mod response;
mod types;

pub use response::ErrorBody;
pub use types::{ApiError, ApiResult};
