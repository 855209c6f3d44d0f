//! JWT authentication middleware.

mod extractor;
mod jwt;
mod layer;
mod types;

pub use extractor::{AccessUser, Auth, SuperUser};
pub use jwt::{decode_token, encode_token};
pub use layer::{AuthLayer, AuthMiddleware};
pub use types::{AuthUser, Claims};
