//! Database-driven endpoint authorization middleware.

mod layer;

pub use layer::{EndpointAuthzLayer, EndpointAuthzMiddleware, RoutePolicy};
