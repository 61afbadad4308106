//! Toolshop API services
//!
//! Each service is bound to the scenario's `HttpSession`. `*_response`
//! methods hand back the raw response so negative-path steps can inspect the
//! status; the typed methods fail with `HttpStatus` on non-2xx.

use std::sync::Arc;

use crate::http::HttpSession;
use crate::registry::Entity;

pub mod brands;
pub mod categories;
pub mod models;
pub mod products;

pub use brands::BrandService;
pub use categories::CategoryService;
pub use products::ProductService;

/// An API client the entity registry can construct from the HTTP session.
/// Construction must not perform any request.
pub trait ApiService: Entity {
    fn new(session: Arc<HttpSession>) -> Self;
}
