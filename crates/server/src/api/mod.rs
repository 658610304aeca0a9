pub mod conversion;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod ws;

use serde::Serialize;

pub use routes::create_router;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
