//! HTTP surface: `/`, `/health`, `/scan-medication` and `/openapi.json`.

pub mod handlers;
mod openapi;
pub mod response;
mod routes;
mod state;

pub use openapi::ApiDoc;
pub use response::ApiFailure;
pub use routes::create_router;
pub use state::AppState;
