//! HTTP API for the web-search proxy.
//!
//! ## Endpoints
//!
//! - `POST /v1/chat/completions` - OpenAI-compatible chat completions with server-side `web_search`
//! - `GET /health` - Health check

mod completions;
mod routes;
pub mod types;

pub use completions::assemble_response;
pub use routes::{router, serve, AppState};
