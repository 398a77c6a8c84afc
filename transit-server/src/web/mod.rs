//! HTTP surface over the line store.
//!
//! Every lookup is a thin JSON wrapper around a [`LineStore`](crate::store::LineStore)
//! operation; errors carry the status [`ScrapeError`](crate::scrape::ScrapeError) maps to.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
