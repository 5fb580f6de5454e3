//! OpenAI-compatible wire format.
//!
//! [`types`] holds the request/response/chunk shapes; [`routes`] holds the
//! axum handlers that serve them on top of the [`Gateway`](crate::gateway::Gateway).

pub mod routes;
pub mod types;
