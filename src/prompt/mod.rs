//! Request-to-prompt translation.
//!
//! The CLI takes a single flattened prompt and a model flag, so an inbound
//! chat request is reduced to those two values here:
//!
//! - [`builder`]: role-tagged messages to a `Human:`/`Assistant:` transcript
//! - [`models`]: external model ids to CLI model ids
//! - [`temperature`]: sampling temperature as a textual steering hint

pub mod builder;
pub mod models;
pub mod temperature;

pub use builder::{ASSISTANT_MARKER, Role, build_prompt};
pub use models::ModelMapper;
pub use temperature::apply_temperature;
