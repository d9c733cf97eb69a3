//! Core types, validation, and event construction for the funnel conversion engine.

pub mod error;
pub mod events;
pub mod factories;
pub mod funnel;
pub mod goal;
pub mod limits;
pub mod schema;
pub mod session;

pub use error::{Error, ErrorCode, Result};
pub use events::*;
pub use factories::*;
pub use funnel::*;
pub use goal::*;
pub use schema::{validate_batch, validate_conversion_event, validate_json_batch};
pub use session::*;
