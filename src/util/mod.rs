//! Miscellaneous shared helpers (error rollup).

pub mod error;

pub use error::{Result, SerializationError, StreamorError};
