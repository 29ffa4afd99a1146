//! Lifecycle steps over topology snapshots (backing-index replacement).

pub mod replace;
pub mod settings;
pub mod step;

pub use replace::*;
pub use settings::*;
pub use step::*;
