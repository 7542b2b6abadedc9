//! ExpertBot observability: logging set-up for the binaries.

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::{ObservabilityError, Result};
pub use logging::{LogManager, LogTarget};
