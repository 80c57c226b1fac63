//! Rate-resolution core: source abstraction, row selection and window search

pub mod config;
pub mod error;
pub mod log;
pub mod rate;
pub mod search;
pub mod selector;

// Re-export main types for cleaner imports
pub use error::{ConfigError, RateError};
pub use rate::{DateWindow, RateRow, RateSource};
pub use search::{LookbackBounds, Resolved, WindowSearcher, window_schedule};
