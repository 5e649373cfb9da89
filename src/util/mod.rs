//! Utility functions.

pub mod env;
pub mod format;
pub mod time;

pub use format::{format_duration_ms, format_percent, mastery_bar};
pub use time::{format_due, month_key, ms_to_datetime, now_ms};
