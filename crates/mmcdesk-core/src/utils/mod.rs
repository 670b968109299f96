//! Display helpers shared by the terminal front end.

pub mod format;

pub use format::{format_amount, format_datetime, format_optional, format_size, truncate_string};
