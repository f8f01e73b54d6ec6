//! Display formatting and small serde helpers.

pub mod format;

pub use format::{format_currency, format_shift_date, null_as_default, string_or_number, truncate_string};
