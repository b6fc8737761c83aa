//! Utility modules: deadlines and text previews.

pub mod text;
pub mod timeout;

pub use text::truncate_chars;
pub use timeout::with_timeout;
