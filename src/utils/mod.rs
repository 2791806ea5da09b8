//! Utility functions and helpers.

pub mod console;
pub mod fs;
pub mod http;
pub mod url;

pub use self::url::{normalize_detail_url, resolve};
