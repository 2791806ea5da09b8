// src/lib.rs

//! Gosi Crawler Library
//!
//! Collects public announcements (고시/공고) from Korean government portals
//! into numbered folders, newest first, until a cutoff date is reached.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

pub use error::{AppError, Result};
