// src/config.rs

//! Configuration loading utilities.
//!
//! This module provides convenience functions for loading the crawler
//! configuration and site profiles from files.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::{Config, SiteProfile};

/// Load configuration from a TOML file.
///
/// Without a path the defaults are used. An explicit path that fails to
/// load also falls back to defaults, with a warning.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_or_default(path),
        None => Config::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Load the profile for a site.
///
/// A profile file must exist and parse; its code and listing URL are
/// overridden by the command line. Without a file, a generic table-board
/// profile is built from `code` and `list_url`.
pub fn load_profile(path: Option<&Path>, code: &str, list_url: &str) -> Result<SiteProfile> {
    let profile = match path {
        Some(path) => {
            let mut profile = SiteProfile::load(path).map_err(|e| {
                AppError::config(format!("Failed to load profile {}: {e}", path.display()))
            })?;
            profile.code = code.to_string();
            profile.with_list_url(list_url)?
        }
        None => SiteProfile::generic(code, list_url)?,
    };
    profile.validate()?;
    Ok(profile)
}
