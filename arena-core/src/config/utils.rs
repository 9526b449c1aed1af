//! Configuration utility functions
//!
//! This module provides helper functions for reading configuration
//! values from environment variables.

use std::path::PathBuf;

/// Get a string value from an environment variable or use the default
pub fn get_env_string(key: &str, default: String) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

/// Get a path value from an environment variable or use the default
pub fn get_env_path(key: &str, default: PathBuf) -> PathBuf {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or(default)
}
