//! Google Drive share-link normalization
//!
//! Providers paste Drive share links as tour images. Those links open the
//! Drive viewer rather than the image itself, so they are rewritten into the
//! direct `uc?export=view` form before display.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

const DRIVE_VIEW_BASE: &str = "https://drive.google.com/uc?export=view&id=";

// https://drive.google.com/file/d/{id}/view?usp=sharing
static FILE_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://drive\.google\.com/file/d/([A-Za-z0-9_-]+)").expect("valid regex")
});

// https://drive.google.com/open?id={id} and https://drive.google.com/uc?id={id}
static QUERY_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://drive\.google\.com/(?:open|uc)\?(?:[^#]*&)?id=([A-Za-z0-9_-]+)")
        .expect("valid regex")
});

/// Extract the file id from a Drive share link
#[must_use]
pub fn drive_file_id(url: &str) -> Option<&str> {
    let url = url.trim();
    FILE_PATH_PATTERN
        .captures(url)
        .or_else(|| QUERY_ID_PATTERN.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Rewrite Drive share links into direct view URLs; other URLs pass through
#[must_use]
pub fn normalize_drive_url(url: &str) -> String {
    match drive_file_id(url) {
        Some(id) => {
            debug!("Normalized Drive link for file {id}");
            format!("{DRIVE_VIEW_BASE}{id}")
        }
        None => url.to_string(),
    }
}
