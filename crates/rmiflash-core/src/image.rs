//! Firmware image set
//!
//! The container format is parsed elsewhere; by the time an update starts the
//! images are plain named blobs.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Application firmware image
pub const IMAGE_UI: &str = "ui";
/// Application configuration image
pub const IMAGE_CONFIG: &str = "config";
/// Flash configuration image (bootloader v8)
pub const IMAGE_FLASH_CONFIG: &str = "flash-config";

/// Named firmware images making up one update
#[derive(Debug, Clone, Default)]
pub struct ImageSet {
    images: BTreeMap<String, Vec<u8>>,
}

impl ImageSet {
    /// Create an empty image set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an image
    pub fn insert(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.images.insert(name.into(), data);
    }

    /// Builder form of [`ImageSet::insert`]
    pub fn with(mut self, name: impl Into<String>, data: Vec<u8>) -> Self {
        self.insert(name, data);
        self
    }

    /// Get an image that must be present
    pub fn get(&self, name: &str) -> Result<&[u8]> {
        self.get_optional(name)
            .ok_or_else(|| Error::MissingImage(name.to_string()))
    }

    /// Get an image if present
    pub fn get_optional(&self, name: &str) -> Option<&[u8]> {
        self.images.get(name).map(Vec::as_slice)
    }

    /// Whether an image is present
    pub fn contains(&self, name: &str) -> bool {
        self.images.contains_key(name)
    }
}
