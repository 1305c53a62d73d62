//! # Audio Catalog
//!
//! Immutable projection of the remote audio list.

use bridge_traits::DataSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Child field holding the clip locator.
pub const FILE_URL_FIELD: &str = "file_url";

/// One selectable clip.
///
/// `name` is the remote child key. `url` is `None` when the child has no
/// string `file_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioEntry {
    name: String,
    url: Option<String>,
}

impl AudioEntry {
    pub fn new(name: impl Into<String>, url: Option<String>) -> Self {
        Self {
            name: name.into(),
            url,
        }
    }

    /// Build an entry from one child of the collection node.
    pub fn from_snapshot(child: &DataSnapshot) -> Self {
        let name = child.key().unwrap_or_default().to_string();
        let url = child.child(FILE_URL_FIELD).as_str().map(str::to_string);
        Self { name, url }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

impl fmt::Display for AudioEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Ordered list of entries built from a single snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioCatalog {
    entries: Vec<AudioEntry>,
}

impl AudioCatalog {
    pub fn new(entries: Vec<AudioEntry>) -> Self {
        Self { entries }
    }

    /// One entry per child, in the snapshot's child order.
    pub fn from_snapshot(snapshot: &DataSnapshot) -> Self {
        let entries = snapshot
            .children()
            .iter()
            .map(AudioEntry::from_snapshot)
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[AudioEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&AudioEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Display names in order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AudioEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a AudioCatalog {
    type Item = &'a AudioEntry;
    type IntoIter = std::slice::Iter<'a, AudioEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
