use std::path::{Path, PathBuf};

use crate::error::{FluenceError, Result};
use crate::simulation::SessionMetadata;
use crate::volume::FluenceVolume;

/// One decoded result, keyed by its material label.
#[derive(Debug, Clone)]
pub struct DatasetEntry {
    pub label: String,
    pub volume: FluenceVolume,
    pub source_path: PathBuf,
    pub metadata: SessionMetadata,
}

impl DatasetEntry {
    pub fn new(
        label: impl Into<String>,
        volume: FluenceVolume,
        source_path: impl AsRef<Path>,
    ) -> Self {
        Self {
            label: label.into(),
            volume,
            source_path: source_path.as_ref().to_path_buf(),
            metadata: SessionMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: SessionMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Registration-ordered set of datasets with unique labels.
#[derive(Debug, Default)]
pub struct DatasetAggregator {
    entries: Vec<DatasetEntry>,
}

impl DatasetAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a decoded volume under `label`
    ///
    /// # Errors
    ///
    /// `DuplicateLabel` if the label is already taken
    pub fn add(
        &mut self,
        label: impl Into<String>,
        volume: FluenceVolume,
        source_path: impl AsRef<Path>,
    ) -> Result<&DatasetEntry> {
        self.insert(DatasetEntry::new(label, volume, source_path))
    }

    /// Register a complete entry, metadata included.
    pub fn insert(&mut self, entry: DatasetEntry) -> Result<&DatasetEntry> {
        if self.contains(&entry.label) {
            return Err(FluenceError::DuplicateLabel(entry.label));
        }
        log::info!(
            "registered '{}' {:?} from {}",
            entry.label,
            entry.volume.shape(),
            entry.source_path.display()
        );
        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn get(&self, label: &str) -> Result<&DatasetEntry> {
        self.entries
            .iter()
            .find(|entry| entry.label == label)
            .ok_or_else(|| FluenceError::LabelNotFound(label.to_string()))
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.iter().any(|entry| entry.label == label)
    }

    /// Entries in registration order.
    pub fn all(&self) -> &[DatasetEntry] {
        &self.entries
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
