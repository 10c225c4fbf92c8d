use crate::aggregator::DatasetEntry;
use crate::container::ContainerReader;
use crate::error::{FluenceError, Result};
use crate::payload;
use crate::simulation::{SessionMetadata, SimulationConfig, read_detected_photons};

use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};

const CONTAINER_EXTENSION: &str = "jnii";
const RESULT_SUFFIX: &str = "_result";

pub struct DatasetLoader;

impl DatasetLoader {
    /// Load one container into a dataset entry
    ///
    /// # Arguments
    ///
    /// * `label` - Material label the entry is registered under
    /// * `path` - Path of the `.jnii` container
    ///
    /// # Errors
    ///
    /// Returns the reader's or decoder's error; optional sibling metadata that
    /// fails to load is logged and skipped
    pub fn load_from_path(
        label: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<DatasetEntry> {
        let path = path.as_ref();
        let label = label.into();
        let record = ContainerReader::read(path)?;
        let volume = payload::decode_record(&record)?;

        let mut metadata = record.metadata;
        if let Some(stem) = Self::result_stem(path) {
            let dir = path.parent().unwrap_or_else(|| Path::new(""));
            let config_path = dir.join(format!("{stem}_simulation.json"));
            if config_path.exists() {
                match SimulationConfig::read(&config_path) {
                    Ok(config) => metadata.merge(SessionMetadata::from_config(&config)),
                    Err(e) => log::warn!("ignoring {}: {e}", config_path.display()),
                }
            }
            let detp_path = dir.join(format!("{stem}{RESULT_SUFFIX}_detp.jdat"));
            if detp_path.exists() {
                match read_detected_photons(&detp_path) {
                    Ok(detected) => metadata.detected_photons = detected,
                    Err(e) => log::warn!("ignoring {}: {e}", detp_path.display()),
                }
            }
        }

        log::info!(
            "loaded '{label}' {:?} from {}",
            volume.shape(),
            path.display()
        );
        Ok(DatasetEntry::new(label, volume, path).with_metadata(metadata))
    }

    /// Decode several containers in parallel.
    ///
    /// Results come back in input order so the caller can register them
    /// serially and decide what to do with failures.
    pub fn load_from_paths<L, P>(sources: &[(L, P)]) -> Vec<Result<DatasetEntry>>
    where
        L: AsRef<str> + Sync,
        P: AsRef<Path> + Sync,
    {
        sources
            .par_iter()
            .map(|(label, path)| Self::load_from_path(label.as_ref(), path.as_ref()))
            .collect()
    }

    /// Load every `.jnii` file under `path`, one directory level deep.
    ///
    /// Both `dir/air_result.jnii` and `dir/air/air_result.jnii` are picked
    /// up; labels come from the file stem without its `_result` suffix.
    /// Entries are sorted by file path.
    pub fn load_from_directory(path: impl AsRef<Path>) -> Result<Vec<Result<DatasetEntry>>> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(FluenceError::NotFound(path.to_path_buf()));
        }

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(path)?.filter_map(std::result::Result::ok) {
            let entry_path = entry.path();
            if entry_path.is_dir() {
                paths.extend(Self::containers_in(&entry_path)?);
            } else if Self::is_container(&entry_path) {
                paths.push(entry_path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(FluenceError::EmptyInput);
        }

        let sources: Vec<(String, PathBuf)> = paths
            .into_iter()
            .map(|p| (Self::label_for(&p), p))
            .collect();
        Ok(Self::load_from_paths(&sources))
    }

    /// Label derived from a container path: `water/water_result.jnii` → `water`.
    pub fn label_for(path: &Path) -> String {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        stem.strip_suffix(RESULT_SUFFIX).unwrap_or(stem).to_string()
    }

    fn containers_in(dir: &Path) -> Result<Vec<PathBuf>> {
        Ok(fs::read_dir(dir)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|p| Self::is_container(p))
            .collect())
    }

    fn is_container(path: &Path) -> bool {
        path.is_file()
            && path
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(CONTAINER_EXTENSION))
    }

    /// `air` for `air_result.jnii`; `None` when the file does not follow the
    /// simulator's naming.
    fn result_stem(path: &Path) -> Option<&str> {
        path.file_stem()?.to_str()?.strip_suffix(RESULT_SUFFIX)
    }
}
