//! Session metadata written alongside simulator output.
//!
//! MCX keeps its input configuration (`<label>_simulation.json`) and the
//! detected-photon record (`<label>_result_detp.jdat`) next to the fluence
//! container. Some containers also embed `Session` / `Domain` / `Forward`
//! at their root. Nothing here is validated beyond existence; the values are
//! passed through for reporting.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FluenceError, Result};

/// Optical properties of one medium.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Medium {
    /// Absorption coefficient (1/mm).
    #[serde(default)]
    pub mua: Option<f64>,
    /// Scattering coefficient (1/mm).
    #[serde(default)]
    pub mus: Option<f64>,
    /// Anisotropy.
    #[serde(default)]
    pub g: Option<f64>,
    /// Refractive index.
    #[serde(default)]
    pub n: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    #[serde(rename = "Media", default)]
    pub media: Vec<Medium>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "Photons", default)]
    pub photons: Option<u64>,
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Time window of the simulation; one gate per `dt` between `t0` and `t1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forward {
    #[serde(rename = "T0")]
    pub t0: f64,
    #[serde(rename = "T1")]
    pub t1: f64,
    #[serde(rename = "Dt")]
    pub dt: f64,
}

impl Forward {
    pub fn gate_count(&self) -> usize {
        if self.dt <= 0.0 || self.t1 <= self.t0 {
            return 0;
        }
        ((self.t1 - self.t0) / self.dt).round() as usize
    }

    /// `(start, end)` time of a gate in seconds.
    pub fn gate_window(&self, gate: usize) -> (f64, f64) {
        let start = self.t0 + gate as f64 * self.dt;
        (start, start + self.dt)
    }
}

/// The subset of an MCX input file the reports care about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(rename = "Domain", default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    #[serde(rename = "Session", default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    #[serde(rename = "Forward", default, skip_serializing_if = "Option::is_none")]
    pub forward: Option<Forward>,
}

impl SimulationConfig {
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FluenceError::NotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| FluenceError::Format(format!("{}: {e}", path.display())))
    }
}

#[derive(Debug, Deserialize)]
struct DetectedPhotonRecord {
    #[serde(rename = "DetectedPhoton")]
    detected: Option<u64>,
}

/// Read the detected photon count from a `*_detp.jdat` file.
///
/// Returns `Ok(None)` when the file parses but carries no count.
pub fn read_detected_photons(path: impl AsRef<Path>) -> Result<Option<u64>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(FluenceError::NotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    let record: DetectedPhotonRecord = serde_json::from_str(&text)
        .map_err(|e| FluenceError::Format(format!("{}: {e}", path.display())))?;
    Ok(record.detected)
}

/// Metadata attached to a dataset for diagnostic reporting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionMetadata {
    pub photons: Option<u64>,
    pub media: Vec<Medium>,
    pub forward: Option<Forward>,
    pub detected_photons: Option<u64>,
}

impl SessionMetadata {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            photons: config.session.as_ref().and_then(|s| s.photons),
            media: config
                .domain
                .as_ref()
                .map(|d| d.media.clone())
                .unwrap_or_default(),
            forward: config.forward,
            detected_photons: None,
        }
    }

    /// Fill fields that are still unset from `other`.
    pub fn merge(&mut self, other: SessionMetadata) {
        if self.photons.is_none() {
            self.photons = other.photons;
        }
        if self.media.is_empty() {
            self.media = other.media;
        }
        if self.forward.is_none() {
            self.forward = other.forward;
        }
        if self.detected_photons.is_none() {
            self.detected_photons = other.detected_photons;
        }
    }

    /// Detected / launched photons, in percent.
    pub fn detection_rate(&self) -> Option<f64> {
        match (self.detected_photons, self.photons) {
            (Some(detected), Some(total)) if total > 0 => {
                Some(detected as f64 / total as f64 * 100.0)
            }
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.photons.is_none()
            && self.media.is_empty()
            && self.forward.is_none()
            && self.detected_photons.is_none()
    }
}
