use crate::error::{FluenceError, Result};
use crate::simulation::{Domain, Forward, Session, SessionMetadata, SimulationConfig};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::{fs, path::Path};

/// JData annotated array, the `NIFTIData` section of a `.jnii` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArraySection {
    #[serde(rename = "_ArrayType_")]
    pub element_type: String,

    #[serde(rename = "_ArraySize_")]
    pub shape: Vec<usize>,

    #[serde(rename = "_ArrayZipType_", default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,

    #[serde(rename = "_ArrayZipSize_", default, skip_serializing_if = "Option::is_none")]
    pub zip_size: Option<Vec<usize>>,

    #[serde(rename = "_ArrayZipData_", default, skip_serializing_if = "Option::is_none")]
    pub zip_data: Option<String>,

    /// Uncompressed values, row-major.
    #[serde(rename = "_ArrayData_", default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<Vec<f32>>,
}

/// A parsed container: the array section plus whatever rode along with it.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerRecord {
    pub array: ArraySection,
    pub header: Option<JsonValue>,
    pub metadata: SessionMetadata,
}

#[derive(Deserialize)]
struct RawContainer {
    #[serde(rename = "NIFTIHeader", default)]
    header: Option<JsonValue>,
    #[serde(rename = "NIFTIData", default)]
    data: Option<JsonValue>,
    #[serde(rename = "Domain", default)]
    domain: Option<Domain>,
    #[serde(rename = "Session", default)]
    session: Option<Session>,
    #[serde(rename = "Forward", default)]
    forward: Option<Forward>,
}

#[derive(Serialize)]
struct RawContainerOut<'a> {
    #[serde(rename = "NIFTIHeader", skip_serializing_if = "Option::is_none")]
    header: Option<&'a JsonValue>,
    #[serde(rename = "NIFTIData")]
    data: &'a ArraySection,
    #[serde(flatten)]
    config: SimulationConfig,
}

pub struct ContainerReader;

impl ContainerReader {
    /// Read a JNIfTI JSON container
    ///
    /// # Errors
    ///
    /// `NotFound` if the path does not exist, `Format` if the file is not
    /// JSON or has no usable `NIFTIData` array section
    pub fn read(path: impl AsRef<Path>) -> Result<ContainerRecord> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FluenceError::NotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        log::debug!("read {} bytes from {}", text.len(), path.display());
        Self::parse(&text)
    }

    /// Parse container text already in memory.
    pub fn parse(text: &str) -> Result<ContainerRecord> {
        let raw: RawContainer = serde_json::from_str(text)
            .map_err(|e| FluenceError::Format(format!("not a JSON container: {e}")))?;

        let data = raw
            .data
            .ok_or_else(|| FluenceError::Format("missing NIFTIData section".to_string()))?;
        let array: ArraySection = serde_json::from_value(data)
            .map_err(|e| FluenceError::Format(format!("invalid NIFTIData section: {e}")))?;

        if array.zip_data.is_none() && array.raw_data.is_none() {
            return Err(FluenceError::Format(
                "NIFTIData carries neither _ArrayZipData_ nor _ArrayData_".to_string(),
            ));
        }

        let config = SimulationConfig {
            domain: raw.domain,
            session: raw.session,
            forward: raw.forward,
        };

        Ok(ContainerRecord {
            array,
            header: raw.header,
            metadata: SessionMetadata::from_config(&config),
        })
    }
}

impl ContainerRecord {
    pub fn new(array: ArraySection) -> Self {
        Self {
            array,
            header: None,
            metadata: SessionMetadata::default(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        let config = SimulationConfig {
            domain: (!self.metadata.media.is_empty()).then(|| Domain {
                media: self.metadata.media.clone(),
            }),
            session: self.metadata.photons.map(|photons| Session {
                photons: Some(photons),
                id: None,
            }),
            forward: self.metadata.forward,
        };
        let out = RawContainerOut {
            header: self.header.as_ref(),
            data: &self.array,
            config,
        };
        serde_json::to_string_pretty(&out).map_err(|e| FluenceError::Format(e.to_string()))
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
