//! YAML-backed file catalog
//!
//! Serves as the metadata store and capability validator for a standalone
//! deployment. The catalog file looks like:
//!
//! ```yaml
//! files:
//!   - id: "65f0c0ffee"
//!     unique_id: "AgADBQADx"
//!     file_size: 3000000
//!     mime_type: "video/mp4"
//!     file_name: "clip.mp4"
//!     remote_id: "msg-1042"
//! ```

use crate::backend::{CapabilityValidator, MetadataStore};
use crate::error::{GatewayError, Result};
use crate::models::{FileId, FileRecord};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    files: Vec<FileRecord>,
}

/// In-memory index of file records
#[derive(Debug, Clone, Default)]
pub struct FileCatalog {
    records: HashMap<String, FileRecord>,
}

impl FileCatalog {
    /// Build a catalog from records; later duplicates replace earlier ones
    pub fn from_records(records: impl IntoIterator<Item = FileRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        FileCatalog { records }
    }

    /// Load a catalog from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            GatewayError::ConfigError(format!("Failed to read catalog file: {}", e))
        })?;

        let parsed: CatalogFile = serde_yaml::from_str(&content).map_err(|e| {
            GatewayError::ConfigError(format!("Failed to parse catalog file: {}", e))
        })?;

        let catalog = Self::from_records(parsed.files);
        info!("Loaded {} file records from {}", catalog.len(), path.as_ref().display());
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl MetadataStore for FileCatalog {
    async fn get_file(&self, key: &str) -> Result<FileRecord> {
        self.records
            .get(key)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(key.to_string()))
    }
}

#[async_trait]
impl CapabilityValidator for FileCatalog {
    /// Unknown keys pass so that resolution reports them as not found
    async fn validate(&self, file_id: &FileId) -> bool {
        match self.records.get(&file_id.key) {
            Some(record) => {
                let valid = record.unique_id.starts_with(&file_id.hash);
                if !valid {
                    debug!("Capability hash mismatch for key={}", file_id.key);
                }
                valid
            }
            None => true,
        }
    }
}
