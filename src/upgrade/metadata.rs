use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Cluster {0} not found")]
    NotFound(String),

    #[error("Failed to read cluster metadata: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse cluster metadata: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Lookup of the version a cluster is currently running.
pub trait ClusterMetadata: Send + Sync {
    fn current_version(&self, cluster: &str) -> Result<String, MetadataError>;
}

/// Reads `<home>/storage/cluster/clusters/<name>/meta.yaml`.
pub struct FileMetadataStore {
    root: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ClusterMeta {
    #[serde(default)]
    tidb_version: String,
}

impl FileMetadataStore {
    pub fn new(home: PathBuf) -> Self {
        Self {
            root: home.join("storage").join("cluster").join("clusters"),
        }
    }

    fn meta_path(&self, cluster: &str) -> PathBuf {
        self.root.join(cluster).join("meta.yaml")
    }
}

impl ClusterMetadata for FileMetadataStore {
    fn current_version(&self, cluster: &str) -> Result<String, MetadataError> {
        let path = self.meta_path(cluster);
        debug!(path = %path.display(), "reading cluster metadata");
        if !path.exists() {
            return Err(MetadataError::NotFound(cluster.to_string()));
        }
        let meta: ClusterMeta = serde_yaml::from_str(&fs::read_to_string(&path)?)?;
        Ok(meta.tidb_version.trim().to_string())
    }
}
