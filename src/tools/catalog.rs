//! Schema catalog resource.
//!
//! The catalog is a static document describing the analytical tables
//! (`dim_*` and `fct_*`) and their columns. It is read from disk on every
//! request so edits show up without a restart.

use crate::error::{DbError, DbResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Message returned when the catalog file has no content.
pub const EMPTY_CATALOG_MESSAGE: &str = "Unable to fetch catalog data.";

/// Reads the catalog document from the configured path.
#[derive(Debug, Clone, Default)]
pub struct CatalogReader {
    path: Option<PathBuf>,
}

impl CatalogReader {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the catalog text verbatim.
    pub async fn read(&self) -> DbResult<String> {
        info!("Resource: get_database_catalog");

        let path = self.path.as_ref().ok_or_else(|| {
            DbError::catalog("No catalog file configured (set CATALOG_PATH)")
        })?;

        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            DbError::catalog(format!("Failed to read {}: {}", path.display(), e))
        })?;

        if text.trim().is_empty() {
            return Err(DbError::catalog(EMPTY_CATALOG_MESSAGE));
        }

        debug!(path = %path.display(), bytes = text.len(), "Catalog loaded");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_read_returns_content_verbatim() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "dim_customer(id, name)\nfct_sales(customer_id, amount)").unwrap();

        let reader = CatalogReader::new(Some(file.path().to_path_buf()));
        let text = reader.read().await.unwrap();
        assert_eq!(text, "dim_customer(id, name)\nfct_sales(customer_id, amount)");
    }

    #[tokio::test]
    async fn test_blank_catalog_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "  \n").unwrap();

        let reader = CatalogReader::new(Some(file.path().to_path_buf()));
        let err = reader.read().await.unwrap_err();
        assert_eq!(err.to_string(), "Catalog error: Unable to fetch catalog data.");
    }

    #[tokio::test]
    async fn test_unconfigured_catalog_is_error() {
        let err = CatalogReader::default().read().await.unwrap_err();
        assert!(matches!(err, DbError::Catalog { .. }));
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let reader = CatalogReader::new(Some(PathBuf::from("/nonexistent/catalog.json")));
        let err = reader.read().await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/catalog.json"));
    }
}
