//! Local file-store adapter
//!
//! Treats the external file id as a path relative to a root directory.
//! Text formats are read directly; any other format yields no text, which
//! the scheduler records as a failed attempt without stopping the run.

use crate::{ExtractError, Extraction, ExtractionAdapter};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Method label reported for files read as text
pub const PLAIN_TEXT_METHOD: &str = "plain_text";

/// Files larger than this are not read (bytes)
pub const DEFAULT_MAX_FILE_BYTES: u64 = 64 * 1024 * 1024;

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "text", "md", "markdown", "rst", "csv", "tsv", "json", "xml", "html", "htm", "log",
    "yaml", "yml",
];

/// Adapter reading files below a root directory
#[derive(Debug, Clone)]
pub struct LocalFileAdapter {
    root: PathBuf,
    max_file_bytes: u64,
}

impl LocalFileAdapter {
    /// Create an adapter serving files below `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }

    /// Set the largest file size that will be read
    pub fn with_max_file_bytes(mut self, max_file_bytes: u64) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a file id below the root, rejecting anything that would escape it
    fn resolve(&self, external_file_id: &str) -> Result<PathBuf, ExtractError> {
        let relative = Path::new(external_file_id);
        if external_file_id.is_empty() {
            return Err(ExtractError::InvalidRequest("empty file id".to_string()));
        }

        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ExtractError::InvalidRequest(format!(
                "file id must be a relative path below the root: {}",
                external_file_id
            )));
        }

        Ok(self.root.join(relative))
    }
}

fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| TEXT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[async_trait]
impl ExtractionAdapter for LocalFileAdapter {
    fn name(&self) -> &str {
        "local"
    }

    async fn extract(&self, external_file_id: &str) -> Result<Extraction, ExtractError> {
        let path = self.resolve(external_file_id)?;

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExtractError::NotFound(external_file_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_file() {
            return Err(ExtractError::InvalidRequest(format!("not a file: {}", external_file_id)));
        }

        if !is_text_file(&path) {
            tracing::debug!("No text reader for {}", path.display());
            return Ok(Extraction::empty());
        }

        if metadata.len() > self.max_file_bytes {
            return Err(ExtractError::InvalidRequest(format!(
                "file too large ({} bytes): {}",
                metadata.len(),
                external_file_id
            )));
        }

        let bytes = tokio::fs::read(&path).await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        if text.trim().is_empty() {
            return Ok(Extraction::empty());
        }

        Ok(Extraction::found(text, PLAIN_TEXT_METHOD))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn adapter_with(files: &[(&str, &str)]) -> (TempDir, LocalFileAdapter) {
        let dir = TempDir::new().unwrap();
        for (name, contents) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(path, contents).unwrap();
        }
        let adapter = LocalFileAdapter::new(dir.path());
        (dir, adapter)
    }

    #[tokio::test]
    async fn test_reads_text_file() {
        let (_dir, adapter) = adapter_with(&[("notes/readme.md", "# Title\nbody")]);
        let result = adapter.extract("notes/readme.md").await.unwrap();
        assert_eq!(result, Extraction::found("# Title\nbody", PLAIN_TEXT_METHOD));
    }

    #[tokio::test]
    async fn test_unsupported_format_yields_no_text() {
        let (_dir, adapter) = adapter_with(&[("scan.pdf", "%PDF-1.4 binary")]);
        let result = adapter.extract("scan.pdf").await.unwrap();
        assert!(!result.has_text());
    }

    #[tokio::test]
    async fn test_blank_file_yields_no_text() {
        let (_dir, adapter) = adapter_with(&[("blank.txt", "  \n ")]);
        assert!(!adapter.extract("blank.txt").await.unwrap().has_text());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let (_dir, adapter) = adapter_with(&[]);
        let result = adapter.extract("nope.txt").await;
        assert!(matches!(result, Err(ExtractError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let (_dir, adapter) = adapter_with(&[]);
        assert!(matches!(
            adapter.extract("../secret.txt").await,
            Err(ExtractError::InvalidRequest(_))
        ));
        assert!(matches!(
            adapter.extract("/etc/passwd").await,
            Err(ExtractError::InvalidRequest(_))
        ));
        assert!(matches!(adapter.extract("").await, Err(ExtractError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_size_limit() {
        let (_dir, adapter) = adapter_with(&[("big.txt", "0123456789")]);
        let adapter = adapter.with_max_file_bytes(4);
        assert!(matches!(
            adapter.extract("big.txt").await,
            Err(ExtractError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_directory_is_not_a_file() {
        let (dir, adapter) = adapter_with(&[]);
        std::fs::create_dir_all(dir.path().join("folder")).unwrap();
        assert!(matches!(
            adapter.extract("folder").await,
            Err(ExtractError::InvalidRequest(_))
        ));
    }
}
