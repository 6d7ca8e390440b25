//! Working-directory file store.
//!
//! Holds exactly one upload batch: raw files as uploaded, plus a `<stem>.txt`
//! sibling for every PDF/DOCX whose text could be extracted.
//!
//! Failure policy differs on purpose between the two operations:
//! [`FileStore::clear`] and the write half of [`FileStore::save`] propagate
//! their errors and abort the cycle, while a document that cannot be parsed is
//! logged and kept as a raw file without a text sibling, so one bad document
//! does not reject the whole batch.

use base64::Engine;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::extract::{self, DocumentKind};
use crate::models::UploadedDocument;

/// Separator between the metadata and payload of a data URL.
const BASE64_MARKER: &str = ";base64,";

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the working directory if it does not exist yet.
    pub fn ensure_root(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            PipelineError::io(
                format!("failed to create working directory {}", self.root.display()),
                e,
            )
        })
    }

    /// Removes every regular file in the working directory. Subdirectories are
    /// left alone. Returns the number of files removed.
    pub fn clear(&self) -> Result<usize> {
        self.ensure_root()?;
        let entries = std::fs::read_dir(&self.root).map_err(|e| {
            PipelineError::io(format!("failed to list {}", self.root.display()), e)
        })?;

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| {
                PipelineError::io(format!("failed to list {}", self.root.display()), e)
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            std::fs::remove_file(&path).map_err(|e| {
                PipelineError::io(format!("failed to remove {}", path.display()), e)
            })?;
            removed += 1;
        }
        tracing::debug!(removed, dir = %self.root.display(), "cleared working directory");
        Ok(removed)
    }

    /// Decodes a data-URL payload and writes it as `name`. PDFs and DOCX files
    /// additionally get a `.txt` sibling when text extraction succeeds.
    pub fn save(&self, name: &str, content: &str) -> Result<UploadedDocument> {
        validate_name(name)?;
        let bytes = decode_data_url(name, content)?;

        let path = self.root.join(name);
        std::fs::write(&path, &bytes)
            .map_err(|e| PipelineError::io(format!("failed to write {}", path.display()), e))?;

        let derived_text = match DocumentKind::from_file_name(name) {
            Some(kind) => self.write_text_sibling(name, &bytes, kind)?,
            None => None,
        };

        Ok(UploadedDocument {
            name: name.to_string(),
            size_bytes: bytes.len(),
            derived_text,
        })
    }

    fn write_text_sibling(
        &self,
        name: &str,
        bytes: &[u8],
        kind: DocumentKind,
    ) -> Result<Option<String>> {
        let text = match extract::extract_text(bytes, kind) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(file = name, error = %e, "text extraction failed; keeping raw file only");
                return Ok(None);
            }
        };
        if text.is_empty() {
            tracing::debug!(file = name, "document has no extractable text");
            return Ok(None);
        }

        let sibling = self.root.join(text_sibling_name(name));
        std::fs::write(&sibling, text.as_bytes())
            .map_err(|e| PipelineError::io(format!("failed to write {}", sibling.display()), e))?;
        Ok(Some(text))
    }
}

/// `report.PDF` → `report.txt`.
pub fn text_sibling_name(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    format!("{}.txt", stem)
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(PipelineError::io(
            format!("invalid file name '{}'", name),
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "file names must not contain path components",
            ),
        ));
    }
    Ok(())
}

/// Decodes `<metadata>;base64,<data>`. ASCII whitespace inside the data is ignored.
pub fn decode_data_url(name: &str, content: &str) -> Result<Vec<u8>> {
    let (_, data) = content
        .split_once(BASE64_MARKER)
        .ok_or_else(|| PipelineError::decode(name, "missing ';base64,' separator"))?;
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| PipelineError::decode(name, format!("invalid base64 data: {}", e)))
}

/// Builds a data URL for `bytes`, the inverse of [`decode_data_url`].
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{}{}{}",
        mime,
        BASE64_MARKER,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
