//! Input documents: the value type and folder collection.
//!
//! A [`Document`] owns its raw bytes once read; the pipeline never retains
//! it beyond a single analysis call. Folder collection mirrors a recursive
//! glob for `*.pdf`: unreadable files are skipped with a warning rather
//! than failing the scan, so one broken file does not hide the rest of a
//! directory tree.

use crate::error::AnalyzerError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// One input unit to be analyzed independently.
#[derive(Debug, Clone)]
pub struct Document {
    /// Display filename, used for the identity field and error reporting.
    pub name: String,
    /// Where the bytes came from, when they came from disk.
    pub source_path: Option<PathBuf>,
    /// Raw binary content.
    pub bytes: Vec<u8>,
}

impl Document {
    /// Build a document from in-memory bytes (e.g. an upload).
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            source_path: None,
            bytes,
        }
    }

    /// Read a document from disk, using the file name as display name.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AnalyzerError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| AnalyzerError::DocumentReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            source_path: Some(path.to_path_buf()),
            bytes,
        })
    }

    /// MIME type inferred from the display name's extension.
    pub fn mime_type(&self) -> &'static str {
        match Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("pdf") => "application/pdf",
            Some("txt") => "text/plain",
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            _ => "application/octet-stream",
        }
    }

    /// Extension used when staging the bytes to a temp file.
    pub(crate) fn staging_suffix(&self) -> String {
        match Path::new(&self.name).extension().and_then(|e| e.to_str()) {
            Some(ext) if !ext.is_empty() => format!(".{}", ext.to_ascii_lowercase()),
            _ => ".bin".to_string(),
        }
    }
}

/// Recursively collect every `*.pdf` under `folder`, in path order.
///
/// Files that cannot be read are skipped with a warning. Returns an empty
/// vector when the folder contains no PDFs.
pub fn collect_documents(folder: impl AsRef<Path>) -> Result<Vec<Document>, AnalyzerError> {
    let folder = folder.as_ref();

    if !folder.exists() {
        return Err(AnalyzerError::FolderNotFound {
            path: folder.to_path_buf(),
        });
    }
    if !folder.is_dir() {
        return Err(AnalyzerError::NotADirectory {
            path: folder.to_path_buf(),
        });
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(folder)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            continue;
        }

        match Document::from_path(path) {
            Ok(doc) => {
                debug!("Collected {} ({} bytes)", doc.name, doc.bytes.len());
                documents.push(doc);
            }
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
            }
        }
    }

    Ok(documents)
}
