//! Document storage.
//!
//! The lifecycle and catalog only see the [`DocumentStore`] trait. The shipped
//! implementation, [`LocalDocumentStore`], writes files under a storage directory that
//! `main.rs` also serves read-only at `/files`.

pub mod uploads;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::PathBuf;
use taxdesk_common::model::document::StoredDocument;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Route prefix under which stored documents are served.
pub const PUBLIC_PREFIX: &str = "/files";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentCategory {
    Templates,
    Submissions,
}

impl DocumentCategory {
    pub fn folder(&self) -> &'static str {
        match self {
            DocumentCategory::Templates => "tax-templates",
            DocumentCategory::Submissions => "tax-submissions",
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write document: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not allocate a unique name for '{0}'")]
    NameExhausted(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persists `bytes` and returns where they can be fetched from.
    async fn store(
        &self,
        category: DocumentCategory,
        suggested_name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredDocument, StorageError>;
}

/// Filesystem-backed store. Objects are never overwritten.
pub struct LocalDocumentStore {
    root: PathBuf,
    public_url: String,
}

impl LocalDocumentStore {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }
}

const MAX_NAME_ATTEMPTS: u32 = 16;

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn store(
        &self,
        category: DocumentCategory,
        suggested_name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredDocument, StorageError> {
        let folder = self.root.join(category.folder());
        tokio::fs::create_dir_all(&folder).await?;

        let base = public_id(suggested_name, Utc::now());
        let extension = extension_for(suggested_name, content_type);

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let id = if attempt == 0 {
                base.clone()
            } else {
                format!("{}-{}", base, attempt)
            };
            let file_name = format!("{}.{}", id, extension);
            let path = folder.join(&file_name);

            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            if let Err(e) = write_all(&mut file, bytes).await {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(e.into());
            }

            log::debug!(
                "Stored {} bytes as {}/{}",
                bytes.len(),
                category.folder(),
                file_name
            );
            return Ok(StoredDocument {
                url: format!(
                    "{}{}/{}/{}",
                    self.public_url,
                    PUBLIC_PREFIX,
                    category.folder(),
                    file_name
                ),
                reference_id: format!("{}/{}", category.folder(), id),
            });
        }

        Err(StorageError::NameExhausted(base))
    }
}

async fn write_all(file: &mut tokio::fs::File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await
}

/// Store-side name for an upload: the original name up to its first `.`, made safe for
/// a path, followed by the upload time in milliseconds.
pub fn public_id(original_filename: &str, at: DateTime<Utc>) -> String {
    let file_name = original_filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let mut stem = String::new();
    for ch in file_name.split('.').next().unwrap_or_default().chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            stem.push(ch);
        } else if !stem.ends_with('_') {
            stem.push('_');
        }
    }
    let stem = stem.trim_matches('_');
    let stem = if stem.is_empty() { "document" } else { stem };
    format!("{}-{}", stem, at.timestamp_millis())
}

/// Extension for the stored object. The uploaded name's extension wins when it is one
/// the declared content type is known by, so `.docx` stays `.docx`.
fn extension_for(original_filename: &str, content_type: &str) -> String {
    let known = mime_guess::get_mime_extensions_str(content_type).unwrap_or(&[]);
    let uploaded = original_filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match uploaded {
        Some(ext) if known.contains(&ext.as_str()) => ext,
        _ => known.first().map(|e| e.to_string()).unwrap_or_else(|| "bin".to_string()),
    }
}
