//! Multipart form intake and the content-type allow-lists for uploaded documents.

use crate::error::ApiError;
use actix_multipart::Multipart;
use futures_util::StreamExt;
use std::collections::HashMap;

/// Longest accepted plain-text form field.
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

const OFFICE_AND_PDF: [&str; 5] = [
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/pdf",
];

const IMAGES: [&str; 2] = ["image/jpeg", "image/png"];

/// Which declared content types a given upload slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowList {
    /// Spreadsheets, word-processing documents and PDF. Used for templates and the
    /// main file of a submission.
    Documents,
    /// Everything in `Documents` plus JPEG and PNG scans.
    DocumentsAndImages,
}

impl AllowList {
    pub fn permits(&self, content_type: &str) -> bool {
        let content_type = content_type.trim().to_ascii_lowercase();
        let content_type = content_type.as_str();
        match self {
            AllowList::Documents => OFFICE_AND_PDF.contains(&content_type),
            AllowList::DocumentsAndImages => {
                OFFICE_AND_PDF.contains(&content_type) || IMAGES.contains(&content_type)
            }
        }
    }

    pub fn rejection_message(&self) -> &'static str {
        match self {
            AllowList::Documents => {
                "Unsupported file format. Please upload Excel, Word, or PDF files."
            }
            AllowList::DocumentsAndImages => {
                "Unsupported file format. Please upload Excel, Word, PDF, or image files."
            }
        }
    }
}

/// A file part read fully into memory.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    /// MIME essence as declared by the client, e.g. `application/pdf`.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Rejects the file if it is larger than `limit` or its type is not on `allow`.
    pub fn check(&self, allow: AllowList, limit: usize) -> Result<(), ApiError> {
        if self.bytes.len() > limit {
            return Err(ApiError::FileTooLarge { limit });
        }
        if !allow.permits(&self.content_type) {
            return Err(ApiError::validation(allow.rejection_message()));
        }
        Ok(())
    }
}

/// Text fields and files of a `multipart/form-data` body, keyed by field name.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    /// Trimmed value of a text field, `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}

/// Drains a multipart payload.
///
/// A part carrying a filename is treated as a file; a file part with an empty filename
/// and no content is what browsers send for an untouched file input and is skipped.
/// Reading stops with `FileTooLarge` as soon as one file grows past `max_file_bytes`.
pub async fn read_multipart(
    mut payload: Multipart,
    max_file_bytes: usize,
) -> Result<MultipartForm, ApiError> {
    let mut form = MultipartForm::default();

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let (name, filename) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().map(str::to_string),
                cd.get_filename().map(str::to_string),
            ),
            None => (None, None),
        };
        let Some(name) = name else {
            continue;
        };

        match filename {
            Some(filename) => {
                let content_type = field
                    .content_type()
                    .map(|m| m.essence_str().to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                let mut bytes = Vec::new();
                while let Some(chunk) = field.next().await {
                    let chunk = chunk?;
                    if bytes.len() + chunk.len() > max_file_bytes {
                        return Err(ApiError::FileTooLarge {
                            limit: max_file_bytes,
                        });
                    }
                    bytes.extend_from_slice(&chunk);
                }

                if filename.trim().is_empty() && bytes.is_empty() {
                    continue;
                }
                form.files.insert(
                    name,
                    UploadedFile {
                        filename,
                        content_type,
                        bytes,
                    },
                );
            }
            None => {
                let mut bytes = Vec::new();
                while let Some(chunk) = field.next().await {
                    let chunk = chunk?;
                    if bytes.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
                        return Err(ApiError::validation(format!(
                            "Field '{}' is too long",
                            name
                        )));
                    }
                    bytes.extend_from_slice(&chunk);
                }
                let value = String::from_utf8(bytes).map_err(|_| {
                    ApiError::validation(format!("Field '{}' is not valid UTF-8", name))
                })?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}
