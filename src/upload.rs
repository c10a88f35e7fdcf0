// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! File upload persistence.
//!
//! The blob store is external to the core: this module accepts the bytes,
//! enforces the content-type allow-list, writes the blob under the upload
//! directory, and hands back the reference URL the rest of the system uses.

use crate::config::UploadConfig;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Upload error types.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request carried no file field.
    #[error("no file in request")]
    MissingFile,

    /// The declared content type is not on the allow-list.
    #[error("content type {actual:?} not allowed")]
    DisallowedType { actual: Option<String> },

    /// Writing the blob failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Writes uploaded blobs and mints their public URLs.
pub struct UploadStore {
    dir: PathBuf,
    public_base: String,
    allowed_types: Vec<String>,
}

impl UploadStore {
    /// Create an upload store; the directory is created if absent.
    pub async fn new(config: &UploadConfig) -> Result<Self, UploadError> {
        let dir = PathBuf::from(&config.dir);
        tokio::fs::create_dir_all(&dir).await?;

        Ok(Self {
            dir,
            public_base: config.public_base.trim_end_matches('/').to_string(),
            allowed_types: config
                .allowed_types
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
        })
    }

    /// Directory blobs are written to.
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Public URL prefix blobs are served under.
    pub fn public_base(&self) -> &str {
        &self.public_base
    }

    /// Check a declared content type against the allow-list.
    pub fn check_content_type(&self, content_type: Option<&str>) -> Result<(), UploadError> {
        // Media type only; parameters such as charset are ignored.
        let media_type = content_type
            .map(|s| s.split(';').next().unwrap_or(s).trim().to_lowercase());

        match media_type {
            Some(ref actual) if self.allowed_types.contains(actual) => {
                debug!(content_type = %actual, "Content type allowed");
                Ok(())
            }
            other => Err(UploadError::DisallowedType { actual: other }),
        }
    }

    /// Persist a blob and return its public URL.
    pub async fn save(
        &self,
        file_name: Option<&str>,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, UploadError> {
        self.check_content_type(content_type)?;

        let stored_name = format!(
            "{}_{}",
            Uuid::new_v4(),
            sanitize_file_name(file_name.unwrap_or("upload"))
        );
        let path = self.dir.join(&stored_name);
        tokio::fs::write(&path, bytes).await?;

        info!(
            name = %stored_name,
            size = bytes.len(),
            "Stored uploaded file"
        );

        Ok(format!("{}/{}", self.public_base, stored_name))
    }
}

/// Strip path separators and shell-hostile characters from a client-supplied name.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
