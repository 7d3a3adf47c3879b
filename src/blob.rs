use std::collections::HashMap;

use opendal::{ErrorKind, Operator, Scheme};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::FileRef;

/// Namespaces blobs are filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobArea {
    Documents,
    Profiles,
}

impl BlobArea {
    fn prefix(&self) -> &'static str {
        match self {
            BlobArea::Documents => "documents",
            BlobArea::Profiles => "profiles",
        }
    }
}

/// An uploaded file that has not been stored yet.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Blob store collaborator. The core only keeps the returned [`FileRef`]s.
#[derive(Clone)]
pub struct Blobs {
    op: Operator,
}

impl Blobs {
    pub fn new(op: Operator) -> Self {
        Self { op }
    }

    /// Volatile store, used by tests and demo runs.
    pub fn memory() -> AppResult<Self> {
        let op = Operator::via_map(Scheme::Memory, HashMap::new())?;
        Ok(Self::new(op))
    }

    pub fn operator(&self) -> &Operator {
        &self.op
    }

    pub async fn store(&self, area: BlobArea, owner_id: Uuid, upload: Upload) -> AppResult<FileRef> {
        let file_name = sanitize_file_name(&upload.file_name);
        let path = format!("{}/{}/{}-{}", area.prefix(), owner_id, Uuid::new_v4(), file_name);
        let size = upload.bytes.len() as i64;

        info!(
            file_name = %upload.file_name,
            file_size = size,
            stored_key = %path,
            "Saving file via OpenDAL"
        );
        self.op.write(&path, upload.bytes).await?;

        Ok(FileRef {
            path,
            file_name: upload.file_name,
            mime_type: upload.mime_type,
            size,
        })
    }

    pub async fn read(&self, file: &FileRef) -> AppResult<Vec<u8>> {
        match self.op.read(&file.path).await {
            Ok(buffer) => Ok(buffer.to_vec()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(AppError::not_found(format!(
                "file {} is missing from storage",
                file.file_name
            ))),
            Err(e) => Err(AppError::Storage(e)),
        }
    }

    pub async fn delete(&self, path: &str) -> AppResult<()> {
        debug!(file_path = %path, "Deleting file from storage");
        self.op.delete(path).await?;
        Ok(())
    }

    pub async fn exists(&self, path: &str) -> AppResult<bool> {
        match self.op.stat(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::Storage(e)),
        }
    }
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "upload.bin".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_made_key_safe() {
        assert_eq!(sanitize_file_name("seguro 2024.pdf"), "seguro_2024.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_file_name(".."), "upload.bin");
        assert_eq!(sanitize_file_name(""), "upload.bin");
    }

    #[tokio::test]
    async fn stored_blobs_can_be_read_and_released() {
        let blobs = Blobs::memory().expect("memory operator");
        let owner = Uuid::new_v4();
        let file = blobs
            .store(
                BlobArea::Documents,
                owner,
                Upload {
                    file_name: "livrete.pdf".to_string(),
                    mime_type: Some("application/pdf".to_string()),
                    bytes: b"%PDF-1.4".to_vec(),
                },
            )
            .await
            .expect("stored");

        assert!(file.path.starts_with(&format!("documents/{owner}/")));
        assert_eq!(file.size, 8);
        assert_eq!(blobs.read(&file).await.expect("readable"), b"%PDF-1.4");

        blobs.delete(&file.path).await.expect("deleted");
        assert!(!blobs.exists(&file.path).await.expect("stat works"));
        assert!(matches!(blobs.read(&file).await, Err(AppError::NotFound(_))));
    }
}
