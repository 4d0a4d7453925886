use crate::error::Result;
use crate::heuristic::truncate_chars;
use crate::provider::IndexSink;
use async_trait::async_trait;
use madl_segmenter::{SourceUnit, UnitId};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const EMBEDDING_SOURCE_CHARS: usize = 300;

/// Stable index id: `vec_` + first 16 hex chars of SHA-256(unit id)
pub fn index_id(unit_id: &UnitId) -> String {
    let digest = Sha256::digest(unit_id.as_str().as_bytes());
    let hex: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    format!("vec_{hex}")
}

/// Text representation of a unit used for embedding
pub fn embedding_text(unit: &SourceUnit) -> String {
    let annotation = unit.annotation.clone().unwrap_or_default();
    let reason = unit
        .classification
        .as_ref()
        .map(|c| c.reason.as_str())
        .unwrap_or("");

    format!(
        "Method: {}\nClass: {}\nLanguage: {}\nSignature: {}\nIntent: {}\nDescription: {}\nKeywords: {}\nReusability: {}\nSource: {}\n",
        unit.name,
        unit.enclosing_scope.as_deref().unwrap_or(""),
        unit.language,
        unit.signature,
        annotation.intent,
        annotation.description,
        annotation.keywords.join(", "),
        reason,
        truncate_chars(&unit.body_text, EMBEDDING_SOURCE_CHARS),
    )
}

/// Discards documents; still hands out stable ids
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl IndexSink for NullSink {
    async fn ingest(&self, unit: &SourceUnit) -> Result<String> {
        Ok(index_id(&unit.id))
    }

    fn name(&self) -> &str {
        "null"
    }
}

#[derive(Serialize)]
struct IndexDocument<'a> {
    id: &'a str,
    unit_id: &'a UnitId,
    file: &'a str,
    text: String,
}

/// Appends one JSON document per unit to a file
pub struct JsonlSink {
    path: PathBuf,
    file: Mutex<tokio::fs::File>,
}

impl JsonlSink {
    /// Open `path` for appending, creating parent directories
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl IndexSink for JsonlSink {
    async fn ingest(&self, unit: &SourceUnit) -> Result<String> {
        let id = index_id(&unit.id);
        let document = IndexDocument {
            id: &id,
            unit_id: &unit.id,
            file: &unit.file_path,
            text: embedding_text(unit),
        };
        let mut line = serde_json::to_vec(&document)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(id)
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}
