use crate::error::Result;
use madl_segmenter::{Annotation, Language, LineRange, SourceUnit, UnitId, VerdictSource};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One unit as persisted in the run manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub id: UnitId,
    pub file: String,
    pub language: Language,
    pub scope: Option<String>,
    pub name: String,
    pub signature: String,
    pub line_range: LineRange,
    pub body: String,
    pub calls_out: Vec<String>,
    pub calls_in: Vec<UnitId>,
    pub reusable: bool,
    pub reason: Option<String>,
    pub confidence: Option<f32>,
    pub verdict_source: Option<VerdictSource>,
    pub annotation: Option<Annotation>,
    pub index_id: Option<String>,
}

impl From<&SourceUnit> for ManifestRecord {
    fn from(unit: &SourceUnit) -> Self {
        let classification = unit.classification.as_ref();
        Self {
            id: unit.id.clone(),
            file: unit.file_path.clone(),
            language: unit.language,
            scope: unit.enclosing_scope.clone(),
            name: unit.name.clone(),
            signature: unit.signature.clone(),
            line_range: unit.line_range,
            body: unit.body_text.clone(),
            calls_out: unit.calls_out.clone(),
            calls_in: unit.calls_in().to_vec(),
            reusable: unit.is_reusable(),
            reason: classification.map(|c| c.reason.clone()),
            confidence: classification.map(|c| c.confidence),
            verdict_source: classification.map(|c| c.source),
            annotation: unit.annotation.clone(),
            index_id: unit.index_id.clone(),
        }
    }
}

/// Write records as pretty JSON through a temp file + rename
pub async fn write_manifest(path: &Path, records: &[ManifestRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec_pretty(records)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

pub async fn read_manifest(path: &Path) -> Result<Vec<ManifestRecord>> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
