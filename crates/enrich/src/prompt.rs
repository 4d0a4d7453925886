use crate::error::{EnrichError, Result};
use crate::heuristic::truncate_chars;
use madl_segmenter::{Annotation, Classification, SourceUnit, VerdictSource};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

const PROMPT_SOURCE_CHARS: usize = 1000;
const PROMPT_NEIGHBOURS: usize = 5;

pub fn reusability_prompt(unit: &SourceUnit) -> String {
    let calls: Vec<&str> = unit
        .calls_out
        .iter()
        .take(PROMPT_NEIGHBOURS)
        .map(String::as_str)
        .collect();
    let called_by: Vec<&str> = unit
        .calls_in()
        .iter()
        .take(PROMPT_NEIGHBOURS)
        .map(|id| id.as_str())
        .collect();

    format!(
        r#"Analyze if this method is reusable across different contexts.

Method: {name}
Signature: {signature}
Language: {language}
Source Code:
```
{source}
```

Calls: {calls}
Called by: {called_by}

Consider these factors:
1. Does it have side effects (file I/O, network, database)?
2. Is it parameterized and context-independent?
3. Is it stateless or has minimal state dependencies?
4. Can it be used in different scenarios without modification?
5. Does it have clear inputs and outputs?

Respond with ONLY valid JSON (no markdown, no explanation):
{{
  "reusable": true or false,
  "reusability_reason": "brief explanation in one sentence",
  "confidence": 0.0 to 1.0
}}"#,
        name = unit.name,
        signature = unit.signature,
        language = unit.language,
        source = truncate_chars(&unit.body_text, PROMPT_SOURCE_CHARS),
        calls = calls.join(", "),
        called_by = called_by.join(", "),
    )
}

pub fn annotation_prompt(unit: &SourceUnit) -> String {
    format!(
        r#"Generate a JSON object with EXACTLY these fields:

{{
    "method_name": "",
    "class_name": "",
    "intent": "",
    "semantic_description": "",
    "keywords": [],
    "parameters": "",
    "method_code": ""
}}

Rules:
- Do NOT add extra fields
- Do NOT add agents, triggers, confidence or metadata
- Fill values based ONLY on the method

Respond with ONLY valid JSON.

Method Name: {name}
Class Name: {class}
Parameters: {signature}
Method Code:
{source}
"#,
        name = unit.name,
        class = unit.enclosing_scope.as_deref().unwrap_or(""),
        signature = unit.signature,
        source = unit.body_text,
    )
}

fn fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").expect("static pattern is valid")
    })
}

/// Reply text with a surrounding Markdown code fence removed
pub fn strip_code_fence(reply: &str) -> &str {
    match fence().captures(reply).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => reply.trim(),
    }
}

#[derive(Deserialize)]
struct ReusabilityReply {
    reusable: bool,
    #[serde(default)]
    reusability_reason: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Decode a reusability reply; any shape mismatch is an error
pub fn parse_classification(reply: &str) -> Result<Classification> {
    let parsed: ReusabilityReply = serde_json::from_str(strip_code_fence(reply))
        .map_err(|e| EnrichError::malformed(format!("reusability reply: {e}")))?;
    Ok(Classification::new(
        parsed.reusable,
        parsed
            .reusability_reason
            .unwrap_or_else(|| "No reason provided".to_string()),
        parsed.confidence.unwrap_or(0.5),
        VerdictSource::Model,
    ))
}

/// Decode an annotation reply; missing fields default to empty
pub fn parse_annotation(reply: &str) -> Result<Annotation> {
    let annotation: Annotation = serde_json::from_str(strip_code_fence(reply))
        .map_err(|e| EnrichError::malformed(format!("annotation reply: {e}")))?;
    if annotation.method_name.is_empty() && annotation.intent.is_empty() {
        return Err(EnrichError::malformed("annotation reply has no content"));
    }
    Ok(annotation)
}
