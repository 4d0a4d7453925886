use crate::error::Result;
use crate::provider::{Annotator, Classifier};
use async_trait::async_trait;
use madl_segmenter::{Annotation, Classification, SourceUnit, VerdictSource};

/// Body substrings that mark a unit as side-effecting
pub const SIDE_EFFECT_KEYWORDS: &[&str] = &[
    "open(", "write", "delete", "drop", "insert", "update", "request.", "http", "socket",
    "global ", "nonlocal",
];

/// Receiver parameters that do not count as inputs
const RECEIVERS: &[&str] = &["self", "cls", "this", "&self", "&mut self", "mut self"];

const HEURISTIC_CONFIDENCE: f32 = 0.5;
const SNIPPET_CHARS: usize = 300;

/// Local keyword/side-effect scan used whenever the model is unavailable
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    /// Reusable iff the body has no side-effect keyword and the unit takes at least
    /// one non-receiver parameter
    pub fn verdict(&self, unit: &SourceUnit, source: VerdictSource) -> Classification {
        let body = unit.body_text.to_lowercase();
        let has_side_effects = SIDE_EFFECT_KEYWORDS.iter().any(|kw| body.contains(kw));
        let reusable = !has_side_effects && has_inputs(unit.params());

        let reason = if reusable {
            "Appears stateless with parameters"
        } else {
            "Has side effects or no parameters"
        };
        Classification::new(reusable, reason, HEURISTIC_CONFIDENCE, source)
    }
}

#[async_trait]
impl Classifier for HeuristicClassifier {
    async fn classify(&self, unit: &SourceUnit) -> Result<Classification> {
        Ok(self.verdict(unit, VerdictSource::Heuristic))
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

/// Template annotation used whenever the model is unavailable
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicAnnotator;

impl HeuristicAnnotator {
    pub fn annotation(&self, unit: &SourceUnit) -> Annotation {
        Annotation {
            method_name: unit.name.clone(),
            class_name: unit.enclosing_scope.clone().unwrap_or_default(),
            intent: format!("Auto-generated intent for {}.", unit.name),
            description: format!("Auto-generated description for {}.", unit.name),
            keywords: name_keywords(&unit.name),
            parameters: unit.signature.clone(),
            code_snippet: truncate_chars(&unit.body_text, SNIPPET_CHARS),
        }
    }
}

#[async_trait]
impl Annotator for HeuristicAnnotator {
    async fn annotate(&self, unit: &SourceUnit) -> Result<Annotation> {
        Ok(self.annotation(unit))
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

fn has_inputs(params: &str) -> bool {
    params
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .any(|p| !RECEIVERS.contains(&p))
}

/// Lower-case words of a snake_case / camelCase name, de-duplicated in order
pub fn name_keywords(name: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in name.chars() {
        if c == '_' || c == '$' || c.is_ascii_digit() {
            flush_word(&mut current, &mut words);
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower {
            flush_word(&mut current, &mut words);
        }
        prev_lower = c.is_lowercase();
        current.extend(c.to_lowercase());
    }
    flush_word(&mut current, &mut words);
    words
}

fn flush_word(current: &mut String, words: &mut Vec<String>) {
    if !current.is_empty() {
        let word = std::mem::take(current);
        if !words.contains(&word) {
            words.push(word);
        }
    }
}

/// First `max` characters of `text` (never splits a character)
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use madl_segmenter::{Language, Segmenter};
    use pretty_assertions::assert_eq;

    fn unit(code: &str, language: Language) -> SourceUnit {
        Segmenter::default()
            .segment(code, "h.src", language)
            .into_iter()
            .next()
            .unwrap()
    }

    #[test]
    fn pure_function_with_params_is_reusable() {
        let u = unit("def add(a, b):\n    return a + b\n", Language::Python);
        let verdict = HeuristicClassifier.verdict(&u, VerdictSource::Heuristic);
        assert!(verdict.reusable);
        assert_eq!(verdict.reason, "Appears stateless with parameters");
        assert_eq!(verdict.confidence, 0.5);
    }

    #[test]
    fn side_effects_or_receiver_only_are_not_reusable() {
        let writes = unit("def save(path, data):\n    open(path).write(data)\n", Language::Python);
        assert!(!HeuristicClassifier.verdict(&writes, VerdictSource::Heuristic).reusable);

        let receiver_only = unit("class A:\n    def size(self):\n        return 1\n", Language::Python);
        assert!(!HeuristicClassifier.verdict(&receiver_only, VerdictSource::Heuristic).reusable);

        let single_param = unit("fn square(x: i32) -> i32 {\n    x * x\n}\n", Language::Rust);
        assert!(HeuristicClassifier.verdict(&single_param, VerdictSource::Heuristic).reusable);
    }

    #[test]
    fn template_annotation_fields() {
        let u = unit("class Cart:\n    def totalPrice_v2(self, items):\n        return sum(items)\n", Language::Python);
        let a = HeuristicAnnotator.annotation(&u);
        assert_eq!(a.method_name, "totalPrice_v2");
        assert_eq!(a.class_name, "Cart");
        assert_eq!(a.intent, "Auto-generated intent for totalPrice_v2.");
        assert_eq!(a.keywords, vec!["total", "price", "v"]);
        assert_eq!(a.parameters, "totalPrice_v2(self, items)");
        assert_eq!(a.code_snippet, u.body_text);
    }

    #[test]
    fn snippet_is_truncated_on_char_boundary() {
        let text = "é".repeat(400);
        assert_eq!(truncate_chars(&text, 300).chars().count(), 300);
        assert_eq!(truncate_chars("short", 300), "short");
    }

    #[test]
    fn keywords_split_camel_and_snake() {
        assert_eq!(name_keywords("parseHTTPRequest"), vec!["parse", "httprequest"]);
        assert_eq!(name_keywords("load_user_user"), vec!["load", "user"]);
    }
}
