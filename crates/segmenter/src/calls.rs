use crate::language::Language;
use crate::patterns::is_reserved;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn call_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("static pattern is valid"))
}

/// Extract `identifier(` tokens from a unit body.
///
/// Drops the unit's own name, reserved words of `language` and (when `skip_private`) names with a
/// leading underscore. Result is de-duplicated in first-occurrence order.
pub fn extract_calls(
    body: &str,
    own_name: &str,
    language: Language,
    skip_private: bool,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut calls = Vec::new();

    for caps in call_token().captures_iter(body) {
        let Some(token) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        if token == own_name || is_reserved(language, token) {
            continue;
        }
        if skip_private && token.starts_with('_') {
            continue;
        }
        if seen.insert(token) {
            calls.push(token.to_string());
        }
    }

    calls
}
