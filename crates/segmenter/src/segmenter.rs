use crate::calls::extract_calls;
use crate::config::SegmenterConfig;
use crate::error::Result;
use crate::language::Language;
use crate::patterns::{is_comment_line, match_scope, match_unit_start, UnitStart};
use crate::types::{LineRange, SourceUnit, UnitDraft};
use std::path::Path;

/// Splits file text into method-level [`SourceUnit`]s
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmenterConfig,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self {
            config: SegmenterConfig::default(),
        }
    }
}

/// Scope entry on the indentation stack
struct OpenScope {
    indent: usize,
    name: String,
}

impl Segmenter {
    /// Create a segmenter with validated configuration
    pub fn new(config: SegmenterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Read and segment a file; `file_path` is the path recorded in unit ids
    pub fn segment_file(
        &self,
        path: impl AsRef<Path>,
        file_path: &str,
        language: Language,
    ) -> Result<Vec<SourceUnit>> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(self.segment(&text, file_path, language))
    }

    /// Segment text into an ordered, non-overlapping list of units.
    ///
    /// Lines inside a unit are never inspected for further starts, so nested
    /// definitions stay part of their enclosing unit's body.
    pub fn segment(&self, text: &str, file_path: &str, language: Language) -> Vec<SourceUnit> {
        let lines: Vec<&str> = text.lines().collect();
        let mut scopes: Vec<OpenScope> = Vec::new();
        let mut units = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];
            if line.trim().is_empty() || is_comment_line(language, line) {
                i += 1;
                continue;
            }

            let indent = indent_width(line);
            close_scopes(&mut scopes, language, line, indent);

            let Some(start) = match_unit_start(language, line) else {
                if let Some(name) = match_scope(language, line) {
                    if !(language.uses_braces() && closes_on_same_line(line)) {
                        scopes.push(OpenScope { indent, name });
                    }
                } else if looks_like_definition(language, line) {
                    log::debug!(
                        "{}:{}: definition-like line not recognized as a unit",
                        file_path,
                        i + 1
                    );
                }
                i += 1;
                continue;
            };

            let scope = start
                .scope_hint
                .clone()
                .or_else(|| scopes.last().map(|scope| scope.name.clone()));

            if is_constructor(language, &start, scope.as_deref()) {
                i += 1;
                continue;
            }

            let end = self.unit_end(&lines, i, language);
            let body_text = lines[i..end].join("\n");
            let calls = extract_calls(
                &body_text,
                &start.name,
                language,
                self.config.skip_private_calls,
            );

            let draft = UnitDraft {
                file_path: file_path.to_string(),
                language,
                enclosing_scope: scope,
                name: start.name,
                params: start.params,
                line_range: LineRange { start: i, end },
                body_text,
            };
            match SourceUnit::from_draft(draft) {
                Ok(unit) => units.push(unit.with_calls_out(calls)),
                Err(e) => log::debug!("{}:{}: dropped unit: {e}", file_path, i + 1),
            }

            i = end;
        }

        units
    }

    /// Exclusive end index of the unit starting at `start`
    fn unit_end(&self, lines: &[&str], start: usize, language: Language) -> usize {
        if self.config.brace_matching && language.uses_braces() {
            if let Some(end) = brace_end(lines, start, language, self.config.brace_lookahead) {
                return end;
            }
            log::debug!(
                "line {}: braces did not balance, using indentation",
                start + 1
            );
        }
        indentation_end(lines, start)
    }
}

fn indent_width(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Pop scopes left by `line`.
///
/// Indentation languages pop every scope at or deeper than the line. Brace languages
/// only pop on a leading `}`: deeper scopes first, then one scope at the same indent,
/// so unindented namespace bodies keep their scope.
fn close_scopes(scopes: &mut Vec<OpenScope>, language: Language, line: &str, indent: usize) {
    if !language.uses_braces() {
        while scopes.last().is_some_and(|scope| scope.indent >= indent) {
            scopes.pop();
        }
        return;
    }

    if !line.trim_start().starts_with('}') {
        return;
    }
    while scopes.last().is_some_and(|scope| scope.indent > indent) {
        scopes.pop();
    }
    if scopes.last().is_some_and(|scope| scope.indent == indent) {
        scopes.pop();
    }
}

fn closes_on_same_line(line: &str) -> bool {
    let opens = line.matches('{').count();
    opens > 0 && opens == line.matches('}').count()
}

fn is_constructor(language: Language, start: &UnitStart, scope: Option<&str>) -> bool {
    matches!(language, Language::Java | Language::Cpp) && scope == Some(start.name.as_str())
}

fn looks_like_definition(language: Language, line: &str) -> bool {
    let trimmed = line.trim_start();
    let keyword = match language {
        Language::Python => "def ",
        Language::Go => "func ",
        Language::Rust => "fn ",
        Language::JavaScript | Language::TypeScript => "function ",
        Language::Java | Language::Cpp => return false,
    };
    trimmed.starts_with(keyword) || trimmed.starts_with(&format!("async {keyword}"))
}

/// First non-blank line at indentation ≤ the start line's, or end of file
fn indentation_end(lines: &[&str], start: usize) -> usize {
    let base = indent_width(lines[start]);
    lines
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, line)| !line.trim().is_empty() && indent_width(line) <= base)
        .map_or(lines.len(), |(j, _)| j)
}

/// Line after the brace that closes the first `{` opened within `lookahead` lines of
/// `start`. `None` when no brace opens in time, a stray `}` appears first, or the file ends.
fn brace_end(lines: &[&str], start: usize, language: Language, lookahead: usize) -> Option<usize> {
    let mut depth: i64 = 0;
    let mut opened = false;

    for (j, line) in lines.iter().enumerate().skip(start) {
        if !opened && j > start + lookahead {
            return None;
        }

        let chars: Vec<char> = line.chars().collect();
        let mut quote: Option<char> = None;
        let mut k = 0;
        while k < chars.len() {
            let c = chars[k];
            if let Some(q) = quote {
                if c == '\\' {
                    k += 2;
                    continue;
                }
                if c == q {
                    quote = None;
                }
                k += 1;
                continue;
            }

            match c {
                '/' if chars.get(k + 1) == Some(&'/') => break,
                '"' | '`' => quote = Some(c),
                '\'' if language.single_quote_strings() => quote = Some(c),
                '\'' => k += char_literal_len(&chars[k..]).saturating_sub(1),
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => {
                    depth -= 1;
                    if depth < 0 {
                        return None;
                    }
                    if opened && depth == 0 {
                        return Some(j + 1);
                    }
                }
                _ => {}
            }
            k += 1;
        }
    }

    None
}

/// Length of a Rust char literal at the head of `chars` (`'x'`, `'\n'`, `'\u{7b}'`);
/// 1 for a lifetime tick.
fn char_literal_len(chars: &[char]) -> usize {
    match chars {
        ['\'', '\\', rest @ ..] => rest
            .iter()
            .take(10)
            .position(|&c| c == '\'')
            .map_or(1, |pos| pos + 3),
        ['\'', _, '\'', ..] => 3,
        _ => 1,
    }
}
