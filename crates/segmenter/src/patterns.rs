//! Single-line lexical patterns for unit starts and scope declarations.
//!
//! Every pattern must match on one physical line; wrapped signatures are missed on purpose.

use crate::language::Language;
use regex::Regex;
use std::sync::OnceLock;

/// A line recognized as the start of a unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitStart {
    pub name: String,
    pub params: String,
    /// Scope named by the definition itself (Go receiver, `Type::name` in C++)
    pub scope_hint: Option<String>,
}

const PYTHON_RESERVED: &[&str] = &[
    "if", "elif", "else", "for", "while", "with", "try", "except", "finally", "return", "yield",
    "await", "lambda", "assert", "not", "and", "or", "in", "is", "del", "raise", "def", "class",
    "import", "from", "global", "nonlocal", "pass",
];

const JAVA_RESERVED: &[&str] = &[
    "if", "else", "for", "while", "do", "switch", "case", "catch", "try", "finally", "return",
    "new", "throw", "throws", "synchronized", "assert", "super", "this", "instanceof",
];

const JS_RESERVED: &[&str] = &[
    "if", "else", "for", "while", "do", "switch", "case", "catch", "try", "finally", "return",
    "new", "delete", "throw", "typeof", "void", "function", "class", "super", "this", "await",
    "yield", "import", "in", "instanceof", "of", "with",
];

const GO_RESERVED: &[&str] = &[
    "if", "else", "for", "switch", "case", "return", "go", "defer", "select", "func", "range",
    "map", "chan", "type", "struct", "interface",
];

const CPP_RESERVED: &[&str] = &[
    "if", "else", "for", "while", "do", "switch", "case", "catch", "try", "return", "new",
    "delete", "throw", "sizeof", "alignof", "alignas", "decltype", "typeid", "static_assert",
    "noexcept", "operator", "this", "co_await", "co_return", "co_yield",
];

const RUST_RESERVED: &[&str] = &[
    "if", "else", "for", "while", "loop", "match", "return", "fn", "let", "in", "as", "move",
    "unsafe", "where", "impl", "dyn", "ref", "mut", "async", "await",
];

/// Reserved words of `language` that can precede `(` but never name a unit or a call
pub(crate) fn is_reserved(language: Language, word: &str) -> bool {
    let reserved = match language {
        Language::Python => PYTHON_RESERVED,
        Language::Java => JAVA_RESERVED,
        Language::JavaScript | Language::TypeScript => JS_RESERVED,
        Language::Go => GO_RESERVED,
        Language::Cpp => CPP_RESERVED,
        Language::Rust => RUST_RESERVED,
    };
    reserved.contains(&word)
}

const JAVA_MODIFIERS: &[&str] = &[
    "public", "private", "protected", "static", "final", "abstract", "synchronized", "native",
    "default", "strictfp",
];

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern is valid"))
}

fn python_def() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"^\s*(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\((.*)\)\s*(?:->[^:]*)?:",
    )
}

fn python_class() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^\s*class\s+([A-Za-z_]\w*)")
}

fn java_method() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"^\s*(?:(?:public|private|protected|static|final|abstract|synchronized|native|default|strictfp)\s+)*(?:<[^>]*>\s+)?([\w.$]+(?:<[^()]*>)?(?:\[\])*)\s+([A-Za-z_$][\w$]*)\s*\(([^()]*)\)\s*(?:throws\s+[\w.$,\s]+)?\{",
    )
}

fn java_type() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"^\s*(?:(?:public|private|protected|static|final|abstract|sealed)\s+)*(?:class|interface|enum|record)\s+([A-Za-z_$][\w$]*)",
    )
}

fn js_function() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*\(([^()]*)\)",
    )
}

fn js_arrow() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?\(([^()]*)\)\s*(?::\s*[^=]+)?=>",
    )
}

fn js_method() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"^\s*(?:(?:public|private|protected|static|async|readonly|override|get|set)\s+)*\*?([A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*\(([^()]*)\)\s*(?::\s*[^{;]+)?\{\s*$",
    )
}

fn js_class() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)",
    )
}

fn go_func() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"^func\s+(?:\(\s*(?:[A-Za-z_]\w*\s+)?\*?\s*([A-Za-z_]\w*)(?:\[[^\]]*\])?\s*\)\s*)?([A-Za-z_]\w*)\s*(?:\[[^\]]*\])?\s*\(([^()]*)\)",
    )
}

fn cpp_function() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"^\s*(?:(?:static|inline|virtual|explicit|constexpr|friend|extern)\s+)*(?:const\s+)?[A-Za-z_][\w:<>,]*[\s*&]+((?:[A-Za-z_]\w*::)*~?[A-Za-z_]\w*)\s*\(([^()]*)\)\s*(?:const\s*)?(?:noexcept\s*)?(?:override\s*)?(?:final\s*)?\{?\s*$",
    )
}

fn cpp_scope() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^\s*(?:class|struct|namespace)\s+([A-Za-z_]\w*)")
}

fn rust_fn() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r#"^\s*(?:pub(?:\s*\([^)]*\))?\s+)?(?:default\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+([A-Za-z_]\w*)\s*(?:<.*?>)?\s*\((.*?)\)\s*(?:->|where|\{|$)"#,
    )
}

fn rust_scope() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"^\s*(?:pub(?:\s*\([^)]*\))?\s+)?(?:unsafe\s+)?(?:impl(?:\s*<[^>]*>)?\s+(?:[\w:<>, ]+\s+for\s+)?|trait\s+|mod\s+)([A-Za-z_]\w*)",
    )
}

fn capture(caps: &regex::Captures<'_>, idx: usize) -> String {
    caps.get(idx).map(|m| m.as_str().to_string()).unwrap_or_default()
}

fn declaration_only(line: &str) -> bool {
    line.trim_end().ends_with(';')
}

/// Whether the line is a comment in `language` (comment lines never start units)
pub fn is_comment_line(language: Language, line: &str) -> bool {
    let trimmed = line.trim_start();
    match language {
        Language::Python => trimmed.starts_with('#'),
        _ => {
            trimmed.starts_with("//")
                || trimmed.starts_with("/*")
                || trimmed.starts_with('*')
                || trimmed.starts_with('#') && !trimmed.starts_with("#[")
        }
    }
}

/// Match a unit-start (definition) line
pub fn match_unit_start(language: Language, line: &str) -> Option<UnitStart> {
    if line.trim().is_empty() || is_comment_line(language, line) {
        return None;
    }
    if language.uses_braces() && declaration_only(line) {
        return None;
    }

    let start = match language {
        Language::Python => python_def().captures(line).map(|caps| UnitStart {
            name: capture(&caps, 1),
            params: capture(&caps, 2),
            scope_hint: None,
        }),
        Language::Java => java_method().captures(line).and_then(|caps| {
            let return_type = capture(&caps, 1);
            // `public Foo(int x) {` parses as type=public, name=Foo: a constructor
            if JAVA_MODIFIERS.contains(&return_type.as_str())
                || is_reserved(Language::Java, &return_type)
            {
                return None;
            }
            Some(UnitStart {
                name: capture(&caps, 2),
                params: capture(&caps, 3),
                scope_hint: None,
            })
        }),
        Language::JavaScript | Language::TypeScript => js_function()
            .captures(line)
            .or_else(|| js_arrow().captures(line))
            .or_else(|| js_method().captures(line))
            .map(|caps| UnitStart {
                name: capture(&caps, 1),
                params: capture(&caps, 2),
                scope_hint: None,
            }),
        Language::Go => go_func().captures(line).map(|caps| UnitStart {
            name: capture(&caps, 2),
            params: capture(&caps, 3),
            scope_hint: caps.get(1).map(|m| m.as_str().to_string()),
        }),
        Language::Cpp => cpp_function().captures(line).map(|caps| {
            let qualified = capture(&caps, 1);
            let (scope_hint, name) = match qualified.rsplit_once("::") {
                Some((owner, name)) => (
                    owner.rsplit("::").next().map(str::to_string),
                    name.to_string(),
                ),
                None => (None, qualified),
            };
            UnitStart {
                name,
                params: capture(&caps, 2),
                scope_hint,
            }
        }),
        Language::Rust => rust_fn().captures(line).map(|caps| UnitStart {
            name: capture(&caps, 1),
            params: capture(&caps, 2),
            scope_hint: None,
        }),
    }?;

    if start.name.is_empty() || is_reserved(language, &start.name) {
        return None;
    }
    Some(start)
}

/// Match an enclosing-scope declaration line (class, impl, namespace, ...)
pub(crate) fn match_scope(language: Language, line: &str) -> Option<String> {
    if is_comment_line(language, line) {
        return None;
    }
    if language.uses_braces() && declaration_only(line) {
        return None;
    }
    let re = match language {
        Language::Python => python_class(),
        Language::Java => java_type(),
        Language::JavaScript | Language::TypeScript => js_class(),
        Language::Cpp => cpp_scope(),
        Language::Rust => rust_scope(),
        Language::Go => return None,
    };
    re.captures(line).map(|caps| capture(&caps, 1))
}
