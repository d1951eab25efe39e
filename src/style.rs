//! Built-in source canonicalizer backing the formatting engine.
//!
//! This is the opaque `format(source, options) -> formatted | ParseError`
//! function the rest of the crate is built around. It normalizes line
//! endings, trailing whitespace, blank-line runs and brace-depth
//! indentation, optionally drops unused single-name imports and manages
//! trailing commas. It does not re-wrap long lines.
//!
//! The pass is deterministic and idempotent: formatting already-formatted
//! text returns it unchanged.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::format::FormattingOptions;

/// Formatter-level failure, converted by the adapter into a file failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StyleError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Delimiter/string scanner state carried across lines.
#[derive(Debug, Default, Clone)]
struct ScanState {
    depth: usize,
    in_block_comment: bool,
    in_raw_string: bool,
}

/// Per-line facts recorded during the scan pass.
#[derive(Debug, Clone, Copy)]
struct LineInfo {
    start_depth: usize,
    starts_in_raw_string: bool,
}

static IMPORT_RE: OnceLock<Regex> = OnceLock::new();

fn import_re() -> &'static Regex {
    IMPORT_RE.get_or_init(|| {
        Regex::new(r"^import\s+(?:[A-Za-z_][A-Za-z0-9_]*\.)*([A-Za-z_][A-Za-z0-9_]*|\*)(?:\s+as\s+([A-Za-z_][A-Za-z0-9_]*))?$").unwrap()
    })
}

/// Format `source` according to `options`.
pub fn reformat(options: &FormattingOptions, source: &str) -> Result<String, StyleError> {
    if source.is_empty() {
        return Ok(String::new());
    }

    let lines: Vec<&str> = source.split('\n').map(|l| l.trim_end_matches('\r')).collect();

    let infos = scan(&lines)?;
    let mut rendered = render(&lines, &infos, options);

    if options.remove_unused_imports {
        rendered = drop_unused_imports(rendered);
    }
    if options.manage_trailing_commas {
        insert_trailing_commas(&mut rendered);
    }

    if options.debugging_print_ops {
        let long = rendered
            .iter()
            .filter(|l| l.chars().count() > options.max_width)
            .count();
        debug!(
            lines = rendered.len(),
            over_max_width = long,
            "formatting ops applied"
        );
    }

    // Drop trailing blank lines, keep exactly one final newline.
    while rendered.last().is_some_and(|l| l.is_empty()) {
        rendered.pop();
    }
    if rendered.is_empty() {
        return Ok(String::new());
    }
    let mut out = rendered.join("\n");
    out.push('\n');
    Ok(out)
}

/// Walk every line once, tracking bracket depth and string/comment state.
/// Rejects unbalanced delimiters and unterminated literals.
fn scan(lines: &[&str]) -> Result<Vec<LineInfo>, StyleError> {
    let mut state = ScanState::default();
    let mut infos = Vec::with_capacity(lines.len());

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        infos.push(LineInfo {
            start_depth: state.depth,
            starts_in_raw_string: state.in_raw_string,
        });
        scan_line(&mut state, line, line_no)?;
    }

    let last = lines.len();
    if state.in_raw_string {
        return Err(StyleError::Parse {
            line: last,
            message: "unterminated raw string literal".into(),
        });
    }
    if state.in_block_comment {
        return Err(StyleError::Parse {
            line: last,
            message: "unterminated block comment".into(),
        });
    }
    if state.depth != 0 {
        return Err(StyleError::Parse {
            line: last,
            message: "unclosed delimiter at end of file".into(),
        });
    }
    Ok(infos)
}

fn scan_line(state: &mut ScanState, line: &str, line_no: usize) -> Result<(), StyleError> {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if state.in_raw_string {
            if chars[i..].starts_with(&['"', '"', '"']) {
                state.in_raw_string = false;
                i += 3;
            } else {
                i += 1;
            }
            continue;
        }
        if state.in_block_comment {
            if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                state.in_block_comment = false;
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }

        match chars[i] {
            '"' if chars[i..].starts_with(&['"', '"', '"']) => {
                state.in_raw_string = true;
                i += 3;
            }
            quote @ ('"' | '\'') => {
                i = scan_literal(&chars, i, quote, line_no)?;
            }
            '/' if chars.get(i + 1) == Some(&'/') => break,
            '/' if chars.get(i + 1) == Some(&'*') => {
                state.in_block_comment = true;
                i += 2;
            }
            '(' | '[' | '{' => {
                state.depth += 1;
                i += 1;
            }
            closer @ (')' | ']' | '}') => {
                if state.depth == 0 {
                    return Err(StyleError::Parse {
                        line: line_no,
                        message: format!("unmatched closing delimiter '{closer}'"),
                    });
                }
                state.depth -= 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    Ok(())
}

/// Scan a single-line string or char literal starting at `open`; returns the
/// index past the closing quote.
fn scan_literal(
    chars: &[char],
    open: usize,
    quote: char,
    line_no: usize,
) -> Result<usize, StyleError> {
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err(StyleError::Parse {
        line: line_no,
        message: format!("unterminated {} literal", if quote == '"' { "string" } else { "character" }),
    })
}

/// Rebuild every line with canonical indentation, stripped trailing
/// whitespace and collapsed blank runs. Raw-string interiors pass through
/// untouched.
fn render(lines: &[&str], infos: &[LineInfo], options: &FormattingOptions) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut prev_content: Option<String> = None;

    for (line, info) in lines.iter().zip(infos) {
        if info.starts_in_raw_string {
            out.push((*line).to_string());
            continue;
        }

        let content = line.trim();
        if content.is_empty() {
            // Collapse runs of blank lines; never start the file with one.
            if prev_content.is_some() && out.last().is_some_and(|l| !l.is_empty()) {
                out.push(String::new());
            }
            continue;
        }

        let closes_first = matches!(content.chars().next(), Some(')' | ']' | '}'));
        let units = if closes_first {
            info.start_depth.saturating_sub(1)
        } else {
            info.start_depth
        };

        let continuation = is_continuation(content, prev_content.as_deref());
        let mut width = units * options.block_indent;
        if continuation {
            width += options.continuation_indent;
        }

        let mut rendered = " ".repeat(width);
        rendered.push_str(content);
        out.push(rendered);
        prev_content = Some(content.to_string());
    }
    out
}

/// A line is a continuation when it begins with a member access or the
/// previous line ends mid-expression.
fn is_continuation(content: &str, prev: Option<&str>) -> bool {
    if content.starts_with('.') || content.starts_with("?.") {
        return true;
    }
    match prev {
        Some(prev) => ["=", "->", "&&", "||", "+"]
            .iter()
            .any(|op| prev.ends_with(op)),
        None => false,
    }
}

/// Drop top-level single-name imports whose imported (or aliased) name is
/// never referenced outside the import block. Wildcard imports are kept.
fn drop_unused_imports(lines: Vec<String>) -> Vec<String> {
    let mut imports: Vec<(usize, String)> = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if let Some(caps) = import_re().captures(line.trim_end()) {
            let name = caps
                .get(2)
                .or_else(|| caps.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            if name != "*" {
                imports.push((idx, name));
            }
        }
    }
    if imports.is_empty() {
        return lines;
    }

    let body: String = lines
        .iter()
        .enumerate()
        .filter(|(idx, _)| !imports.iter().any(|(i, _)| i == idx))
        .map(|(_, l)| l.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let unused: Vec<usize> = imports
        .iter()
        .filter(|(_, name)| {
            let pattern = format!(r"\b{}\b", regex::escape(name));
            // The name regex above only admits identifier characters, so
            // this cannot fail to compile.
            !Regex::new(&pattern).map(|re| re.is_match(&body)).unwrap_or(true)
        })
        .map(|(idx, _)| *idx)
        .collect();

    lines
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| !unused.contains(idx))
        .map(|(_, l)| l)
        .collect()
}

/// Append a trailing comma to the last element of a multi-line argument or
/// collection list, i.e. when the next line starts with `)` or `]`.
fn insert_trailing_commas(lines: &mut [String]) {
    for i in 0..lines.len() {
        let Some(next) = lines.get(i + 1) else { continue };
        let next_closes = matches!(next.trim_start().chars().next(), Some(')' | ']'));
        if !next_closes {
            continue;
        }
        let trimmed = lines[i].trim_end();
        if trimmed.starts_with("//") || trimmed.is_empty() {
            continue;
        }
        let eligible = trimmed
            .chars()
            .last()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, ')' | ']' | '"' | '\'' | '_'));
        if eligible {
            let end = trimmed.len();
            lines[i].truncate(end);
            lines[i].push(',');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> FormattingOptions {
        FormattingOptions::default()
    }

    #[test]
    fn test_empty_source_is_untouched() {
        assert_eq!(reformat(&opts(), "").unwrap(), "");
    }

    #[test]
    fn test_normalizes_line_endings_and_trailing_whitespace() {
        let source = "fun main() {\r\n    println(\"hi\")   \r\n}\r\n";
        let formatted = reformat(&opts(), source).unwrap();
        assert_eq!(formatted, "fun main() {\n    println(\"hi\")\n}\n");
    }

    #[test]
    fn test_reindents_by_brace_depth() {
        let source = "fun main() {\nprintln(\"hi\")\n}\n";
        let formatted = reformat(&opts(), source).unwrap();
        assert_eq!(formatted, "fun main() {\n    println(\"hi\")\n}\n");
    }

    #[test]
    fn test_collapses_blank_runs() {
        let source = "val a = 1\n\n\n\nval b = 2\n";
        let formatted = reformat(&opts(), source).unwrap();
        assert_eq!(formatted, "val a = 1\n\nval b = 2\n");
    }

    #[test]
    fn test_idempotent() {
        let source = "class Foo {\nfun bar() {\nval x = listOf(\n1,\n2\n)\n}\n}\n";
        let once = reformat(&opts(), source).unwrap();
        let twice = reformat(&opts(), &once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unbalanced_brace_is_parse_error() {
        let err = reformat(&opts(), "fun broken() {\n").unwrap_err();
        assert!(matches!(err, StyleError::Parse { .. }));
    }

    #[test]
    fn test_unmatched_closer_is_parse_error() {
        let err = reformat(&opts(), "fun broken() }\n").unwrap_err();
        let StyleError::Parse { line, message } = err;
        assert_eq!(line, 1);
        assert!(message.contains("unmatched"));
    }

    #[test]
    fn test_braces_in_strings_and_comments_are_ignored() {
        let source = "val a = \"{[(\"\n// }]) comment\n/* { */\n";
        assert!(reformat(&opts(), source).is_ok());
    }

    #[test]
    fn test_raw_string_interior_is_preserved() {
        let source = "val a = \"\"\"\n   keep   {{{ this\n\"\"\"\n";
        let formatted = reformat(&opts(), source).unwrap();
        assert!(formatted.contains("   keep   {{{ this"));
    }

    #[test]
    fn test_removes_unused_import() {
        let source = "import foo.bar.Unused\nimport foo.bar.Used\n\nval x = Used()\n";
        let formatted = reformat(&opts(), source).unwrap();
        assert!(!formatted.contains("Unused"));
        assert!(formatted.contains("import foo.bar.Used"));
    }

    #[test]
    fn test_keeps_wildcard_and_aliased_imports() {
        let source = "import foo.bar.*\nimport foo.baz.Thing as Alias\n\nval x = Alias()\n";
        let formatted = reformat(&opts(), source).unwrap();
        assert!(formatted.contains("import foo.bar.*"));
        assert!(formatted.contains("as Alias"));
    }

    #[test]
    fn test_manage_trailing_commas() {
        let options = FormattingOptions {
            manage_trailing_commas: true,
            ..FormattingOptions::default()
        };
        let source = "val x = listOf(\n1,\n2\n)\n";
        let formatted = reformat(&options, source).unwrap();
        assert!(formatted.contains("2,\n"));
        // Second run must not double the comma.
        assert_eq!(reformat(&options, &formatted).unwrap(), formatted);
    }

    #[test]
    fn test_continuation_indent() {
        let options = FormattingOptions::default();
        let source = "val total = a +\nb\n";
        let formatted = reformat(&options, source).unwrap();
        assert_eq!(formatted, "val total = a +\n        b\n");
    }
}
