//! Single-key text editing for YAML documents.
//!
//! # Responsibilities
//! - Read one scalar from raw document text, even when the full document
//!   fails to parse
//! - Rewrite exactly one key's line, keeping every other line, trailing
//!   comments and key order as they were
//! - Append missing keys (and their parent headers) at the end of the
//!   enclosing block
//!
//! Keys are located by indentation: a segment is searched among the lines
//! of its parent's block that sit at the block's first child indent.
//! Layouts this cannot express (flow mappings, a scalar where a parent
//! mapping is needed) are reported as errors so the caller can fall back to
//! a whole-document rewrite.

use regex::Regex;
use thiserror::Error;

use crate::tree::{split_path, TreeCodec, Value};

/// Errors from line-oriented edits.
#[derive(Debug, Error)]
pub enum LineEditError {
    #[error("empty key path")]
    EmptyPath,

    #[error("value for '{0}' is not a scalar")]
    NotScalar(String),

    #[error("'{0}' holds an inline value, cannot add nested keys under it")]
    InlineParent(String),
}

/// Line-oriented reader/writer for single keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineEditor;

#[derive(Debug, PartialEq)]
enum Located {
    Found {
        line: usize,
        block_end: usize,
    },
    Missing {
        depth: usize,
        parent_line: Option<usize>,
        insert_at: usize,
        indent: usize,
    },
}

impl LineEditor {
    /// Read the scalar stored at `path`, if that key holds one.
    pub fn get_scalar(text: &str, path: &str) -> Option<Value> {
        let segments = split_path(path);
        let last = *segments.last()?;
        let lines: Vec<&str> = text.split('\n').collect();
        let Located::Found { line, .. } = locate(&lines, &segments) else {
            return None;
        };
        let rest = key_pattern(last).captures(lines[line])?.get(2)?.as_str();
        let (value, _) = split_comment(rest);
        let value = value.trim();
        if value.is_empty() || value.starts_with(['[', '{', '|', '>', '&', '*']) {
            return None;
        }
        Some(Value::parse_scalar(value))
    }

    /// Return `text` with the scalar at `path` replaced by `value`.
    pub fn set_scalar(text: &str, path: &str, value: &Value) -> Result<String, LineEditError> {
        let segments = split_path(path);
        if segments.is_empty() {
            return Err(LineEditError::EmptyPath);
        }
        let rendered =
            TreeCodec::scalar_text(value).ok_or_else(|| LineEditError::NotScalar(path.to_string()))?;

        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        let located = {
            let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            locate(&refs, &segments)
        };

        match located {
            Located::Found { line, block_end } => {
                let last = segments[segments.len() - 1];
                let rewritten = rewrite_line(&lines[line], last, &rendered);
                lines[line] = rewritten;
                if block_end > line + 1 {
                    lines.drain(line + 1..block_end);
                }
            }
            Located::Missing {
                depth,
                parent_line,
                insert_at,
                indent,
            } => {
                if let Some(parent) = parent_line {
                    if has_inline_value(&lines[parent], segments[depth - 1]) {
                        return Err(LineEditError::InlineParent(segments[..depth].join(".")));
                    }
                }
                let remaining = &segments[depth..];
                let inserted: Vec<String> = remaining
                    .iter()
                    .enumerate()
                    .map(|(offset, segment)| {
                        let pad = " ".repeat(indent + 2 * offset);
                        let key = render_key(segment);
                        if offset + 1 == remaining.len() {
                            format!("{}{}: {}", pad, key, rendered)
                        } else {
                            format!("{}{}:", pad, key)
                        }
                    })
                    .collect();
                for (offset, line) in inserted.into_iter().enumerate() {
                    lines.insert(insert_at + offset, line);
                }
            }
        }

        Ok(lines.join("\n"))
    }
}

fn key_pattern(key: &str) -> Regex {
    let k = regex::escape(key);
    Regex::new(&format!(r#"^(\s*(?:"{k}"|'{k}'|{k})[ \t]*):((?:\s.*)?)$"#))
        .expect("escaped key forms a valid pattern")
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_ignorable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#') || trimmed == "---" || trimmed == "..."
}

fn is_sequence_item(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed == "-" || trimmed.starts_with("- ")
}

/// One past the last line that belongs to the key on line `start`.
fn block_end(lines: &[&str], start: usize, indent: usize) -> usize {
    let mut last = start;
    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        if is_ignorable(line) {
            continue;
        }
        let line_indent = indent_of(line);
        if line_indent > indent || (line_indent == indent && is_sequence_item(line)) {
            last = i;
        } else {
            break;
        }
    }
    last + 1
}

fn locate(lines: &[&str], segments: &[&str]) -> Located {
    let mut start = 0;
    let mut end = lines.len();
    let mut parent: Option<(usize, usize)> = None;

    for (depth, segment) in segments.iter().enumerate() {
        let child_indent = lines[start..end]
            .iter()
            .find(|line| !is_ignorable(line))
            .map(|line| indent_of(line));
        let pattern = key_pattern(segment);
        let hit = child_indent.and_then(|indent| {
            (start..end).find(|&i| {
                !is_ignorable(lines[i]) && indent_of(lines[i]) == indent && pattern.is_match(lines[i])
            })
        });

        match hit {
            Some(line) => {
                let indent = indent_of(lines[line]);
                let end_of_block = block_end(lines, line, indent);
                if depth + 1 == segments.len() {
                    return Located::Found {
                        line,
                        block_end: end_of_block,
                    };
                }
                start = line + 1;
                end = end_of_block;
                parent = Some((line, indent));
            }
            None => {
                let indent = child_indent
                    .unwrap_or_else(|| parent.map_or(0, |(_, parent_indent)| parent_indent + 2));
                let insert_at = (start..end)
                    .rev()
                    .find(|&i| !is_ignorable(lines[i]))
                    .map_or(start, |i| i + 1);
                return Located::Missing {
                    depth,
                    parent_line: parent.map(|(line, _)| line),
                    insert_at,
                    indent,
                };
            }
        }
    }

    unreachable!("segments is never empty here")
}

/// Split the text after `key:` into its value and trailing `# comment`.
fn split_comment(rest: &str) -> (&str, Option<&str>) {
    let leading = rest.len() - rest.trim_start().len();
    let body = &rest[leading..];
    let scan_from = match body.chars().next() {
        Some(quote @ ('"' | '\'')) => body[1..]
            .find(quote)
            .map_or(rest.len(), |pos| leading + pos + 2),
        _ => leading,
    };
    let bytes = rest.as_bytes();
    for i in scan_from..bytes.len() {
        if bytes[i] == b'#' && (i == 0 || bytes[i - 1].is_ascii_whitespace()) {
            return (&rest[..i], Some(&rest[i..]));
        }
    }
    (rest, None)
}

fn has_inline_value(line: &str, key: &str) -> bool {
    key_pattern(key)
        .captures(line)
        .and_then(|caps| caps.get(2))
        .map(|rest| !split_comment(rest.as_str()).0.trim().is_empty())
        .unwrap_or(false)
}

fn rewrite_line(line: &str, key: &str, rendered: &str) -> String {
    let carriage_return = if line.ends_with('\r') { "\r" } else { "" };
    let line = line.trim_end_matches('\r');
    let Some(caps) = key_pattern(key).captures(line) else {
        return line.to_string();
    };
    let prefix = caps.get(1).map_or("", |m| m.as_str());
    let rest = caps.get(2).map_or("", |m| m.as_str());
    let comment = split_comment(rest)
        .1
        .map(|c| format!(" {}", c.trim_end()))
        .unwrap_or_default();
    format!("{}: {}{}{}", prefix, rendered, comment, carriage_return)
}

fn render_key(key: &str) -> String {
    TreeCodec::scalar_text(&Value::String(key.to_string())).unwrap_or_else(|| key.to_string())
}
