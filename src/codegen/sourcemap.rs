//! Source map v3 generation.

use std::collections::HashMap;

use serde::Serialize;

use crate::ast::Span;
use crate::{err_msg, MacroJsError};

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<String>>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    pub fn to_json(&self) -> Result<String, MacroJsError> {
        serde_json::to_string(self).map_err(|e| err_msg!(Internal, "failed to serialize source map: {}", e))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mapping {
    generated_column: u32,
    source_line: u32,
    source_column: u32,
    name: Option<u32>,
}

/// Collects mappings line by line while the printer writes.
#[derive(Debug, Default)]
pub(crate) struct SourceMapBuilder {
    lines: Vec<Vec<Mapping>>,
    names: Vec<String>,
    name_index: HashMap<String, u32>,
}

impl SourceMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps generated `line`/`column` (both 0-based) to `span`. Spans without
    /// a position are ignored. A second mapping at the same generated column
    /// only replaces the first if it adds a name.
    pub fn add(&mut self, line: u32, column: u32, span: Span, name: Option<&str>) {
        if span.line == 0 {
            return;
        }
        let name = name.map(|name| self.intern(name));
        let line = line as usize;
        if self.lines.len() <= line {
            self.lines.resize_with(line + 1, Vec::new);
        }
        let mapping = Mapping {
            generated_column: column,
            source_line: span.line - 1,
            source_column: span.column,
            name,
        };
        let segments = &mut self.lines[line];
        match segments.last_mut() {
            Some(last) if last.generated_column == column => {
                if last.name.is_none() && mapping.name.is_some() {
                    *last = mapping;
                }
            }
            _ => segments.push(mapping),
        }
    }

    fn intern(&mut self, name: &str) -> u32 {
        if let Some(index) = self.name_index.get(name) {
            return *index;
        }
        let index = self.names.len() as u32;
        self.names.push(name.to_string());
        self.name_index.insert(name.to_string(), index);
        index
    }

    pub fn build(self, file: Option<String>, source_name: &str, content: Option<String>) -> SourceMap {
        SourceMap {
            version: 3,
            file,
            sources: vec![source_name.to_string()],
            sources_content: content.map(|content| vec![content]),
            names: self.names,
            mappings: encode_mappings(&self.lines),
        }
    }
}

/// Every field except the generated column is relative to the previous
/// segment in the whole map; the generated column restarts on each line.
fn encode_mappings(lines: &[Vec<Mapping>]) -> String {
    let mut out = String::new();
    let mut previous_line = 0i64;
    let mut previous_column = 0i64;
    let mut previous_name = 0i64;
    for (index, segments) in lines.iter().enumerate() {
        if index > 0 {
            out.push(';');
        }
        let mut previous_generated = 0i64;
        for (position, mapping) in segments.iter().enumerate() {
            if position > 0 {
                out.push(',');
            }
            encode_vlq(i64::from(mapping.generated_column) - previous_generated, &mut out);
            previous_generated = i64::from(mapping.generated_column);
            encode_vlq(0, &mut out);
            encode_vlq(i64::from(mapping.source_line) - previous_line, &mut out);
            previous_line = i64::from(mapping.source_line);
            encode_vlq(i64::from(mapping.source_column) - previous_column, &mut out);
            previous_column = i64::from(mapping.source_column);
            if let Some(name) = mapping.name {
                encode_vlq(i64::from(name) - previous_name, &mut out);
                previous_name = i64::from(name);
            }
        }
    }
    out
}

/// Base64 VLQ: sign in the lowest bit, five bits per digit, continuation in the sixth.
pub fn encode_vlq(value: i64, out: &mut String) {
    let mut rest = if value < 0 {
        (value.unsigned_abs() << 1) | 1
    } else {
        (value as u64) << 1
    };
    loop {
        let mut digit = (rest & 0b1_1111) as usize;
        rest >>= 5;
        if rest > 0 {
            digit |= 0b10_0000;
        }
        out.push(BASE64[digit] as char);
        if rest == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vlq(value: i64) -> String {
        let mut out = String::new();
        encode_vlq(value, &mut out);
        out
    }

    #[test]
    fn vlq_digits() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(15), "e");
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(-17), "jB");
    }

    #[test]
    fn mappings_are_relative() {
        let mut builder = SourceMapBuilder::new();
        builder.add(0, 0, Span::new(0, 3, 1, 0), Some("foo"));
        builder.add(0, 4, Span::new(4, 5, 1, 4), None);
        builder.add(2, 2, Span::new(10, 13, 2, 2), Some("foo"));
        let map = builder.build(None, "input.js", None);
        assert_eq!(map.mappings, "AAAAA,IAAI;;EACFA");
        assert_eq!(map.names, ["foo"]);
    }

    #[test]
    fn unpositioned_spans_are_skipped_and_named_mappings_win() {
        let mut builder = SourceMapBuilder::new();
        builder.add(0, 0, Span::default(), None);
        builder.add(0, 0, Span::new(0, 1, 1, 0), None);
        builder.add(0, 0, Span::new(0, 1, 1, 0), Some("x"));
        let map = builder.build(None, "input.js", Some("x".to_string()));
        assert_eq!(map.mappings, "AAAAA");
        assert_eq!(map.sources_content, Some(vec!["x".to_string()]));
    }

    #[test]
    fn serializes_camel_case() {
        let map = SourceMapBuilder::new().build(Some("out.js".into()), "input.js", Some(String::new()));
        let json: serde_json::Value = serde_json::from_str(&map.to_json().unwrap()).unwrap();
        assert_eq!(json["version"], 3);
        assert_eq!(json["file"], "out.js");
        assert!(json.get("sourcesContent").is_some());
    }
}
