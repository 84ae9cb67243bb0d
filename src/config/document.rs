//! Stage 2: locate the config document and overlay it onto the defaults.
//!
//! JSON is the default format; a `.toml` extension selects TOML. Both are
//! decoded into a `serde_json::Value` tree before the overlay walk, so the
//! overlay rules are the same for either.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::context::ResolveContext;
use super::diagnostic::{Position, describe};
use super::error::ConfigError;
use super::schema::{FieldDescriptor, FieldKind, FieldPath, FieldSlot, Schema, Visitor, walk};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Toml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => DocumentFormat::Toml,
            _ => DocumentFormat::Json,
        }
    }
}

/// Pick the document to read: a file with the same base name under the
/// per-user override directory wins over `path`.
pub fn locate(path: &Path, ctx: &ResolveContext) -> PathBuf {
    if let (Some(dir), Some(base)) = (ctx.override_dir(), path.file_name()) {
        let candidate = dir.join(base);
        if dir.is_dir() && candidate.is_file() {
            debug!(
                requested = %path.display(),
                using = %candidate.display(),
                "per-user override found"
            );
            return candidate;
        }
    }
    path.to_path_buf()
}

/// Read, parse and overlay the document at `path` onto `schema`.
pub fn load(schema: &mut dyn Schema, path: &Path, ctx: &ResolveContext) -> Result<(), ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Document {
        path: path.to_path_buf(),
        source,
    })?;
    let document = parse_document(path, &text)?;
    overlay(schema, path, &document, ctx)
}

/// Parse `text` according to the format implied by `path`.
pub fn parse_document(path: &Path, text: &str) -> Result<Value, ConfigError> {
    match DocumentFormat::from_path(path) {
        DocumentFormat::Json => serde_json::from_str(text).map_err(|e| {
            let offset = json_error_offset(text, e.line(), e.column());
            let position = Position::from_offset(text, offset);
            let full = e.to_string();
            let message = full
                .rsplit_once(" at line ")
                .map_or(full.as_str(), |(message, _)| message);
            syntax_error(path, text, position, message)
        }),
        DocumentFormat::Toml => {
            let table: toml::Table = toml::from_str(text).map_err(|e| {
                let offset = e.span().map_or(0, |span| span.start);
                let position = Position::from_offset(text, offset);
                syntax_error(path, text, position, e.message())
            })?;
            Ok(toml_to_json(toml::Value::Table(table)))
        }
    }
}

/// Byte offset of the character serde_json stopped at. Its column is a
/// 1-based byte count; column 0 means it had just consumed a newline, so the
/// offset is stepped back onto the end of the previous line.
fn json_error_offset(text: &str, line: usize, column: usize) -> usize {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    match column {
        0 => line_start.saturating_sub(1),
        c => line_start + c - 1,
    }
}

fn syntax_error(path: &Path, text: &str, position: Position, message: &str) -> ConfigError {
    ConfigError::Syntax {
        path: path.to_path_buf(),
        line: position.line,
        column: position.column,
        diagnostic: describe(text, position, message),
    }
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Overlay an already-parsed document onto `schema`.
pub fn overlay(
    schema: &mut dyn Schema,
    path: &Path,
    document: &Value,
    ctx: &ResolveContext,
) -> Result<(), ConfigError> {
    let Value::Object(root) = document else {
        return Err(ConfigError::Shape {
            path: path.to_path_buf(),
            found: value_kind(document),
        });
    };
    let mut overlay = Overlay {
        stack: vec![root],
        verbose: ctx.is_verbose(),
    };
    if overlay.verbose {
        report_unknown_keys(&FieldPath::default(), root, schema.descriptors());
    }
    walk(schema, &mut overlay)
}

struct Overlay<'d> {
    stack: Vec<&'d Map<String, Value>>,
    verbose: bool,
}

impl<'d> Overlay<'d> {
    /// Exact key match first, then a case-insensitive one.
    fn lookup(&self, field: &FieldDescriptor) -> Option<&'d Value> {
        let object = *self.stack.last()?;
        let key = field.document_key();
        object.get(key).or_else(|| {
            object
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
    }
}

impl Visitor for Overlay<'_> {
    fn visit(
        &mut self,
        path: &FieldPath,
        field: &FieldDescriptor,
        slot: Option<FieldSlot<'_>>,
    ) -> Result<(), ConfigError> {
        let Some(value) = self.lookup(field) else {
            return Ok(());
        };
        if value.is_null() {
            return Ok(());
        }
        if let FieldKind::Unsupported(label) = field.kind {
            warn!(field = %path, kind = label, "document value for unsupported field kind ignored");
            return Ok(());
        }
        let Some(slot) = slot else {
            debug!(field = %path, "document value for unsettable field ignored");
            return Ok(());
        };

        match slot {
            FieldSlot::String(target) => match value {
                Value::String(s) => *target = s.clone(),
                other => return Err(mismatch(path, "string", other)),
            },
            FieldSlot::Integer(target) => match value.as_i64() {
                Some(i) => *target = i,
                None => return Err(mismatch(path, "integer", value)),
            },
            FieldSlot::Boolean(target) => match value.as_bool() {
                Some(b) => *target = b,
                None => return Err(mismatch(path, "boolean", value)),
            },
            FieldSlot::Nested(_) | FieldSlot::Unsupported => return Ok(()),
        }

        if self.verbose {
            debug!(field = %path, "set from document");
        }
        Ok(())
    }

    fn enter(&mut self, path: &FieldPath, field: &FieldDescriptor) -> Result<bool, ConfigError> {
        match self.lookup(field) {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Object(object)) => {
                if self.verbose {
                    if let FieldKind::Nested(table) = field.kind {
                        report_unknown_keys(path, object, table);
                    }
                }
                self.stack.push(object);
                Ok(true)
            }
            Some(other) => Err(mismatch(path, "object", other)),
        }
    }

    fn leave(&mut self, _path: &FieldPath, _field: &FieldDescriptor) {
        self.stack.pop();
    }
}

fn report_unknown_keys(path: &FieldPath, object: &Map<String, Value>, table: &[FieldDescriptor]) {
    for key in object.keys() {
        let known = table
            .iter()
            .any(|f| f.document_key().eq_ignore_ascii_case(key));
        if !known {
            debug!(at = %path, key = %key, "unknown document key ignored");
        }
    }
}

fn mismatch(path: &FieldPath, expected: &'static str, found: &Value) -> ConfigError {
    ConfigError::FieldType {
        field: path.to_string(),
        expected,
        found: value_kind(found),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "floating-point number",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
