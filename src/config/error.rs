//! Errors raised while resolving a configuration.
//!
//! Every variant is fatal for the pipeline. The one non-fatal condition, an
//! unresolvable `~user` prefix, is reported as a [`LookupWarning`] instead.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The schema itself is unusable: a default on an unsupported kind, a
    /// field that cannot be written, or a slot that disagrees with its
    /// descriptor.
    #[error("schema error on field `{field}`: {reason}")]
    Schema { field: String, reason: String },

    #[error("invalid default for field `{field}`: cannot parse {literal:?} as {kind}: {reason}")]
    DefaultParse {
        field: String,
        literal: String,
        kind: &'static str,
        reason: String,
    },

    #[error("cannot read config document {}: {source}", path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `diagnostic` is the rendered, operator-facing snippet.
    #[error("syntax error in {} at line {line}, column {column}\n{diagnostic}", path.display())]
    Syntax {
        path: PathBuf,
        line: usize,
        column: usize,
        diagnostic: String,
    },

    #[error("config document {} must hold an object at the top level, found {found}", path.display())]
    Shape { path: PathBuf, found: &'static str },

    #[error("field `{field}` expects {expected}, document has {found}")]
    FieldType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("cannot read $FILE$ target {} for field `{field}`: {source}", path.display())]
    Indirection {
        field: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A `~user` prefix whose account could not be looked up. The path it came
/// from is used unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupWarning {
    pub user: String,
    pub path: String,
    pub reason: String,
}

impl fmt::Display for LookupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unable to look up home directory of user `{}` for {}: {}",
            self.user, self.path, self.reason
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parse_names_field_and_literal() {
        let e = ConfigError::DefaultParse {
            field: "qr_size".into(),
            literal: "big".into(),
            kind: "integer",
            reason: "invalid digit found in string".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("qr_size"));
        assert!(msg.contains("\"big\""));
        assert!(msg.contains("integer"));
    }

    #[test]
    fn syntax_error_carries_diagnostic() {
        let e = ConfigError::Syntax {
            path: PathBuf::from("cfg.json"),
            line: 1,
            column: 6,
            diagnostic: "line 1, column 6: expected value".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("line 1, column 6"));
        assert!(msg.contains("cfg.json"));
    }

    #[test]
    fn lookup_warning_display() {
        let w = LookupWarning {
            user: "nouser".into(),
            path: "~nouser/x".into(),
            reason: "no such account".into(),
        };
        assert!(w.to_string().contains("`nouser`"));
        assert!(w.to_string().contains("~nouser/x"));
    }
}
