//! Stage 1: fill fields from their compile-time default literals.

use tracing::debug;

use super::context::ResolveContext;
use super::error::ConfigError;
use super::schema::{FieldDescriptor, FieldKind, FieldPath, FieldSlot, Schema, Visitor, walk, not_settable};

/// Apply every declared default literal to `schema`, recursing into nested
/// structures. Never consults the document or the environment.
pub fn apply_defaults(schema: &mut dyn Schema, ctx: &ResolveContext) -> Result<(), ConfigError> {
    walk(schema, &mut DefaultApplier { verbose: ctx.is_verbose() })
}

struct DefaultApplier {
    verbose: bool,
}

impl Visitor for DefaultApplier {
    fn visit(
        &mut self,
        path: &FieldPath,
        field: &FieldDescriptor,
        slot: Option<FieldSlot<'_>>,
    ) -> Result<(), ConfigError> {
        let Some(literal) = field.default else {
            return Ok(());
        };
        if let FieldKind::Unsupported(label) = field.kind {
            return Err(ConfigError::Schema {
                field: path.to_string(),
                reason: format!(
                    "default literal {literal:?} on a field of unsupported kind {label}; \
                     defaults are only implemented for string, integer and boolean fields"
                ),
            });
        }
        let Some(slot) = slot else {
            return Err(not_settable(path));
        };

        match slot {
            FieldSlot::String(value) => *value = literal.to_string(),
            FieldSlot::Integer(value) => *value = parse_integer(path, literal)?,
            FieldSlot::Boolean(value) => *value = parse_bool(path, literal)?,
            // Nested fields never reach `visit`; unsupported ones returned above.
            FieldSlot::Nested(_) | FieldSlot::Unsupported => return Ok(()),
        }

        if self.verbose {
            debug!(field = %path, default = literal, "default applied");
        }
        Ok(())
    }
}

fn parse_integer(path: &FieldPath, literal: &str) -> Result<i64, ConfigError> {
    literal.parse::<i64>().map_err(|e| ConfigError::DefaultParse {
        field: path.to_string(),
        literal: literal.to_string(),
        kind: "integer",
        reason: e.to_string(),
    })
}

fn parse_bool(path: &FieldPath, literal: &str) -> Result<bool, ConfigError> {
    parse_bool_literal(literal).ok_or_else(|| ConfigError::DefaultParse {
        field: path.to_string(),
        literal: literal.to_string(),
        kind: "boolean",
        reason: "expected one of 1, t, T, TRUE, true, True, 0, f, F, FALSE, false, False".into(),
    })
}

/// The accepted true/false spellings.
pub fn parse_bool_literal(literal: &str) -> Option<bool> {
    match literal {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::config_schema! {
        #[derive(Debug, Default)]
        struct Tls {
            #[config(default = "true")]
            enabled: bool,
            #[config(default = "~/certs/server.pem")]
            cert: String,
        }
    }

    crate::config_schema! {
        #[derive(Debug, Default)]
        struct Server {
            #[config(key = "host_port", default = "localhost:8333")]
            host_port: String,
            #[config(default = "2592000")]
            login_ttl: i64,
            #[config(default = "-5")]
            offset: i64,
            #[config(default = "F")]
            debug: bool,
            untouched: String,
            tls: Tls,
            ratio: f64,
        }
    }

    fn ctx() -> ResolveContext {
        ResolveContext::with_home("/home/test")
    }

    #[test]
    fn applies_defaults_recursively() {
        let mut s = Server {
            debug: true,
            untouched: "keep".into(),
            ..Default::default()
        };
        apply_defaults(&mut s, &ctx()).unwrap();
        assert_eq!(s.host_port, "localhost:8333");
        assert_eq!(s.login_ttl, 2_592_000);
        assert_eq!(s.offset, -5);
        assert!(!s.debug);
        assert_eq!(s.untouched, "keep");
        assert!(s.tls.enabled);
        // literals are verbatim; expansion is not a stage-1 concern
        assert_eq!(s.tls.cert, "~/certs/server.pem");
        assert_eq!(s.ratio, 0.0);
    }

    crate::config_schema! {
        #[derive(Debug, Default)]
        struct BadInt {
            #[config(default = "lots")]
            qr_size: i64,
        }
    }

    #[test]
    fn bad_integer_literal_is_default_parse_error() {
        let err = apply_defaults(&mut BadInt::default(), &ctx()).unwrap_err();
        match err {
            ConfigError::DefaultParse { field, literal, kind, .. } => {
                assert_eq!(field, "qr_size");
                assert_eq!(literal, "lots");
                assert_eq!(kind, "integer");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    crate::config_schema! {
        #[derive(Debug, Default)]
        struct BadBool {
            #[config(default = "yes")]
            on: bool,
        }
    }

    #[test]
    fn bad_boolean_literal_is_default_parse_error() {
        let err = apply_defaults(&mut BadBool::default(), &ctx()).unwrap_err();
        assert!(matches!(err, ConfigError::DefaultParse { kind: "boolean", .. }));
    }

    crate::config_schema! {
        #[derive(Debug, Default)]
        struct Inner {
            #[config(default = "0.5")]
            ratio: f32,
        }
    }

    crate::config_schema! {
        #[derive(Debug, Default)]
        struct WithUnsupportedDefault {
            name: String,
            inner: Inner,
        }
    }

    #[test]
    fn unsupported_kind_with_default_is_schema_error() {
        let err = apply_defaults(&mut WithUnsupportedDefault::default(), &ctx()).unwrap_err();
        match err {
            ConfigError::Schema { field, reason } => {
                assert_eq!(field, "inner.ratio");
                assert!(reason.contains("f32"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Declares a defaulted field but never hands out its storage.
    struct Sealed;

    const SEALED_FIELDS: &[FieldDescriptor] =
        &[FieldDescriptor::new("secret", FieldKind::String).with_default("x")];

    impl Schema for Sealed {
        fn descriptors(&self) -> &'static [FieldDescriptor] {
            SEALED_FIELDS
        }

        fn field_slot(&mut self, _name: &str) -> Option<FieldSlot<'_>> {
            None
        }
    }

    #[test]
    fn unsettable_field_with_default_is_schema_error() {
        let err = apply_defaults(&mut Sealed, &ctx()).unwrap_err();
        assert!(matches!(err, ConfigError::Schema { .. }));
        assert!(err.to_string().contains("not settable"));
    }

    #[test]
    fn bool_literal_forms() {
        for l in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool_literal(l), Some(true), "{l}");
        }
        for l in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool_literal(l), Some(false), "{l}");
        }
        for l in ["", "yes", "tRUE", "2"] {
            assert_eq!(parse_bool_literal(l), None, "{l}");
        }
    }
}
