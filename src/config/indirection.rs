//! Stage 3: replace `$ENV$` and `$FILE$` sentinel strings.

use std::env;
use std::fs;

use tracing::debug;

use super::context::ResolveContext;
use super::error::{ConfigError, LookupWarning};
use super::home::expand_home;
use super::schema::{FieldDescriptor, FieldPath, FieldSlot, Schema, Visitor, walk};

pub const ENV_PREFIX: &str = "$ENV$";
pub const FILE_PREFIX: &str = "$FILE$";

/// Resolve every sentinel string in `schema`, recursing into nested
/// structures. Returns the warnings raised by `~user` expansion.
///
/// Each field is inspected once: a value produced by a substitution is never
/// examined again.
pub fn resolve_indirections(
    schema: &mut dyn Schema,
    ctx: &ResolveContext,
) -> Result<Vec<LookupWarning>, ConfigError> {
    let mut resolver = Resolver {
        ctx,
        warnings: Vec::new(),
    };
    walk(schema, &mut resolver)?;
    Ok(resolver.warnings)
}

struct Resolver<'c> {
    ctx: &'c ResolveContext,
    warnings: Vec<LookupWarning>,
}

impl Visitor for Resolver<'_> {
    fn visit(
        &mut self,
        path: &FieldPath,
        _field: &FieldDescriptor,
        slot: Option<FieldSlot<'_>>,
    ) -> Result<(), ConfigError> {
        let Some(FieldSlot::String(value)) = slot else {
            return Ok(());
        };

        if let Some(name) = non_empty_suffix(value, ENV_PREFIX) {
            let resolved = match env::var_os(name) {
                Some(v) => v.to_string_lossy().into_owned(),
                None => {
                    debug!(field = %path, var = name, "environment variable unset; using empty string");
                    String::new()
                }
            };
            if self.ctx.is_verbose() {
                debug!(field = %path, var = name, len = resolved.len(), "resolved from environment");
            }
            *value = resolved;
        } else if let Some(target) = non_empty_suffix(value, FILE_PREFIX) {
            let expansion = expand_home(target, self.ctx);
            if let Some(warning) = expansion.warning {
                self.warnings.push(warning);
            }
            let contents = fs::read_to_string(&expansion.path).map_err(|source| {
                ConfigError::Indirection {
                    field: path.to_string(),
                    path: expansion.path.clone(),
                    source,
                }
            })?;
            if self.ctx.is_verbose() {
                debug!(
                    field = %path,
                    file = %expansion.path.display(),
                    len = contents.len(),
                    "resolved from file"
                );
            }
            *value = contents;
        }
        Ok(())
    }
}

/// The part of `value` after `prefix`, if that part is non-empty.
fn non_empty_suffix<'v>(value: &'v str, prefix: &str) -> Option<&'v str> {
    value.strip_prefix(prefix).filter(|rest| !rest.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    crate::config_schema! {
        #[derive(Debug, Default)]
        struct Auth {
            token: String,
            port: i64,
        }
    }

    crate::config_schema! {
        #[derive(Debug, Default)]
        struct Server {
            host: String,
            secret: String,
            plain: String,
            bare: String,
            auth: Auth,
        }
    }

    fn ctx_with_home(home: &std::path::Path) -> ResolveContext {
        ResolveContext::with_home(home)
    }

    #[test]
    fn env_sentinel_reads_variable() {
        // SAFETY: variable name is unique to this test.
        unsafe { env::set_var("QR_SVR_TEST_INDIRECT_HOST", "redis.local") };
        let mut s = Server {
            host: "$ENV$QR_SVR_TEST_INDIRECT_HOST".into(),
            plain: "unchanged".into(),
            bare: "$ENV$".into(),
            ..Default::default()
        };
        let warnings = resolve_indirections(&mut s, &ResolveContext::without_home()).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(s.host, "redis.local");
        assert_eq!(s.plain, "unchanged");
        assert_eq!(s.bare, "$ENV$");
    }

    #[test]
    fn unset_env_variable_resolves_to_empty() {
        let mut s = Server {
            secret: "$ENV$QR_SVR_TEST_DEFINITELY_UNSET".into(),
            ..Default::default()
        };
        resolve_indirections(&mut s, &ResolveContext::without_home()).unwrap();
        assert_eq!(s.secret, "");
    }

    #[test]
    fn file_sentinel_reads_contents_into_nested_field() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("token");
        fs::write(&file, "hello\n").unwrap();
        let mut s = Server {
            auth: Auth {
                token: format!("$FILE${}", file.display()),
                port: 7,
            },
            ..Default::default()
        };
        resolve_indirections(&mut s, &ResolveContext::without_home()).unwrap();
        assert_eq!(s.auth.token, "hello\n");
        assert_eq!(s.auth.port, 7);
    }

    #[test]
    fn file_sentinel_expands_home() {
        let home = TempDir::new().unwrap();
        fs::create_dir(home.path().join("keys")).unwrap();
        fs::write(home.path().join("keys/redis"), "s3cret").unwrap();
        let mut s = Server {
            secret: "$FILE$~/keys/redis".into(),
            ..Default::default()
        };
        resolve_indirections(&mut s, &ctx_with_home(home.path())).unwrap();
        assert_eq!(s.secret, "s3cret");
    }

    #[test]
    fn missing_file_is_indirection_error() {
        let mut s = Server {
            auth: Auth {
                token: "$FILE$/nonexistent/qr-svr/token".into(),
                port: 0,
            },
            ..Default::default()
        };
        let err = resolve_indirections(&mut s, &ResolveContext::without_home()).unwrap_err();
        match err {
            ConfigError::Indirection { field, path, .. } => {
                assert_eq!(field, "auth.token");
                assert_eq!(path, PathBuf::from("/nonexistent/qr-svr/token"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_user_in_file_path_warns_then_fails_read() {
        let mut s = Server {
            secret: "$FILE$~nouser-qr-svr-test/token".into(),
            ..Default::default()
        };
        let err = resolve_indirections(&mut s, &ResolveContext::without_home()).unwrap_err();
        assert!(matches!(err, ConfigError::Indirection { .. }));
    }

    #[test]
    fn substitution_happens_once() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("chained");
        fs::write(&file, "$ENV$QR_SVR_TEST_CHAINED").unwrap();
        // SAFETY: variable name is unique to this test.
        unsafe { env::set_var("QR_SVR_TEST_CHAINED", "should-not-appear") };
        let mut s = Server {
            secret: format!("$FILE${}", file.display()),
            ..Default::default()
        };
        resolve_indirections(&mut s, &ResolveContext::without_home()).unwrap();
        assert_eq!(s.secret, "$ENV$QR_SVR_TEST_CHAINED");
    }
}
