//! Layered configuration resolution.
//!
//! A configuration struct is filled in three strictly ordered stages:
//!
//! 1. **defaults**: compile-time default literals from the descriptor table.
//! 2. **document**: the JSON/TOML document (or its per-user override under
//!    `~/local/`) is overlaid on top.
//! 3. **indirection**: `$ENV$name` and `$FILE$path` strings are replaced.
//!
//! The pipeline runs once, at startup. The first error aborts it; deciding
//! whether that ends the process is left to the caller.
//!
//! # Module layout
//!
//! - **schema**: `FieldDescriptor`, `FieldSlot`, the `Schema` trait, the
//!   generic `walk`, and the `config_schema!` macro.
//! - **context**: `ResolveContext`: home directory, override dir, verbosity.
//! - **defaults**, **document**, **indirection**: one module per stage.
//! - **home**: `~` / `~user` expansion.
//! - **diagnostic**: line/column rendering of parse errors.
//! - **error**: `ConfigError` and `LookupWarning`.

mod context;
mod defaults;
mod diagnostic;
mod document;
mod error;
mod home;
mod indirection;
mod schema;

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

pub use context::{LOCAL_DIR_NAME, ResolveContext};
pub use defaults::{apply_defaults, parse_bool_literal};
pub use diagnostic::{Position, describe};
pub use document::{DocumentFormat, load, locate, overlay, parse_document};
pub use error::{ConfigError, LookupWarning};
pub use home::{Expansion, expand_home};
pub use indirection::{ENV_PREFIX, FILE_PREFIX, resolve_indirections};
pub use schema::{FieldDescriptor, FieldKind, FieldPath, FieldSlot, FieldType, Schema, Visitor, walk};

/// What a pipeline run did besides filling the struct.
#[derive(Debug, Clone)]
pub struct Report {
    /// The document actually read, after the override lookup.
    pub source: PathBuf,
    pub warnings: Vec<LookupWarning>,
}

/// Run the full pipeline on a caller-provided instance.
pub fn read_config_into(
    schema: &mut dyn Schema,
    path: &Path,
    ctx: &ResolveContext,
) -> Result<Report, ConfigError> {
    apply_defaults(schema, ctx)?;
    let source = locate(path, ctx);
    load(schema, &source, ctx)?;
    // each warning was already logged where it was raised
    let warnings = resolve_indirections(schema, ctx)?;

    info!(
        source = %source.display(),
        warnings = warnings.len(),
        "configuration resolved"
    );
    Ok(Report { source, warnings })
}

/// Run the full pipeline on `T::default()` and freeze the result.
pub fn read_config<T>(path: &Path, ctx: &ResolveContext) -> Result<Resolved<T>, ConfigError>
where
    T: Schema + Default,
{
    let mut value = T::default();
    let report = read_config_into(&mut value, path, ctx)?;
    Ok(Resolved {
        value: Arc::new(value),
        report: Arc::new(report),
    })
}

/// A fully resolved configuration. Read-only from here on; clones share the
/// same instance.
#[derive(Debug)]
pub struct Resolved<T> {
    value: Arc<T>,
    report: Arc<Report>,
}

impl<T> Resolved<T> {
    pub fn source(&self) -> &Path {
        &self.report.source
    }

    pub fn warnings(&self) -> &[LookupWarning] {
        &self.report.warnings
    }

    pub fn shared(&self) -> Arc<T> {
        Arc::clone(&self.value)
    }
}

impl<T> Clone for Resolved<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            report: Arc::clone(&self.report),
        }
    }
}

impl<T> Deref for Resolved<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}
