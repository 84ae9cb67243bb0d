//! Resolution context: the state every stage reads but none owns.
//!
//! Built once at startup with [`ResolveContext::from_env`], or explicitly in
//! tests with [`ResolveContext::with_home`].

use std::path::{Path, PathBuf};

/// Name of the per-user override directory under the home directory.
pub const LOCAL_DIR_NAME: &str = "local";

#[derive(Debug, Clone)]
pub struct ResolveContext {
    home: Option<PathBuf>,
    local_dir_name: String,
    verbose: bool,
}

impl ResolveContext {
    /// Capture the process home directory.
    pub fn from_env() -> Self {
        Self {
            home: process_home(),
            local_dir_name: LOCAL_DIR_NAME.to_string(),
            verbose: false,
        }
    }

    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: Some(home.into()),
            local_dir_name: LOCAL_DIR_NAME.to_string(),
            verbose: false,
        }
    }

    /// A context with no known home directory: `~/` paths stay unexpanded
    /// and no override directory is consulted.
    pub fn without_home() -> Self {
        Self {
            home: None,
            local_dir_name: LOCAL_DIR_NAME.to_string(),
            verbose: false,
        }
    }

    /// Emit one debug event per field touched by each stage.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn local_dir_name(mut self, name: impl Into<String>) -> Self {
        self.local_dir_name = name.into();
        self
    }

    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// `<home>/<local_dir_name>`, when a home directory is known.
    pub fn override_dir(&self) -> Option<PathBuf> {
        self.home.as_ref().map(|h| h.join(&self.local_dir_name))
    }
}

impl Default for ResolveContext {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(windows)]
fn process_home() -> Option<PathBuf> {
    Some(PathBuf::from("C:\\"))
}

#[cfg(not(windows))]
fn process_home() -> Option<PathBuf> {
    dirs::home_dir()
}
