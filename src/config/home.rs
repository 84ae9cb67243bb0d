//! `~` and `~user` path expansion.

use std::path::PathBuf;

use tracing::{debug, warn};

use super::context::ResolveContext;
use super::error::LookupWarning;

/// Result of [`expand_home`]. `warning` is set when a `~user` prefix could
/// not be resolved; `path` is then the input unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub path: PathBuf,
    pub warning: Option<LookupWarning>,
}

impl Expansion {
    fn unchanged(path: &str) -> Self {
        Self {
            path: PathBuf::from(path),
            warning: None,
        }
    }
}

/// Expand a leading `~/` to the context's home directory and a leading
/// `~name` to that account's home directory.
///
/// Other paths, including a bare `~`, are returned unchanged.
pub fn expand_home(path: &str, ctx: &ResolveContext) -> Expansion {
    let Some(rest) = path.strip_prefix('~') else {
        return Expansion::unchanged(path);
    };

    if let Some(tail) = rest.strip_prefix('/') {
        return match ctx.home() {
            Some(home) => Expansion {
                path: home.join(tail.trim_start_matches('/')),
                warning: None,
            },
            None => {
                debug!(path, "no home directory known; leaving path unexpanded");
                Expansion::unchanged(path)
            }
        };
    }

    let (user, tail) = match rest.split_once('/') {
        Some((user, tail)) => (user, tail),
        None => (rest, ""),
    };
    if user.is_empty() {
        return Expansion::unchanged(path);
    }

    match lookup_user_home(user) {
        Ok(dir) => Expansion {
            path: if tail.is_empty() { dir } else { dir.join(tail) },
            warning: None,
        },
        Err(reason) => {
            let warning = LookupWarning {
                user: user.to_string(),
                path: path.to_string(),
                reason,
            };
            warn!("{warning}");
            Expansion {
                path: PathBuf::from(path),
                warning: Some(warning),
            }
        }
    }
}

#[cfg(unix)]
fn lookup_user_home(user: &str) -> Result<PathBuf, String> {
    match nix::unistd::User::from_name(user) {
        Ok(Some(account)) => Ok(account.dir),
        Ok(None) => Err("no such account".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(not(unix))]
fn lookup_user_home(_user: &str) -> Result<PathBuf, String> {
    Err("account lookup is not supported on this platform".to_string())
}
