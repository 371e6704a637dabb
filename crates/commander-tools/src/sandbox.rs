//! Path sandbox - allow-list admission control for filesystem access
//!
//! Every filesystem-touching tool calls [`PathSandbox::validate`] before doing
//! any I/O. A path is admitted only when it lies inside one of the configured
//! directories, both as written and, when symlinks are involved, after
//! resolving them to their real target.
//!
//! Comparison is done on a normalised string form: `.`/`..` collapsed,
//! separators unified to `/`, case folded, trailing separator dropped. This
//! makes `C:\Users`, `C:/Users` and `c:/users` compare equal.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Allow-list of directories that filesystem operations may touch.
#[derive(Debug, Clone)]
pub struct PathSandbox {
    allowed: Vec<PathBuf>,
    home: PathBuf,
    cwd: PathBuf,
}

impl PathSandbox {
    /// Create a sandbox from already-resolved directories.
    ///
    /// `home` is used for `~` expansion and `cwd` for relative paths.
    #[must_use]
    pub fn new<I, P>(allowed: I, home: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut dirs: Vec<PathBuf> = Vec::new();
        for dir in allowed {
            let dir = lexical_normalize(&dir.into());
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        Self {
            allowed: dirs,
            home: home.into(),
            cwd: cwd.into(),
        }
    }

    /// Build the allow-list from whitelist entries.
    ///
    /// The working directory is always allowed. An empty entry stands for the
    /// home directory, absolute entries (including drive-letter paths) are
    /// taken as-is and anything else is relative to the home directory. An
    /// empty whitelist allows the home directory.
    #[must_use]
    pub fn from_whitelist(entries: &[String], home: &Path, cwd: &Path) -> Self {
        let mut allowed = vec![cwd.to_path_buf()];

        if entries.is_empty() {
            allowed.push(home.to_path_buf());
        }

        for entry in entries {
            let entry = entry.trim();
            if entry.is_empty() {
                allowed.push(home.to_path_buf());
            } else if is_drive_path(entry) {
                allowed.push(PathBuf::from(entry.replace('\\', "/")));
            } else if entry.starts_with('/') || entry.starts_with('\\') {
                allowed.push(PathBuf::from(entry));
            } else if let Some(rest) = entry.strip_prefix("~/").or(entry.strip_prefix("~\\")) {
                allowed.push(home.join(rest.replace('\\', "/")));
            } else if entry == "~" {
                allowed.push(home.to_path_buf());
            } else {
                allowed.push(home.join(entry.replace('\\', "/")));
            }
        }

        let sandbox = Self::new(allowed, home, cwd);
        debug!(allowed = ?sandbox.allowed, "Sandbox whitelist resolved");
        sandbox
    }

    /// Build the allow-list against the process's home and working directory.
    pub fn from_env(entries: &[String]) -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            Error::InvalidInput("cannot determine the home directory".to_string())
        })?;
        let cwd = std::env::current_dir()?;
        Ok(Self::from_whitelist(entries, &home, &cwd))
    }

    /// The effective allowed directories.
    #[must_use]
    pub fn allowed_directories(&self) -> &[PathBuf] {
        &self.allowed
    }

    /// Home directory used for `~` expansion.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Resolve `requested` and admit it only if it stays inside the sandbox.
    ///
    /// Returns the absolute path before symlink resolution; the caller performs
    /// I/O on it and lets the OS follow links.
    pub fn validate(&self, requested: &str) -> Result<PathBuf> {
        let absolute = lexical_normalize(&self.absolutize(requested));

        if !self.contains(&absolute, false) {
            warn!(
                requested = %requested,
                resolved = %absolute.display(),
                "Path outside allowed directories"
            );
            return Err(self.denied(&absolute));
        }

        if let Some(real) = real_path(&absolute) {
            if real != absolute && !self.contains(&real, true) {
                warn!(
                    requested = %requested,
                    target = %real.display(),
                    "Symlink target outside allowed directories"
                );
                return Err(self.denied(&real));
            }
        }

        debug!(requested = %requested, resolved = %absolute.display(), "Path allowed");
        Ok(absolute)
    }

    fn absolutize(&self, requested: &str) -> PathBuf {
        let expanded = if requested == "~" {
            self.home.clone()
        } else if let Some(rest) = requested
            .strip_prefix("~/")
            .or(requested.strip_prefix("~\\"))
        {
            self.home.join(rest)
        } else {
            PathBuf::from(requested)
        };

        if expanded.is_absolute() || is_drive_path(requested) {
            expanded
        } else {
            self.cwd.join(expanded)
        }
    }

    /// Containment check on normalised forms. With `real` set, the allowed
    /// directories are also compared through their own symlink-resolved form.
    fn contains(&self, path: &Path, real: bool) -> bool {
        let candidate = normalize_for_comparison(&path.to_string_lossy());
        self.allowed.iter().any(|dir| {
            if is_within(&candidate, &normalize_for_comparison(&dir.to_string_lossy())) {
                return true;
            }
            real && fs::canonicalize(dir).is_ok_and(|canonical| {
                is_within(
                    &candidate,
                    &normalize_for_comparison(&canonical.to_string_lossy()),
                )
            })
        })
    }

    fn denied(&self, path: &Path) -> Error {
        Error::AccessDenied {
            path: path.display().to_string(),
            allowed: self
                .allowed
                .iter()
                .map(|d| d.display().to_string())
                .collect(),
        }
    }
}

fn is_within(candidate: &str, dir: &str) -> bool {
    candidate == dir || candidate.starts_with(&format!("{}/", dir))
}

fn is_drive_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

/// Normalise a path string for comparison only.
pub(crate) fn normalize_for_comparison(path: &str) -> String {
    let unified = path.replace('\\', "/").to_lowercase();
    let absolute = unified.starts_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                // never pop past a root or drive prefix
                let at_drive = parts.len() == 1 && parts[0].ends_with(':');
                if parts.is_empty() || at_drive {
                    if !absolute && parts.is_empty() {
                        parts.push("..");
                    }
                } else if parts.last() == Some(&"..") {
                    parts.push("..");
                } else {
                    parts.pop();
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined).trim_end_matches('/').to_string()
    } else {
        joined
    }
}

/// Collapse `.` and `..` without touching the filesystem.
pub(crate) fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Real location of `path` with every symlink resolved.
///
/// Missing leaves are resolved through their deepest existing ancestor, and
/// a dangling link resolves to where it points.
fn real_path(path: &Path) -> Option<PathBuf> {
    if let Ok(real) = fs::canonicalize(path) {
        return Some(real);
    }

    let parent = path.parent()?;
    let base = real_path(parent).unwrap_or_else(|| parent.to_path_buf());

    let is_link = fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink());
    if is_link {
        let target = fs::read_link(path).ok()?;
        return Some(lexical_normalize(&base.join(target)));
    }

    Some(base.join(path.file_name()?))
}

#[cfg(test)]
mod tests;
