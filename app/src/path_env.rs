//! Scoped changes to the process `PATH`.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{MockError, Result};

const PATH_VAR: &str = "PATH";

/// Build a `PATH` value with `dir` in front of `current`.
///
/// An unset or empty `current` yields `dir` alone rather than a trailing
/// separator, which a shell would read as "also search the working
/// directory". Fails if `dir` contains the path separator.
pub fn prepended(dir: &Path, current: Option<&OsString>) -> Result<OsString> {
    let mut entries: Vec<PathBuf> = vec![dir.to_path_buf()];
    if let Some(current) = current.filter(|c| !c.is_empty()) {
        entries.extend(env::split_paths(current));
    }
    env::join_paths(&entries).map_err(|source| MockError::PathEntry {
        path: dir.to_path_buf(),
        source,
    })
}

/// Prepends a directory to `PATH` and puts the previous value back on drop.
///
/// The previous value is restored verbatim, including "unset". Guards do not
/// stack: two overlapping guards restore in whatever order they are dropped.
#[derive(Debug)]
pub struct PathGuard {
    original: Option<OsString>,
}

impl PathGuard {
    /// Leaves `PATH` untouched when `dir` cannot be added to it.
    pub fn prepend(dir: &Path) -> Result<Self> {
        let original = env::var_os(PATH_VAR);
        let updated = prepended(dir, original.as_ref())?;
        tracing::debug!("prepending {} to PATH", dir.display());
        env::set_var(PATH_VAR, &updated);
        Ok(PathGuard { original })
    }

    /// The value of `PATH` when the guard was created.
    pub fn original(&self) -> Option<&OsString> {
        self.original.as_ref()
    }
}

impl Drop for PathGuard {
    fn drop(&mut self) {
        match &self.original {
            Some(value) => env::set_var(PATH_VAR, value),
            None => env::remove_var(PATH_VAR),
        }
        tracing::debug!("restored PATH");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn dir_goes_first() {
        let current = OsString::from("/usr/bin:/bin");
        let value = prepended(Path::new("/tmp/mocks"), Some(&current)).unwrap();
        assert_eq!(value, OsString::from("/tmp/mocks:/usr/bin:/bin"));
    }

    #[test]
    fn unset_or_empty_path_yields_only_dir() {
        assert_eq!(
            prepended(Path::new("/tmp/mocks"), None).unwrap(),
            OsString::from("/tmp/mocks")
        );
        let empty = OsString::new();
        assert_eq!(
            prepended(Path::new("/tmp/mocks"), Some(&empty)).unwrap(),
            OsString::from("/tmp/mocks")
        );
    }

    #[test]
    fn empty_entries_are_kept() {
        // An empty entry means "current directory" to the shell and must survive.
        let current = OsString::from("/usr/bin::/bin");
        let value = prepended(Path::new("/m"), Some(&current)).unwrap();
        assert_eq!(value, OsString::from("/m:/usr/bin::/bin"));
    }

    #[test]
    fn dir_containing_separator_is_rejected() {
        let current = OsString::from("/usr/bin");
        let err = prepended(Path::new("/tmp/odd:tmp/mocks"), Some(&current)).unwrap_err();
        match err {
            MockError::PathEntry { path, .. } => assert_eq!(path, Path::new("/tmp/odd:tmp/mocks")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
