//! Python package identity and location.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Where a resolved package comes from. The three origins are mutually
/// exclusive: a name classifies as exactly one of them per search-path
/// snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageOrigin {
    /// Interpreter built-in or standard library module.
    Stdlib,
    /// Installed distribution carrying `*.dist-info` / `*.egg-info` metadata.
    Site,
    /// Plain module or package found on the search path.
    Local,
}

/// A resolved Python package: one import name bound to one location.
///
/// `path` is the module file (`name.py`, `name.so`) or the package
/// directory; `base_dir` is the search-path entry it was found under.
/// Ordering is by name first, so dependency sets list alphabetically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub base_dir: PathBuf,
    pub path: PathBuf,
    pub origin: PackageOrigin,
    /// Metadata directory (`*.dist-info` / `*.egg-info`) for site
    /// packages; `None` for everything else.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_dir: Option<PathBuf>,
}

impl Package {
    pub fn new(
        name: impl Into<String>,
        base_dir: impl Into<PathBuf>,
        path: impl Into<PathBuf>,
        origin: PackageOrigin,
    ) -> Self {
        Self {
            name: name.into(),
            base_dir: base_dir.into(),
            path: path.into(),
            origin,
            info_dir: None,
        }
    }

    /// A site package bound to its metadata directory.
    pub fn site(
        name: impl Into<String>,
        base_dir: impl Into<PathBuf>,
        path: impl Into<PathBuf>,
        info_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            base_dir: base_dir.into(),
            path: path.into(),
            origin: PackageOrigin::Site,
            info_dir: Some(info_dir.into()),
        }
    }

    /// The file the interpreter executes when this package is imported:
    /// the module file itself, or `__init__.py` for a package directory.
    pub fn entry_file(&self) -> PathBuf {
        if self.path.is_dir() {
            self.path.join("__init__.py")
        } else {
            self.path.clone()
        }
    }

    /// All Python module files belonging to this package.
    ///
    /// For a module file that is the file itself. For a package directory
    /// the walk descends only into subdirectories that carry an
    /// `__init__.py` marker, so data directories and namespace leftovers
    /// are not treated as modules.
    pub fn module_files(&self) -> Vec<PathBuf> {
        if self.path.is_file() {
            return vec![self.path.clone()];
        }
        let mut files: Vec<PathBuf> = WalkDir::new(&self.path)
            .into_iter()
            .filter_entry(|e| {
                if e.file_type().is_dir() {
                    e.path().join("__init__.py").is_file()
                } else {
                    has_extension(e.path(), "py")
                }
            })
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .collect();
        files.sort();
        files
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e == ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_entry_file_for_module() {
        let pkg = Package::new("single", "/lib", "/lib/single.py", PackageOrigin::Local);
        assert_eq!(pkg.entry_file(), PathBuf::from("/lib/single.py"));
    }

    #[test]
    fn test_entry_file_for_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("pkg");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("__init__.py"), "").unwrap();

        let pkg = Package::new("pkg", tmp.path(), &dir, PackageOrigin::Local);
        assert_eq!(pkg.entry_file(), dir.join("__init__.py"));
    }

    #[test]
    fn test_module_files_gated_on_init() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("foo");
        fs::create_dir_all(root.join("bar").join("che")).unwrap();
        fs::create_dir_all(root.join("data")).unwrap();
        fs::write(root.join("__init__.py"), "").unwrap();
        fs::write(root.join("mod.py"), "").unwrap();
        fs::write(root.join("bar").join("__init__.py"), "").unwrap();
        fs::write(root.join("bar").join("che").join("__init__.py"), "").unwrap();
        fs::write(root.join("bar").join("che").join("deep.py"), "").unwrap();
        // data/ has no __init__.py, so its contents are not modules
        fs::write(root.join("data").join("stray.py"), "").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();

        let pkg = Package::new("foo", tmp.path(), &root, PackageOrigin::Local);
        let files = pkg.module_files();
        assert_eq!(
            files,
            vec![
                root.join("__init__.py"),
                root.join("bar").join("__init__.py"),
                root.join("bar").join("che").join("__init__.py"),
                root.join("bar").join("che").join("deep.py"),
                root.join("mod.py"),
            ]
        );
    }

    #[test]
    fn test_ordering_is_by_name() {
        let a = Package::new("alpha", "/z", "/z/alpha.py", PackageOrigin::Local);
        let b = Package::new("beta", "/a", "/a/beta.py", PackageOrigin::Site);
        assert!(a < b);
    }
}
