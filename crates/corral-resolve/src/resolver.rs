//! Search paths and the memoizing package resolver.

use crate::interp::{self, PythonEnv};
use crate::metadata::{DistIndex, DistInfo};
use corral_core::package::{Package, PackageOrigin};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};

/// Ordered module search paths plus the interpreter facts needed to
/// classify what they contain.
#[derive(Debug, Clone, Default)]
pub struct SearchPaths {
    /// Directories searched for modules, in order.
    pub entries: Vec<PathBuf>,
    /// The interpreter's standard library directory, when known.
    pub stdlib_dir: Option<PathBuf>,
    /// Names treated as standard in addition to the vendored table,
    /// e.g. probed builtins.
    pub stdlib_names: BTreeSet<String>,
}

impl SearchPaths {
    pub fn new(entries: Vec<PathBuf>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    /// Build search paths from a probed interpreter.
    pub fn from_env(env: &PythonEnv) -> Self {
        Self {
            entries: env.search_paths.clone(),
            stdlib_dir: env.stdlib_dir.clone(),
            stdlib_names: env.builtins.iter().cloned().collect(),
        }
    }

    /// Put a directory at the front of the search order.
    pub fn prepend(&mut self, dir: impl Into<PathBuf>) {
        self.entries.insert(0, dir.into());
    }

    pub fn is_stdlib_name(&self, name: &str) -> bool {
        interp::is_stdlib_module(name) || self.stdlib_names.contains(name)
    }
}

/// Locate a module name under one directory: `name.py`, then a package
/// directory carrying `__init__.py`, then a shared library, then a
/// case-insensitive scan of the directory entries.
pub fn locate_in(dir: &Path, name: &str) -> Option<PathBuf> {
    let module = dir.join(format!("{name}.py"));
    if module.is_file() {
        return Some(module);
    }
    let package = dir.join(name);
    if package.join("__init__.py").is_file() {
        return Some(package);
    }
    if let Some(lib) = shared_library(dir, name) {
        return Some(lib);
    }
    case_insensitive_scan(dir, name)
}

/// Find `name.<tag>.so` / `name.pyd` extension modules, tagged or not.
fn shared_library(dir: &Path, name: &str) -> Option<PathBuf> {
    let prefix = format!("{name}.");
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if file_name.starts_with(&prefix)
            && (file_name.ends_with(".so") || file_name.ends_with(".pyd"))
        {
            return Some(entry.path());
        }
    }
    None
}

fn case_insensitive_scan(dir: &Path, name: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if path.is_dir() {
            if file_name.eq_ignore_ascii_case(name) && path.join("__init__.py").is_file() {
                return Some(path);
            }
        } else if let Some(stem) = file_name.strip_suffix(".py")
            && stem.eq_ignore_ascii_case(name)
        {
            return Some(path);
        }
    }
    None
}

/// Outcome of classifying one import name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Standard library or builtin; never bundled.
    Stdlib,
    /// Resolved to a bundleable package.
    Found(Package),
    /// Nothing on the search path claims the name.
    Missing,
}

/// Memoizing package resolver over a fixed search-path snapshot.
///
/// Lookups, requirement scans, and per-entry distribution indexes are
/// cached on the instance, so resolving a large handler stays linear in
/// the number of distinct names. Caches populate on miss and are never
/// invalidated; build a new resolver to observe filesystem changes.
#[derive(Debug, Default)]
pub struct Resolver {
    paths: SearchPaths,
    lookups: HashMap<String, Lookup>,
    requirements: HashMap<String, BTreeSet<String>>,
    dists: HashMap<PathBuf, DistIndex>,
}

impl Resolver {
    pub fn new(paths: SearchPaths) -> Self {
        Self {
            paths,
            ..Self::default()
        }
    }

    pub fn paths(&self) -> &SearchPaths {
        &self.paths
    }

    /// Classify one import name, memoized.
    pub fn resolve_name(&mut self, name: &str) -> Lookup {
        if let Some(hit) = self.lookups.get(name) {
            return hit.clone();
        }
        let lookup = self.classify(name);
        self.lookups.insert(name.to_string(), lookup.clone());
        lookup
    }

    fn classify(&mut self, name: &str) -> Lookup {
        if self.paths.is_stdlib_name(name) {
            return Lookup::Stdlib;
        }
        if let Some(stdlib) = self.paths.stdlib_dir.clone()
            && locate_in(&stdlib, name).is_some()
        {
            return Lookup::Stdlib;
        }
        let entries = self.paths.entries.clone();
        for entry in entries {
            if let Some(dist) = self.dist_index(&entry).get(name).cloned() {
                // The canonical import name comes from top_level.txt;
                // older metadata without it falls back to spelling
                // variants of the distribution name.
                let mut candidates = dist.top_level.clone();
                if candidates.is_empty() {
                    candidates.push(dist.dist_name.clone());
                    candidates.push(name.to_string());
                }
                for import_name in &candidates {
                    if let Some(path) = locate_in(&entry, import_name) {
                        return Lookup::Found(Package::site(
                            import_name.as_str(),
                            &entry,
                            path,
                            &dist.info_dir,
                        ));
                    }
                }
                tracing::warn!(
                    "metadata for {} names no locatable module under {}",
                    dist.dist_name,
                    entry.display()
                );
            }
            if let Some(path) = locate_in(&entry, name) {
                return Lookup::Found(Package::new(name, &entry, path, PackageOrigin::Local));
            }
        }
        Lookup::Missing
    }

    /// Immediate requirements of a resolved package, memoized. Site
    /// packages declare theirs in distribution metadata; local packages
    /// get the union of import scans over their module files.
    pub fn requires(&mut self, pkg: &Package) -> BTreeSet<String> {
        if let Some(hit) = self.requirements.get(&pkg.name) {
            return hit.clone();
        }
        let mut reqs = match pkg.origin {
            PackageOrigin::Stdlib => BTreeSet::new(),
            PackageOrigin::Site => pkg
                .info_dir
                .as_deref()
                .and_then(DistInfo::read)
                .map(|dist| dist.requires())
                .unwrap_or_default(),
            PackageOrigin::Local => {
                let mut names = BTreeSet::new();
                for file in pkg.module_files() {
                    if file.extension().is_some_and(|ext| ext == "py") {
                        names.extend(corral_parser::imports::scan_file(&file));
                    }
                }
                names
            }
        };
        reqs.remove(&pkg.name);
        self.requirements.insert(pkg.name.clone(), reqs.clone());
        reqs
    }

    /// Transitive dependency closure for a handler file. The file's own
    /// module name is excluded, stdlib names are skipped, and names
    /// nothing claims are logged and left out.
    pub fn resolve_file(&mut self, path: &Path) -> BTreeSet<Package> {
        let imports = corral_parser::imports::scan_file(path);
        let mut seen = BTreeSet::new();
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            seen.insert(stem.to_string());
        }
        self.closure(imports, seen)
    }

    /// Transitive dependency closure for a module name already on the
    /// search path. The start package itself is not in the result.
    pub fn resolve_module(&mut self, name: &str) -> BTreeSet<Package> {
        let head = name.split('.').next().unwrap_or("").trim().to_string();
        if head.is_empty() {
            return BTreeSet::new();
        }
        let mut seen = BTreeSet::new();
        seen.insert(head.clone());
        match self.resolve_name(&head) {
            Lookup::Stdlib => BTreeSet::new(),
            Lookup::Missing => {
                tracing::warn!("cannot resolve module {head}");
                BTreeSet::new()
            }
            Lookup::Found(pkg) => {
                seen.insert(pkg.name.clone());
                let initial = self.requires(&pkg);
                self.closure(initial, seen)
            }
        }
    }

    /// Worklist closure with a seen set, so requirement cycles
    /// terminate.
    fn closure(
        &mut self,
        initial: BTreeSet<String>,
        mut seen: BTreeSet<String>,
    ) -> BTreeSet<Package> {
        let mut out = BTreeSet::new();
        let mut queue: VecDeque<String> = initial.into_iter().collect();
        while let Some(name) = queue.pop_front() {
            if seen.contains(&name) {
                continue;
            }
            seen.insert(name.clone());
            match self.resolve_name(&name) {
                Lookup::Stdlib => {}
                Lookup::Missing => {
                    tracing::warn!("cannot resolve {name}, leaving it out of the bundle");
                }
                Lookup::Found(pkg) => {
                    seen.insert(pkg.name.clone());
                    for req in self.requires(&pkg) {
                        if !seen.contains(&req) {
                            queue.push_back(req);
                        }
                    }
                    out.insert(pkg);
                }
            }
        }
        out
    }

    fn dist_index(&mut self, dir: &Path) -> &DistIndex {
        self.dists
            .entry(dir.to_path_buf())
            .or_insert_with(|| DistIndex::scan(dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_locate_prefers_module_file() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("thing.py"), "").unwrap();
        fs::create_dir(tmp.path().join("thing")).unwrap();
        fs::write(tmp.path().join("thing").join("__init__.py"), "").unwrap();

        let found = locate_in(tmp.path(), "thing").unwrap();
        assert_eq!(found, tmp.path().join("thing.py"));
    }

    #[test]
    fn test_locate_requires_init_marker() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("plain")).unwrap();
        assert!(locate_in(tmp.path(), "plain").is_none());
    }

    #[test]
    fn test_locate_finds_tagged_shared_library() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("fast.cpython-312-x86_64-linux-gnu.so"),
            "",
        )
        .unwrap();
        let found = locate_in(tmp.path(), "fast").unwrap();
        assert!(found.to_string_lossy().ends_with(".so"));
    }

    #[test]
    fn test_locate_case_insensitive_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("Crypto")).unwrap();
        fs::write(tmp.path().join("Crypto").join("__init__.py"), "").unwrap();

        let found = locate_in(tmp.path(), "crypto").unwrap();
        assert_eq!(found, tmp.path().join("Crypto"));
    }

    #[test]
    fn test_stdlib_names_without_interpreter() {
        let mut resolver = Resolver::new(SearchPaths::default());
        assert_eq!(resolver.resolve_name("os"), Lookup::Stdlib);
        assert_eq!(resolver.resolve_name("json"), Lookup::Stdlib);
        assert_eq!(resolver.resolve_name("nothing_here"), Lookup::Missing);
    }

    #[test]
    fn test_probed_builtins_extend_stdlib() {
        let mut paths = SearchPaths::default();
        paths.stdlib_names.insert("_custom_builtin".to_string());
        let mut resolver = Resolver::new(paths);
        assert_eq!(resolver.resolve_name("_custom_builtin"), Lookup::Stdlib);
    }
}
