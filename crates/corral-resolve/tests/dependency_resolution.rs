use corral_core::package::PackageOrigin;
use corral_resolve::resolver::{Lookup, Resolver, SearchPaths};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn site_dist(site: &Path, dist_dir: &str, top_level: &str, metadata: &str) {
    let info = site.join(dist_dir);
    fs::create_dir_all(&info).unwrap();
    fs::write(info.join("top_level.txt"), top_level).unwrap();
    fs::write(info.join("METADATA"), metadata).unwrap();
}

#[test]
fn test_stdlib_modules_resolve_to_nothing() {
    let mut resolver = Resolver::new(SearchPaths::default());
    for name in ["sys", "os", "os.path", "email"] {
        let deps = resolver.resolve_module(name);
        assert!(deps.is_empty(), "{name} should have no bundled deps");
    }
}

#[test]
fn test_distribution_name_aliases_resolve_identically() {
    let tmp = TempDir::new().unwrap();
    let site = tmp.path();
    site_dist(
        site,
        "python_dateutil-2.8.2.dist-info",
        "dateutil\n",
        "Name: python-dateutil\n",
    );
    write(&site.join("dateutil").join("__init__.py"), "");

    let mut resolver = Resolver::new(SearchPaths::new(vec![site.to_path_buf()]));
    let expected = match resolver.resolve_name("dateutil") {
        Lookup::Found(pkg) => pkg,
        other => panic!("dateutil should resolve, got {other:?}"),
    };
    assert_eq!(expected.name, "dateutil");
    assert_eq!(expected.origin, PackageOrigin::Site);
    assert!(expected.info_dir.is_some());

    for alias in ["python-dateutil", "python_dateutil"] {
        match resolver.resolve_name(alias) {
            Lookup::Found(pkg) => assert_eq!(pkg, expected, "{alias} should match dateutil"),
            other => panic!("{alias} should resolve, got {other:?}"),
        }
    }
}

#[test]
fn test_local_package_requirements_are_union_of_module_imports() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path();
    write(&base.join("foo").join("__init__.py"), "import boto3\n");
    write(&base.join("foo").join("bar").join("__init__.py"), "import os\n");
    write(&base.join("foo").join("bar").join("che.py"), "import sys\n");

    let mut resolver = Resolver::new(SearchPaths::new(vec![base.to_path_buf()]));
    let pkg = match resolver.resolve_name("foo") {
        Lookup::Found(pkg) => pkg,
        other => panic!("foo should resolve, got {other:?}"),
    };
    assert_eq!(pkg.origin, PackageOrigin::Local);

    let requires = resolver.requires(&pkg);
    let names: Vec<&str> = requires.iter().map(String::as_str).collect();
    assert_eq!(names, vec!["boto3", "os", "sys"]);
}

#[test]
fn test_transitive_closure_through_site_metadata() {
    let tmp = TempDir::new().unwrap();
    let site = tmp.path().join("site");
    site_dist(
        &site,
        "alpha-1.0.dist-info",
        "alpha\n",
        "Requires-Dist: beta (>=2.0)\n",
    );
    site_dist(&site, "beta-2.1.dist-info", "beta\n", "Name: beta\n");
    write(&site.join("alpha").join("__init__.py"), "");
    write(&site.join("beta").join("__init__.py"), "");

    let handler = tmp.path().join("handler.py");
    write(&handler, "import alpha\n\ndef handler(event, context):\n    return 1\n");

    let mut resolver = Resolver::new(SearchPaths::new(vec![site.clone()]));
    let deps = resolver.resolve_file(&handler);
    let names: Vec<&str> = deps.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta"]);
}

#[test]
fn test_submodule_importing_parent_is_not_a_requirement() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path();
    write(&base.join("foo").join("__init__.py"), "import util\n");
    write(&base.join("foo").join("inner.py"), "import foo\n");
    write(&base.join("util.py"), "");

    let mut resolver = Resolver::new(SearchPaths::new(vec![base.to_path_buf()]));
    let pkg = match resolver.resolve_name("foo") {
        Lookup::Found(pkg) => pkg,
        other => panic!("foo should resolve, got {other:?}"),
    };
    let requires = resolver.requires(&pkg);
    assert!(!requires.contains("foo"));
    let names: Vec<&str> = requires.iter().map(String::as_str).collect();
    assert_eq!(names, vec!["util"]);
}

#[test]
fn test_requirement_cycle_terminates() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path();
    write(&base.join("ping").join("__init__.py"), "import pong\n");
    write(&base.join("pong").join("__init__.py"), "import ping\n");

    let handler = base.join("handler.py");
    write(&handler, "import ping\n");

    let mut resolver = Resolver::new(SearchPaths::new(vec![base.to_path_buf()]));
    let deps = resolver.resolve_file(&handler);
    let names: Vec<&str> = deps.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["ping", "pong"]);
}

#[test]
fn test_unresolvable_imports_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path();
    write(&base.join("util.py"), "import json\n");

    let handler = base.join("handler.py");
    write(&handler, "import ghost_module\nimport util\n");

    let mut resolver = Resolver::new(SearchPaths::new(vec![base.to_path_buf()]));
    let deps = resolver.resolve_file(&handler);
    let names: Vec<&str> = deps.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["util"]);
}

#[test]
fn test_module_start_excludes_itself() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path();
    write(&base.join("foo").join("__init__.py"), "import util\n");
    write(&base.join("util.py"), "import os\n");

    let mut resolver = Resolver::new(SearchPaths::new(vec![base.to_path_buf()]));
    let deps = resolver.resolve_module("foo");
    let names: Vec<&str> = deps.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["util"]);
}

#[test]
fn test_handler_self_import_not_bundled() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path();
    let handler = base.join("worker.py");
    write(&handler, "import worker\nimport util\n");
    write(&base.join("util.py"), "");

    let mut resolver = Resolver::new(SearchPaths::new(vec![base.to_path_buf()]));
    let deps = resolver.resolve_file(&handler);
    let names: Vec<&str> = deps.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["util"]);
}

#[test]
fn test_sibling_imports_need_the_handler_directory_on_the_path() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path();
    let handler = base.join("handler.py");
    write(&handler, "import helper\n");
    write(&base.join("helper.py"), "");

    let mut detached = Resolver::new(SearchPaths::default());
    assert!(detached.resolve_file(&handler).is_empty());

    let mut paths = SearchPaths::default();
    paths.prepend(base);
    let mut resolver = Resolver::new(paths);
    let deps = resolver.resolve_file(&handler);
    let names: Vec<&str> = deps.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["helper"]);
}

#[test]
fn test_first_search_path_entry_wins() {
    let tmp = TempDir::new().unwrap();
    let first = tmp.path().join("first");
    let second = tmp.path().join("second");
    write(&first.join("util.py"), "# local shadow\n");
    site_dist(&second, "util-1.0.dist-info", "util\n", "");
    write(&second.join("util").join("__init__.py"), "");

    let mut resolver = Resolver::new(SearchPaths::new(vec![first.clone(), second]));
    match resolver.resolve_name("util") {
        Lookup::Found(pkg) => {
            assert_eq!(pkg.origin, PackageOrigin::Local);
            assert_eq!(pkg.base_dir, first);
        }
        other => panic!("util should resolve, got {other:?}"),
    }
}

#[test]
fn test_stdlib_dir_claims_unknown_names() {
    let tmp = TempDir::new().unwrap();
    let stdlib = tmp.path().join("lib");
    write(&stdlib.join("sitecustomize.py"), "");

    let mut paths = SearchPaths::default();
    paths.stdlib_dir = Some(stdlib);
    let mut resolver = Resolver::new(paths);
    assert_eq!(resolver.resolve_name("sitecustomize"), Lookup::Stdlib);
}

#[test]
fn test_repeated_resolution_is_stable() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path();
    write(&base.join("one").join("__init__.py"), "import two\n");
    write(&base.join("two.py"), "");
    let handler = base.join("handler.py");
    write(&handler, "import one\n");

    let mut resolver = Resolver::new(SearchPaths::new(vec![base.to_path_buf()]));
    let first = resolver.resolve_file(&handler);
    let second = resolver.resolve_file(&handler);
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}
