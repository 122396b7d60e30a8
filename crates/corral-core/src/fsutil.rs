//! Filesystem helpers for staging and archiving deployment bundles.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Copy a module file or package directory into `dest_dir`, keeping the
/// source's file name as the top-level entry. Returns the destination
/// path. Bytecode caches (`__pycache__/`, `*.pyc`) are not copied.
pub fn copy_into(src: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let name = src
        .file_name()
        .with_context(|| format!("path has no file name: {}", src.display()))?;
    let dest = dest_dir.join(name);
    if src.is_dir() {
        copy_tree(src, &dest)?;
    } else {
        fs::copy(src, &dest)
            .with_context(|| format!("failed to copy {} into bundle", src.display()))?;
    }
    Ok(dest)
}

fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    let walker = WalkDir::new(src)
        .into_iter()
        .filter_entry(|e| !is_cache_artifact(e.path()));
    for entry in walker {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src)?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("failed to create {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("failed to copy {} into bundle", entry.path().display()))?;
        }
    }
    Ok(())
}

fn is_cache_artifact(path: &Path) -> bool {
    path.file_name().is_some_and(|n| n == "__pycache__")
        || path.extension().is_some_and(|ext| ext == "pyc")
}

/// Zip the contents of `dir` into `archive` with deflate compression.
/// Entry names are relative to `dir`, so the archive root is the staging
/// root and the Lambda runtime resolves imports directly.
pub fn zip_dir(dir: &Path, archive: &Path) -> Result<()> {
    let file = fs::File::create(archive)
        .with_context(|| format!("failed to create archive {}", archive.display()))?;
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(dir)?;
        let name = rel.to_string_lossy();
        if entry.file_type().is_dir() {
            zip.add_directory(name.as_ref(), options)?;
        } else {
            zip.start_file(name.as_ref(), options)?;
            let mut f = fs::File::open(entry.path())
                .with_context(|| format!("failed to read {}", entry.path().display()))?;
            std::io::copy(&mut f, &mut zip)?;
        }
    }
    zip.finish()?;
    Ok(())
}
