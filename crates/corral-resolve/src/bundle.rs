//! Stage a handler and its dependencies into a deployment zip.

use corral_core::fsutil;
use corral_core::package::Package;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Bundling failures. A dependency that resolved but vanished from disk
/// is fatal: a partial archive would deploy a function that fails on
/// import.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("handler file not found: {}", .0.display())]
    MissingHandler(PathBuf),
    #[error("dependency {name} not found at {}", path.display())]
    MissingDependency { name: String, path: PathBuf },
    #[error("failed to stage bundle: {0}")]
    Stage(String),
    #[error("failed to create staging directory: {0}")]
    TempDir(#[from] std::io::Error),
}

/// A finished deployment archive. The zip lives in the bundler's
/// temporary directory and is removed when the bundle is dropped.
#[derive(Debug)]
pub struct Bundle {
    archive: PathBuf,
    dependency_count: usize,
    _staging: TempDir,
}

impl Bundle {
    /// Packages staged next to the handler.
    pub fn dependency_count(&self) -> usize {
        self.dependency_count
    }

    /// Read the archive bytes for upload.
    pub fn read(&self) -> std::io::Result<Vec<u8>> {
        std::fs::read(&self.archive)
    }
}

/// Builds the deployment archive for one handler.
#[derive(Debug)]
pub struct Bundler {
    staging: TempDir,
}

impl Bundler {
    pub fn new() -> Result<Self, BundleError> {
        Ok(Self {
            staging: TempDir::new()?,
        })
    }

    /// Copy the handler file and each dependency's root into a fresh
    /// staging directory, then zip it. The archive holds one top-level
    /// entry per dependency plus the handler itself, all at the archive
    /// root so the Lambda runtime can import them directly.
    pub fn bundle(
        self,
        handler: &Path,
        deps: &BTreeSet<Package>,
    ) -> Result<Bundle, BundleError> {
        if !handler.is_file() {
            return Err(BundleError::MissingHandler(handler.to_path_buf()));
        }

        let stage = self.staging.path().join("bundle");
        std::fs::create_dir(&stage)?;
        fsutil::copy_into(handler, &stage).map_err(|e| BundleError::Stage(e.to_string()))?;

        for pkg in deps {
            // checking the entry file also catches a package directory
            // that lost its __init__.py after resolution
            let entry = pkg.entry_file();
            if !entry.exists() {
                return Err(BundleError::MissingDependency {
                    name: pkg.name.clone(),
                    path: entry,
                });
            }
            fsutil::copy_into(&pkg.path, &stage).map_err(|e| BundleError::Stage(e.to_string()))?;
            tracing::debug!("staged {} from {}", pkg.name, pkg.path.display());
        }

        let archive = self.staging.path().join("lambda.zip");
        fsutil::zip_dir(&stage, &archive).map_err(|e| BundleError::Stage(e.to_string()))?;
        tracing::info!(
            "bundled {} with {} dependencies",
            handler.display(),
            deps.len()
        );

        Ok(Bundle {
            archive,
            dependency_count: deps.len(),
            _staging: self.staging,
        })
    }
}
