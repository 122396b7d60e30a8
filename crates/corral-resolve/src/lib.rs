//! Dependency resolution for Python handlers.
//!
//! Classifies each imported name as standard library, site package, or
//! local module, walks the transitive requirement closure through import
//! scans and distribution metadata, and stages the result into a
//! deployment zip.

pub mod bundle;
pub mod interp;
pub mod metadata;
pub mod resolver;
