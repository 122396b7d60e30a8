//! Core types for corral: Python package identity, Lambda environment
//! maps, deployment configuration, and bundle filesystem helpers.
//!
//! Provides the package model ([`package::Package`]), the case-normalized
//! environment map ([`environ::Environ`]), TOML configuration, and the
//! staging/zip helpers the bundler is built on.

pub mod config;
pub mod environ;
pub mod fsutil;
pub mod package;
