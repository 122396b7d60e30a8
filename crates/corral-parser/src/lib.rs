//! Tree-sitter based Python source scanning for corral.
//!
//! Extracts top-level import names ([`imports`]) and discovers the
//! Lambda entry point with its docstring ([`handler`]).

pub mod handler;
pub mod imports;
