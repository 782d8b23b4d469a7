//! Cross-pipeline error taxonomy.
//!
//! Every fallible operation in the backend returns `Result<T, CompileError>`.
//! Library code never aborts the process; only the top-level driver
//! (`src/bin/rv32cc.rs`) is allowed to translate an error into an exit code.

use std::path::PathBuf;

use thiserror::Error;

/// A single cross-pipeline error enum, following the shape of
/// `cranelift-codegen`'s `CodegenResult` but covering the full taxonomy of
/// spec.md §7 (syntax/semantic errors are reported by the demo front end,
/// not the backend, but share this enum so the driver has one thing to
/// match on).
#[derive(Debug, Error)]
pub enum CompileError {
    /// The input file could not be opened or read.
    #[error("cannot read input file {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A syntax error in the demo front end, reported with a source location.
    #[error("{path}:{line}:{column}: syntax error: {message}")]
    Syntax {
        path: PathBuf,
        line: u32,
        column: u32,
        message: String,
    },

    /// A semantic error (undeclared variable, duplicate declaration, ...).
    #[error("{path}:{line}: semantic error: {message}")]
    Semantic {
        path: PathBuf,
        line: u32,
        message: String,
    },

    /// An internal invariant was violated. This always indicates a bug in
    /// the backend itself, never bad input.
    #[error("internal invariant violated: {0}")]
    Internal(String),

    /// The assembly output file could not be written.
    #[error("cannot write output file {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    /// Construct an [`CompileError::Internal`] from a formatted message.
    ///
    /// Centralising this makes it easy to grep for every invariant check in
    /// the backend.
    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::Internal(message.into())
    }
}

/// Convenience alias used throughout the backend.
pub type CompileResult<T> = Result<T, CompileError>;
