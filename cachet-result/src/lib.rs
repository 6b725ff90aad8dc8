//! Error types and result definitions for the cachet catalog-cache core.
//!
//! This crate provides a unified error type ([`Error`]) and result type alias
//! ([`Result<T>`]) used throughout all cachet crates. All operations that could
//! fail return `Result<T>`, where the error variant carries enough context to
//! decide how to react.
//!
//! # Error Philosophy
//!
//! Cachet uses a single error enum ([`Error`]) rather than crate-specific error
//! types. This approach:
//! - Simplifies error handling across crate boundaries
//! - Allows errors to propagate naturally with the `?` operator
//! - Keeps the retryable/fatal distinction in one place ([`Error::is_retryable`])
//! - Enables structured error matching for programmatic handling
//!
//! # Error Categories
//!
//! Callers coordinating schema changes across sessions care about three broad
//! categories, all distinguishable by variant:
//!
//! - **Retryable staleness** ([`Error::CatalogVersionMismatch`]): the session's
//!   cached view of the catalog fell behind; the cache has already been
//!   refreshed, so resubmitting the same statement is expected to succeed.
//! - **Rejected schema changes** ([`Error::DdlRejected`]): a schema mutation was
//!   planned against a catalog version that is no longer current. Never retried
//!   by the engine; the caller must re-plan deliberately.
//! - **Ordinary statement errors** ([`Error::ObjectNotFound`],
//!   [`Error::TypeMismatch`], [`Error::ConstraintError`], ...): correctness-level
//!   failures that retrying cannot fix.

#![forbid(unsafe_code)]

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;
