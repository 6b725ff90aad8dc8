use std::fmt;
use thiserror::Error;

/// Unified error type for all cachet operations.
///
/// This enum encompasses every failure mode across the cachet stack, from
/// catalog staleness to storage-level faults. Each variant includes
/// context-specific information to help diagnose and handle the error
/// appropriately.
///
/// # Error Handling Strategy
///
/// Errors propagate upward through the call stack using Rust's `?` operator.
/// At API boundaries they are typically converted to user-facing messages;
/// internal code matches on specific variants for fine-grained handling. The
/// retry decision is always the caller's: consult [`Error::is_retryable`]
/// before resubmitting a statement.
///
/// # Thread Safety
///
/// `Error` implements `Send` and `Sync`, allowing errors to be safely passed
/// between session threads.
#[derive(Error, Debug)]
pub enum Error {
    /// Arrow library error during columnar result construction.
    ///
    /// This error occurs when building Arrow arrays or record batches for
    /// statement results, and typically indicates a schema/array mismatch or
    /// an allocation failure inside Arrow.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Invalid user input or API parameter.
    ///
    /// This error indicates a problem with arguments passed to cachet APIs:
    /// - Malformed plans (empty column lists, arity mismatches)
    /// - References to columns a table does not have
    /// - Malformed identifiers (empty table or namespace names)
    ///
    /// The message string states what was invalid and why.
    ///
    /// # Recovery
    ///
    /// These errors are recoverable in the ordinary sense: fix the input and
    /// resubmit. They are not part of the cache-consistency protocol and are
    /// never reported as retryable.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// The targeted schema object does not exist at the current catalog
    /// version.
    ///
    /// Raised when a statement references a table that was never created, or
    /// was dropped. A dropped table surfaces this error on every session,
    /// including sessions whose cache still holds the retired object: the
    /// object being gone is a correctness-level statement error, not a
    /// consistency-protocol error, and is deliberately distinct from
    /// [`Error::CatalogVersionMismatch`].
    ///
    /// # Recovery
    ///
    /// Not retryable. The statement is wrong at the current schema; retrying
    /// cannot succeed until the object is recreated.
    #[error("table '{namespace}.{name}' does not exist")]
    ObjectNotFound {
        /// Namespace component of the missing object.
        namespace: String,
        /// Name component of the missing object.
        name: String,
    },

    /// The session's cached view of the catalog is behind the authoritative
    /// version.
    ///
    /// Raised by statement execution when planning resolved schema objects
    /// against catalog version `expected` but the authority is already at
    /// `found`. The engine performs the lazy cache refresh *before* returning
    /// this error, so an immediate caller-driven retry of the same statement
    /// is expected to succeed unless another concurrent schema change raced in
    /// (in which case it fails and refreshes again).
    ///
    /// # Recovery
    ///
    /// This is the one retryable error in the taxonomy. The engine never
    /// retries on its own; resubmission is an explicit caller decision.
    #[error(
        "Catalog Version Mismatch: statement planned against catalog version {expected} but the catalog is at version {found}"
    )]
    CatalogVersionMismatch {
        /// Catalog version the statement was planned against.
        expected: u64,
        /// Authoritative catalog version observed at the failure point.
        found: u64,
    },

    /// A proposed schema change lost the optimistic version race.
    ///
    /// Raised by the catalog store when a DDL request carries a base version
    /// that no longer matches the current catalog version: some other session
    /// committed a schema change first. The mutation is not applied and the
    /// version does not advance.
    ///
    /// # Recovery
    ///
    /// Never auto-retried. Re-issuing a structural change against a schema
    /// that moved underneath it may not be semantically equivalent, so the
    /// caller must re-derive the request against the new version and resubmit
    /// deliberately.
    #[error(
        "Catalog Version Mismatch: schema change planned against catalog version {base} but the catalog is at version {current}"
    )]
    DdlRejected {
        /// Base catalog version the request was planned against.
        base: u64,
        /// Catalog version found at the serialization point.
        current: u64,
    },

    /// A value's type is incompatible with the targeted column.
    ///
    /// Uses SQL-style type names so the message reads like an ordinary
    /// statement error, e.g. `column 'a' is of type boolean but expression is
    /// of type numeric`. Note that after a table is dropped and recreated with
    /// different column types, a refreshed session surfaces *this* error (a
    /// normal type error against the new schema), never a stale write against
    /// the old one.
    #[error("column '{column}' is of type {expected} but expression is of type {actual}")]
    TypeMismatch {
        /// Column whose declared type rejected the value.
        column: String,
        /// SQL name of the column's declared type.
        expected: String,
        /// SQL name of the supplied expression's type.
        actual: String,
    },

    /// Data or schema constraint violation.
    ///
    /// - Creating a table or column that already exists
    /// - NOT NULL violations
    /// - Row arity mismatches against the target column list
    #[error("Constraint Error: {0}")]
    ConstraintError(String),

    /// Opaque failure reported by the physical storage engine.
    ///
    /// The storage engine is an external collaborator; its failures are passed
    /// through unchanged and treated as fatal at this layer.
    #[error("storage engine fault: {0}")]
    StorageFault(String),

    /// Internal error indicating a bug or unexpected state.
    ///
    /// This error should never occur during normal operation. If you encounter
    /// it, it likely indicates a bug in cachet that should be reported with
    /// reproduction steps.
    #[error("An internal operation failed: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the caller may safely resubmit the same logical request.
    ///
    /// True exactly for [`Error::CatalogVersionMismatch`]: the session cache
    /// has already been refreshed, so the same statement re-planned against
    /// the new version is expected to succeed. Everything else, including
    /// [`Error::DdlRejected`], requires the caller to change something first.
    ///
    /// # Examples
    ///
    /// ```
    /// use cachet_result::Error;
    ///
    /// let stale = Error::CatalogVersionMismatch { expected: 3, found: 5 };
    /// assert!(stale.is_retryable());
    ///
    /// let rejected = Error::DdlRejected { base: 3, current: 5 };
    /// assert!(!rejected.is_retryable());
    /// ```
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::CatalogVersionMismatch { .. })
    }

    /// Create an [`Error::ObjectNotFound`] for the given qualified name.
    #[inline]
    pub fn object_not_found(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Error::ObjectNotFound {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create a storage fault from any displayable error.
    ///
    /// Convenience for adapting storage-engine error types while preserving
    /// the original message.
    #[inline]
    pub fn storage_fault<E: fmt::Display>(err: E) -> Self {
        Error::StorageFault(err.to_string())
    }
}
