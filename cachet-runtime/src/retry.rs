//! Caller-side bounded retry loop for retryable statement errors.

use cachet_result::{Error, Result};

/// Run `op` up to `max_attempts` times, retrying only on
/// [retryable](Error::is_retryable) errors.
///
/// The engine never retries inside one logical request: a caller's request
/// may be part of a larger client-side protocol step that must not be
/// replayed silently. This helper is the explicit caller-side construct for
/// the common "first attempt fails on a schema change, deliberate second
/// attempt succeeds" pattern.
///
/// # Examples
///
/// ```
/// use cachet_result::{Error, Result};
/// use cachet_runtime::with_catalog_retries;
///
/// let mut attempts = 0;
/// let value: Result<i32> = with_catalog_retries(2, || {
///     attempts += 1;
///     if attempts == 1 {
///         Err(Error::CatalogVersionMismatch { expected: 1, found: 2 })
///     } else {
///         Ok(attempts)
///     }
/// });
/// assert_eq!(value.unwrap(), 2);
/// ```
pub fn with_catalog_retries<T, F>(max_attempts: usize, mut op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    if max_attempts == 0 {
        return Err(Error::InvalidArgumentError(
            "retry budget must allow at least one attempt".into(),
        ));
    }

    let mut attempt = 0;
    loop {
        attempt += 1;
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                tracing::debug!(attempt, "retrying statement after catalog refresh");
            }
            Err(err) => return Err(err),
        }
    }
}
