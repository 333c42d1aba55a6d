//! The presence lookup seam.

use std::future::Future;

use thiserror::Error;

use crate::status::RawPresenceRecord;
use crate::types::Identifier;

/// Per-poll lookup failures. Both are recoverable: the poll is skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The identifier does not resolve to any entity.
    #[error("identifier not found: {0}")]
    NotFound(String),
    /// Network or service failure.
    #[error("transient lookup failure: {0}")]
    Transient(String),
}

/// Looks up the current raw presence record for an identifier.
///
/// Implementations own their authenticated session; callers only resolve.
pub trait PresenceResolver {
    fn resolve(
        &self,
        identifier: &Identifier,
    ) -> impl Future<Output = Result<RawPresenceRecord, ResolveError>> + Send;
}

impl<T: PresenceResolver> PresenceResolver for &T {
    fn resolve(
        &self,
        identifier: &Identifier,
    ) -> impl Future<Output = Result<RawPresenceRecord, ResolveError>> + Send {
        (**self).resolve(identifier)
    }
}
