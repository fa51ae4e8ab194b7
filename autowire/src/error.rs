//! Error types for the autowire resolution engine.
//!
//! This module defines a lightweight error model used across the container to
//! describe failures that can occur during provider registration, resolution
//! and access to cycle placeholders.
//!
//! # Design
//!
//! - `ErrorKind` captures the error category.
//! - `Error` stores the category and a human-readable message.
//!
//! Resolution errors (`ErrorKind::Resolution`) are routinely caught by the
//! resolver itself: an `Optional` query turns them into an absent value, a
//! `Union` moves on to its next arm, a defaulted parameter falls back to its
//! default. [`Error::is_resolution`] is the predicate those sites use.
//!
//! # Feature Flags
//!
//! - `tracing`: logs errors at debug level when they are created.
//!
//! # Examples
//!
//! ```
//! use autowire::error::{Error, ErrorKind, ResolutionKind};
//!
//! let err = Error::no_provider("MyService");
//! assert!(err.message.contains("MyService"));
//! assert_eq!(err.kind, ErrorKind::Resolution(ResolutionKind::NoProvider));
//! assert!(err.is_resolution());
//! ```

#[cfg(feature = "tracing")]
use tracing::debug;

/// Why a query could not be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    /// No provider produced a value for the requested type.
    NoProvider,
    /// Every arm of a union query failed.
    NoUnionBranch,
}

/// Error categories for the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A descriptor outside the supported grammar was used at registration time.
    UnsupportedAnnotation,
    /// A query could not be satisfied.
    Resolution(ResolutionKind),
    /// A cycle placeholder was accessed before (or instead of) being bound.
    ProxyNotBound,
    /// A resolved value did not have the shape its typed extractor expected.
    TypeMismatch,
    /// Registration was attempted while a lazy resolution view borrows the registry.
    RegistryLocked,
}

/// Container error structure.
///
/// `kind` enables programmatic handling, while `message` is human-readable.
#[derive(Debug, Clone, thiserror::Error)]
#[error("({kind:?}) - {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    /// Creates a new error with the given kind and message.
    ///
    /// If the `tracing` feature is enabled, the error is logged at debug level.
    /// Most resolution errors are recovered from locally, so they are not
    /// worth more than that.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let error = Self {
            kind,
            message: message.into(),
        };

        #[cfg(feature = "tracing")]
        debug!("{}", error);

        error
    }

    /// The descriptor cannot be expressed by the engine.
    pub fn unsupported_annotation(descriptor: &str, reason: &str) -> Self {
        Self::new(
            ErrorKind::UnsupportedAnnotation,
            format!("Unsupported type descriptor {}: {}", descriptor, reason),
        )
    }

    /// No provider yielded a value for the query.
    pub fn no_provider(query: &str) -> Self {
        Self::new(
            ErrorKind::Resolution(ResolutionKind::NoProvider),
            format!(
                "Container is not able to resolve type: {}. Make sure it is registered in the container",
                query
            ),
        )
    }

    /// Candidates existed for the query but none of them could be constructed.
    pub fn no_constructible_provider(query: &str, cause: &Error) -> Self {
        Self::new(
            ErrorKind::Resolution(ResolutionKind::NoProvider),
            format!(
                "Container is not able to resolve type: {}. Last candidate failed with: {}",
                query, cause.message
            ),
        )
    }

    /// All arms of a union query failed.
    pub fn no_union_branch(query: &str) -> Self {
        Self::new(
            ErrorKind::Resolution(ResolutionKind::NoUnionBranch),
            format!("No arm of {} could be resolved", query),
        )
    }

    /// A cycle placeholder was accessed while unbound.
    pub fn proxy_not_bound(target: &str) -> Self {
        Self::new(
            ErrorKind::ProxyNotBound,
            format!(
                "Proxy for {} is not bound yet; it cannot be used inside the constructor that closed the cycle",
                target
            ),
        )
    }

    /// A cycle placeholder whose construction failed was accessed.
    pub fn proxy_failed(target: &str) -> Self {
        Self::new(
            ErrorKind::ProxyNotBound,
            format!(
                "Proxy for {} will never be bound: its construction failed",
                target
            ),
        )
    }

    /// Type mismatch during extraction of a resolved value.
    pub fn type_mismatch(expected: &str, found: &str) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            format!("Type mismatch: expected {}, found {}", expected, found),
        )
    }

    /// The registry is borrowed by a live lazy view.
    pub fn registry_locked() -> Self {
        Self::new(
            ErrorKind::RegistryLocked,
            "Cannot register providers while a lazy resolution is in progress",
        )
    }

    /// Whether this error is a `ResolutionError` that the resolver may recover from.
    pub fn is_resolution(&self) -> bool {
        matches!(self.kind, ErrorKind::Resolution(_))
    }
}
