//! Error types for the marquise spool client.

use thiserror::Error;

/// The main error type for all marquise client operations.
///
/// This enum covers all possible error conditions that can occur during
/// client operations, from handle construction through datapoint dispatch
/// and source metadata submission.
#[derive(Error, Debug)]
pub enum MarquiseError {
    /// Error constructing or using a handle.
    #[error("handle error: {0}")]
    Handle(#[from] HandleError),

    /// Error in the address-or-source arguments of a request.
    #[error("request error: {0}")]
    Request(#[from] RequestError),

    /// Error validating a source dictionary.
    #[error("source dictionary error: {0}")]
    Source(#[from] SourceError),

    /// Error initializing or writing the spool.
    #[error("spool error: {0}")]
    Spool(#[from] SpoolError),
}

/// Errors that can occur during handle construction and lifecycle.
#[derive(Error, Debug)]
pub enum HandleError {
    /// The namespace contains characters outside `[a-z0-9]`.
    #[error("invalid namespace '{namespace}': must be lowercase alphanumeric")]
    InvalidNamespace {
        /// The rejected namespace.
        namespace: String,
    },

    /// The namespace does not fit in a spool directory name.
    #[error("namespace is too long for the spool filesystem (os error {code})")]
    NamespaceTooLong {
        /// The raw OS error code (ENAMETOOLONG on Linux).
        code: i32,
    },

    /// The handle has been closed; no further operations are possible.
    #[error("handle is closed")]
    Closed,
}

/// Errors in the address-or-source arguments of a request.
///
/// Every dispatch and submit operation resolves its address from exactly one
/// of an explicit address or a textual source identifier. These errors are
/// detected locally, before anything reaches the spool.
#[derive(Error, Debug)]
pub enum RequestError {
    /// Neither an address nor a source identifier was supplied.
    #[error("either an `address` or a `source` identifier is required")]
    MissingAddress,

    /// Both an address and a source identifier were supplied.
    #[error("supply an `address` or a `source` identifier, not both")]
    ConflictingAddress,
}

/// Errors that can occur while validating a source dictionary.
///
/// The UTF-8 checks run before the separator checks: a dictionary with both
/// defects reports the conversion failure.
#[derive(Error, Debug)]
pub enum SourceError {
    /// A key is not valid UTF-8.
    #[error("source dictionary key {key:?} is not valid UTF-8")]
    KeyNotUtf8 {
        /// The offending key bytes.
        key: Vec<u8>,
    },

    /// A value is not valid UTF-8.
    #[error("source dictionary value for key '{key}' is not valid UTF-8")]
    ValueNotUtf8 {
        /// The key whose value failed conversion.
        key: String,
    },

    /// Two pairs share the same key.
    #[error("duplicate source dictionary key '{key}'")]
    DuplicateKey {
        /// The duplicated key.
        key: String,
    },

    /// A key contains the reserved `:` field separator.
    #[error("source dictionary key '{key}' contains the reserved ':' separator")]
    KeySeparator {
        /// The offending key.
        key: String,
    },

    /// A value contains the reserved `:` field separator.
    #[error("source dictionary value for key '{key}' contains the reserved ':' separator")]
    ValueSeparator {
        /// The key whose value is invalid.
        key: String,
    },
}

/// Errors raised by the spool backend.
#[derive(Error, Debug)]
pub enum SpoolError {
    /// Spool initialization failed.
    #[error("failed to initialize spool at '{path}' (os error {code}): {source}")]
    Init {
        /// The path that could not be created.
        path: String,
        /// The raw OS error code, or -1 if none was reported.
        code: i32,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A datapoint or source record write failed.
    #[error("failed to write to spool file '{path}' (os error {code}): {source}")]
    WriteFailed {
        /// The spool file path.
        path: String,
        /// The raw OS error code, or -1 if none was reported.
        code: i32,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The spool refused a source record with a nonzero code.
    #[error("spool rejected source record (code {code})")]
    UpdateRejected {
        /// The nonzero spool return code.
        code: i32,
    },

    /// Writing the spool metadata file failed.
    #[error("failed to write spool metadata '{path}': {source}")]
    MetadataWrite {
        /// The metadata file path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Serializing the spool metadata failed.
    #[error("failed to serialize spool metadata: {0}")]
    MetadataSerialize(#[from] serde_json::Error),
}

/// Type alias for `Result<T, MarquiseError>`.
pub type Result<T> = std::result::Result<T, MarquiseError>;
