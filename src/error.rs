//! Error types for the PDF engine.
//!
//! Unrecoverable errors bubble up through `Result`. Recoverable conditions in
//! lenient mode are downgraded to entries in the document warning list
//! instead of surfacing here.

/// Result type alias for PDF engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while parsing, mutating, or writing a PDF.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or invalid header, unsupported version, or no catalog.
    #[error("Invalid PDF structure: {0}")]
    Structure(String),

    /// Invalid cross-reference table or stream, or missing startxref.
    #[error("Invalid cross-reference data: {0}")]
    XRefParse(String),

    /// Malformed object body, unterminated container, unexpected token.
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ObjectParse {
        /// Byte offset where parsing failed
        offset: usize,
        /// Reason for the failure
        reason: String,
    },

    /// Object nesting exceeded the hard limit.
    #[error("Maximum object nesting depth exceeded (limit: {0})")]
    MaxDepthExceeded(usize),

    /// A cross-reference /Prev chain or page-tree walk revisited a node.
    #[error("Circular reference detected at {0}")]
    CircularReference(String),

    /// The /Encrypt dictionary could not be interpreted.
    #[error("Malformed encryption dictionary: {0}")]
    EncryptionDict(String),

    /// A protected operation was attempted without owner access.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Supplied credentials do not match the installed security handler.
    #[error("Unsupported credentials: {0}")]
    UnsupportedCredentials(String),

    /// The byte writer exceeded its configured maximum size.
    #[error("Writer exceeded maximum output size of {0} bytes")]
    WriterOverflow(usize),

    /// Referenced object not found.
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Stream decoding failed.
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Stream filter name not recognized by the pipeline.
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),
}

impl Error {
    /// Whether lenient-mode loading may respond to this error by switching
    /// to brute-force recovery. Writer and permission failures never are.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Structure(_)
                | Error::XRefParse(_)
                | Error::ObjectParse { .. }
                | Error::CircularReference(_)
                | Error::ObjectNotFound(_, _)
                | Error::Decode(_)
        )
    }
}
