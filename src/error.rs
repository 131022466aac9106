//! Error types for the object graph library.
//!
//! Usage errors (bad page numbers, bad object numbers, mismatched graft
//! sessions) are reported through [`Error`]. Absence is never an error: a
//! missing dictionary key or a dangling reference reads as `Null`.
//! Resource-lifetime violations are not represented here; they panic.

use crate::document::DocumentId;
use crate::object::ObjectRef;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reading or editing a document graph.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// Referenced object is not present in the object table
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object number outside the range allocated by the document
    #[error("Object number {number} out of range (document has {count} object numbers)")]
    ObjectNumberOutOfRange {
        /// Offending object number
        number: u32,
        /// Number of object numbers handed out so far (including 0)
        count: u32,
    },

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// Array index past the end of the array
    #[error("Array index {index} out of range (array has {len} elements)")]
    ArrayIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Array length
        len: usize,
    },

    /// Page index outside the document
    #[error("Bad page number: {index} (document has {page_count} pages)")]
    PageIndexOutOfRange {
        /// Requested page index
        index: i64,
        /// Number of pages in the document
        page_count: usize,
    },

    /// Page object that is already listed in the page tree
    #[error("Page {0} is already in the page tree")]
    PageAlreadyInTree(ObjectRef),

    /// A page selection that cannot be applied to the document
    #[error("{reason} in {shape} selection: {index} (document has {page_count} pages)")]
    InvalidPageSelection {
        /// Which selection shape was given ("single", "range", "span", "list")
        shape: &'static str,
        /// Human readable reason ("Bad page number" / "Bad page number(s)")
        reason: &'static str,
        /// Offending index as given (before wraparound)
        index: i64,
        /// Number of pages in the document
        page_count: usize,
    },

    /// Split boundaries that do not partition the document
    #[error("Invalid split boundary {boundary}: {reason}")]
    InvalidSplitBoundary {
        /// Offending boundary
        boundary: i64,
        /// Reason for rejection
        reason: String,
    },

    /// Page rotation that is not a multiple of 90
    #[error("Invalid rotation: {0} (expected 0, 90, 180 or 270)")]
    InvalidRotation(i32),

    /// Page dimensions that are not positive
    #[error("Invalid page dimensions: {width}x{height}")]
    InvalidPageSize {
        /// Requested width
        width: f64,
        /// Requested height
        height: f64,
    },

    /// Graft map used with a source document other than the one it is bound to
    #[error("Graft map is bound to source document {expected}, got {found}")]
    GraftSourceMismatch {
        /// Source the map was bound to
        expected: DocumentId,
        /// Source passed in
        found: DocumentId,
    },

    /// Graft map used with a target document other than the one that created it
    #[error("Graft map belongs to target document {expected}, got {found}")]
    GraftTargetMismatch {
        /// Target that created the map
        expected: DocumentId,
        /// Target passed in
        found: DocumentId,
    },

    /// Recursion depth limit exceeded
    #[error("Recursion depth limit exceeded (max: {0})")]
    RecursionLimitExceeded(u32),

    /// Invalid document structure (generic)
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Unsupported stream filter
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if error is a usage error (bad arguments from the caller).
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::ObjectNumberOutOfRange { .. }
                | Self::ArrayIndexOutOfRange { .. }
                | Self::PageIndexOutOfRange { .. }
                | Self::PageAlreadyInTree(_)
                | Self::InvalidPageSelection { .. }
                | Self::InvalidSplitBoundary { .. }
                | Self::InvalidRotation(_)
                | Self::InvalidPageSize { .. }
                | Self::GraftSourceMismatch { .. }
                | Self::GraftTargetMismatch { .. }
        )
    }
}
