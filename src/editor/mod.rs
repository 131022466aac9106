//! Page editing for in-memory documents.
//!
//! This module provides the page-level operations built on top of the
//! object table and graft sessions:
//! - Copy, insert and delete pages ([`PageEditing`])
//! - Reorder the page list
//! - Merge pages from another document
//! - Split a document into several
//!
//! ## Example
//!
//! ```
//! use pdf_graft::editor::{create_blank_document, MergeOptions, PageEditing};
//!
//! let mut doc = create_blank_document(595.0, 842.0)?;
//! doc.new_page(-1, 612.0, 792.0)?;
//! doc.copy_page(0, -1)?;
//! doc.delete_pages(1)?;
//!
//! let other = create_blank_document(300.0, 300.0)?;
//! doc.merge(&other, MergeOptions::new().with_start_at(0))?;
//! assert_eq!(doc.page_count(), 3);
//!
//! let parts = doc.split(None)?;
//! assert_eq!(parts.len(), 3);
//! # Ok::<(), pdf_graft::error::Error>(())
//! ```

mod page_ops;
mod selection;

pub use page_ops::{create_blank_document, split, MergeOptions, PageEditing};
pub use selection::PageSelection;
