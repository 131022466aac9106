//! PDF writing.
//!
//! ## Architecture
//!
//! ```text
//! Document (object table + trailer)
//!     ↓
//! [Document::save_to_vec] (header, body, xref, trailer)
//!     ↓
//! [ObjectSerializer] (serializes PDF objects)
//!     ↓
//! PDF bytes
//! ```
//!
//! ## Example
//!
//! ```
//! use pdf_graft::editor::create_blank_document;
//! use pdf_graft::writer::SaveOptions;
//!
//! let doc = create_blank_document(612.0, 792.0)?;
//! let bytes = doc.save_to_vec(&SaveOptions::default().with_compress(true))?;
//! assert!(bytes.starts_with(b"%PDF-1.7"));
//! # Ok::<(), pdf_graft::error::Error>(())
//! ```

mod object_serializer;
mod pdf_writer;

pub use object_serializer::ObjectSerializer;
pub use pdf_writer::SaveOptions;
