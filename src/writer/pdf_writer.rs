//! Document writer.
//!
//! Writes a document's object table as a complete PDF file: header, body,
//! classic xref table and trailer.

use super::object_serializer::ObjectSerializer;
use crate::config::DocumentConfig;
use crate::document::Document;
use crate::error::Result;
use crate::object::Object;
use bytes::Bytes;
use std::io::Write;

/// Options for [`Document::save_to_vec`] and [`Document::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    /// PDF version written in the header (e.g., "1.7")
    pub version: String,
    /// Deflate streams that have no `/Filter`
    pub compress: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self::from_config(&DocumentConfig::default())
    }
}

impl SaveOptions {
    /// Options using the document's configured defaults.
    pub fn from_config(config: &DocumentConfig) -> Self {
        Self {
            version: "1.7".to_string(),
            compress: config.compress_streams,
        }
    }

    /// Enable or disable stream compression.
    ///
    /// When enabled, unfiltered streams are compressed with FlateDecode
    /// (zlib/deflate).
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Set the header version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// Compress data using Flate/Deflate compression.
fn compress_data(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Deflate an unfiltered stream; anything else is returned as is.
fn compress_stream(obj: &Object) -> std::io::Result<Option<Object>> {
    match obj {
        Object::Stream { dict, data } if !dict.contains_key("Filter") => {
            let compressed = compress_data(data)?;
            let mut dict = dict.clone();
            dict.insert("Filter".to_string(), Object::name("FlateDecode"));
            Ok(Some(Object::Stream {
                dict,
                data: Bytes::from(compressed),
            }))
        },
        _ => Ok(None),
    }
}

impl Document {
    /// Serialize the document to PDF bytes.
    ///
    /// Object numbers that were never filled or have been deleted are
    /// written as free xref entries.
    pub fn save_to_vec(&self, options: &SaveOptions) -> Result<Vec<u8>> {
        let serializer = ObjectSerializer::compact();
        let mut output = Vec::new();
        let size = self.count_objects();
        let mut offsets: Vec<Option<usize>> = vec![None; size as usize];

        writeln!(output, "%PDF-{}", options.version)?;
        // Binary marker (recommended for binary content)
        output.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

        for (r, obj) in self.iter_objects() {
            offsets[r.id as usize] = Some(output.len());
            let compressed = if options.compress {
                compress_stream(obj)?
            } else {
                None
            };
            serializer.write_indirect(&mut output, r.id, r.gen, compressed.as_ref().unwrap_or(obj))?;
        }

        let free: Vec<u32> = (1..size).filter(|&n| offsets[n as usize].is_none()).collect();
        log::debug!(
            "saving document {}: {} objects, {} free entries",
            self.id(),
            size as usize - 1 - free.len(),
            free.len()
        );

        let xref_start = output.len();
        writeln!(output, "xref")?;
        writeln!(output, "0 {}", size)?;

        // Free entries form a linked list through object 0
        let next_free = |n: u32| free.iter().copied().find(|&f| f > n).unwrap_or(0);
        writeln!(output, "{:010} 65535 f ", next_free(0))?;
        for number in 1..size {
            match offsets[number as usize] {
                Some(offset) => writeln!(output, "{:010} 00000 n ", offset)?,
                None => writeln!(output, "{:010} 00001 f ", next_free(number))?,
            }
        }

        let mut trailer = match self.trailer() {
            Object::Dictionary(dict) => dict.clone(),
            _ => Default::default(),
        };
        trailer.insert("Size".to_string(), Object::Integer(size as i64));

        writeln!(output, "trailer")?;
        serializer.write_object(&mut output, &Object::Dictionary(trailer))?;
        writeln!(output)?;
        writeln!(output, "startxref")?;
        writeln!(output, "{}", xref_start)?;
        write!(output, "%%EOF")?;

        Ok(output)
    }

    /// Save the document to a file.
    pub fn save(&self, path: impl AsRef<std::path::Path>, options: &SaveOptions) -> Result<()> {
        let bytes = self.save_to_vec(options)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    #[test]
    fn test_save_empty_document() {
        let doc = Document::new();
        let content = text(&doc.save_to_vec(&SaveOptions::default()).unwrap());

        assert!(content.starts_with("%PDF-1.7"));
        assert!(content.contains("/Type /Catalog"));
        assert!(content.contains("/Type /Pages"));
        assert!(content.contains("xref\n0 3\n"));
        assert!(content.contains("/Root 2 0 R /Size 3"));
        assert!(content.ends_with("%%EOF"));
    }

    #[test]
    fn test_deleted_objects_are_free_entries() {
        let mut doc = Document::new();
        let a = doc.add_object(Object::Integer(1));
        let b = doc.add_object(Object::Integer(2));
        doc.add_object(Object::Integer(3));
        doc.delete_object(a.id).unwrap();
        doc.delete_object(b.id).unwrap();

        let content = text(&doc.save_to_vec(&SaveOptions::default()).unwrap());
        // 0 -> 3 -> 4 -> 0
        assert!(content.contains("0000000003 65535 f \n"));
        assert!(content.contains("0000000004 00001 f \n"));
        assert!(content.contains("0000000000 00001 f \n"));
        assert!(!content.contains("3 0 obj"));
        assert!(content.contains("5 0 obj\n3\nendobj"));
    }

    #[test]
    fn test_compress_streams() {
        let mut doc = Document::new();
        let data = vec![b'x'; 1000];
        doc.add_stream(data.clone(), Object::Null).unwrap();

        let plain = doc.save_to_vec(&SaveOptions::default()).unwrap();
        let packed = doc
            .save_to_vec(&SaveOptions::default().with_compress(true))
            .unwrap();
        assert!(packed.len() < plain.len());
        assert!(text(&packed).contains("/Filter /FlateDecode"));
        assert!(!text(&plain).contains("/Filter"));
    }

    #[test]
    fn test_options_follow_config() {
        let config = DocumentConfig::new().with_compress_streams(true);
        assert!(SaveOptions::from_config(&config).compress);
        assert!(!SaveOptions::default().compress);
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let doc = Document::new();
        let bytes = doc.save_to_vec(&SaveOptions::default()).unwrap();
        let content = text(&bytes);
        let offset = content.find("1 0 obj").unwrap();
        assert!(content.contains(&format!("{:010} 00000 n ", offset)));
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.pdf");
        let doc = Document::new();
        doc.save(&path, &SaveOptions::default()).unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, doc.save_to_vec(&SaveOptions::default()).unwrap());
    }
}
