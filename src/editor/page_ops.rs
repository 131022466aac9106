//! Page-level editing: copy, delete, insert, reorder, merge and split.

use super::selection::PageSelection;
use crate::document::{normalize_rotation, Document};
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use std::collections::HashSet;
use std::sync::Arc;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// Annotation subtypes that are not carried over by [`PageEditing::merge`].
const SKIPPED_ANNOTATIONS: [&str; 3] = ["Link", "Widget", "Popup"];

/// Options for [`PageEditing::merge`].
///
/// Page bounds are clamped to the source document rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeOptions {
    /// First source page (clamped into the source)
    pub from_page: i64,
    /// Last source page; negative means the last page
    pub to_page: i64,
    /// Target position of the first merged page; negative appends
    pub start_at: i64,
    /// Rotation of the created pages (multiple of 90)
    pub rotate: i32,
    /// Re-create URI links
    pub copy_links: bool,
    /// Re-create annotations (subtype, rectangle, contents and author)
    pub copy_annotations: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeOptions {
    /// Merge the whole source, appended, unrotated, with links and annotations.
    pub fn new() -> Self {
        Self {
            from_page: 0,
            to_page: -1,
            start_at: -1,
            rotate: 0,
            copy_links: true,
            copy_annotations: true,
        }
    }

    /// Set the source page range.
    pub fn with_pages(mut self, from_page: i64, to_page: i64) -> Self {
        self.from_page = from_page;
        self.to_page = to_page;
        self
    }

    /// Set the insertion point in the target.
    pub fn with_start_at(mut self, start_at: i64) -> Self {
        self.start_at = start_at;
        self
    }

    /// Set the rotation of merged pages.
    pub fn with_rotate(mut self, rotate: i32) -> Self {
        self.rotate = rotate;
        self
    }

    /// Enable or disable link copying.
    pub fn with_copy_links(mut self, enable: bool) -> Self {
        self.copy_links = enable;
        self
    }

    /// Enable or disable annotation copying.
    pub fn with_copy_annotations(mut self, enable: bool) -> Self {
        self.copy_annotations = enable;
        self
    }
}

/// Page operations on a document.
pub trait PageEditing {
    /// Duplicate page `index` and insert the copy before `to` (`-1` appends).
    ///
    /// The copy shares contents and resources with the original.
    fn copy_page(&mut self, index: usize, to: i64) -> Result<ObjectRef>;

    /// Delete the selected pages. Returns how many were removed.
    fn delete_pages(&mut self, selection: impl Into<PageSelection>) -> Result<usize>;

    /// Insert an empty page of the given size before `at` (`-1` appends).
    fn new_page(&mut self, at: i64, width: f64, height: f64) -> Result<ObjectRef>;

    /// Rebuild the page list from `order`, a list of current page indices.
    ///
    /// Pages left out are removed; a page listed twice is duplicated.
    fn rearrange_pages(&mut self, order: &[usize]) -> Result<()>;

    /// Copy pages of `source` into this document. Returns how many pages
    /// were added.
    fn merge(&mut self, source: &Document, options: MergeOptions) -> Result<usize>;
}

impl PageEditing for Document {
    fn copy_page(&mut self, index: usize, to: i64) -> Result<ObjectRef> {
        let count = self.page_count();
        let page = self.find_page(index)?;
        if to < -1 || to > count as i64 {
            return Err(Error::PageIndexOutOfRange {
                index: to,
                page_count: count,
            });
        }
        let copy = self.detached_copy(page);
        self.insert_page(to, copy)?;
        log::debug!("copied page {} to {}", index, to);
        Ok(copy)
    }

    fn delete_pages(&mut self, selection: impl Into<PageSelection>) -> Result<usize> {
        let pages = selection.into().resolve(self.page_count())?;
        // Highest first, so earlier deletions do not shift pending indices.
        for &index in pages.iter().rev() {
            self.delete_page(index)?;
        }
        log::debug!("deleted {} pages", pages.len());
        Ok(pages.len())
    }

    fn new_page(&mut self, at: i64, width: f64, height: f64) -> Result<ObjectRef> {
        let count = self.page_count();
        if at < -1 || at > count as i64 {
            return Err(Error::PageIndexOutOfRange {
                index: at,
                page_count: count,
            });
        }
        let page = self.add_page([0.0, 0.0, width, height], 0, Object::Null, Object::Null)?;
        self.insert_page(at, page)?;
        Ok(page)
    }

    fn rearrange_pages(&mut self, order: &[usize]) -> Result<()> {
        let pages = self.page_refs();
        if let Some(&bad) = order.iter().find(|&&i| i >= pages.len()) {
            return Err(Error::PageIndexOutOfRange {
                index: bad as i64,
                page_count: pages.len(),
            });
        }
        let root = self
            .pages_root()
            .ok_or_else(|| Error::InvalidPdf("catalog has no /Pages tree".to_string()))?;

        // The tree is flattened under the root, so inherited values must move
        // onto the pages first.
        for &page in &pages {
            self.materialize_inherited(page)?;
        }

        let mut used = HashSet::new();
        let mut kids = Vec::with_capacity(order.len());
        for &index in order {
            let mut page = pages[index];
            if !used.insert(page.id) {
                page = self.detached_copy(page);
            }
            self.put(page, "Parent", root)?;
            kids.push(Object::Reference(page));
        }
        let count = kids.len();
        self.put(root, "Kids", Object::Array(kids))?;
        self.put(root, "Count", count)?;
        log::debug!("rearranged pages: {} -> {}", pages.len(), count);
        Ok(())
    }

    fn merge(&mut self, source: &Document, options: MergeOptions) -> Result<usize> {
        let rotate = normalize_rotation(options.rotate)?;
        let source_count = source.page_count();
        if source_count == 0 {
            return Ok(0);
        }

        let last = source_count as i64 - 1;
        let mut from = options.from_page.clamp(0, last);
        let mut to = if options.to_page < 0 {
            last
        } else {
            options.to_page.min(last)
        };
        if from > to {
            std::mem::swap(&mut from, &mut to);
        }
        let target_count = self.page_count() as i64;
        let start = if options.start_at < 0 {
            target_count
        } else {
            options.start_at.min(target_count)
        };

        let mut map = self.new_graft_map();
        for (offset, source_index) in (from..=to).enumerate() {
            let source_index = source_index as usize;
            let source_page = Object::Reference(source.find_page(source_index)?);
            let bounds = normalize_rect(source.page_bounds(source_index)?);
            let resources =
                map.graft_object(self, source, source.get_inheritable(&source_page, "Resources"))?;
            let contents =
                map.graft_object(self, source, source.get_inheritable(&source_page, "Contents"))?;

            let page = self.add_page(bounds, rotate, resources, contents)?;
            let at = start + offset as i64;
            self.insert_page(at, page)?;

            if options.copy_links || options.copy_annotations {
                self.copy_page_annotations(source, source_index, at as usize, &options)?;
            }
        }

        let merged = (to - from + 1) as usize;
        log::debug!(
            "merged {} pages from {} into {} at {}",
            merged,
            source.id(),
            self.id(),
            start
        );
        Ok(merged)
    }
}

impl Document {
    /// Copy of a page object without `/Parent` or `/Annots`, with inherited
    /// attributes written onto the copy.
    ///
    /// Annotation objects point back at their page through `/P`, so the copy
    /// starts without any.
    fn detached_copy(&mut self, page: ObjectRef) -> ObjectRef {
        let page_obj = Object::Reference(page);
        let mut copy = self.resolve_ref(page).clone();
        if let Some(dict) = copy.as_dict_mut() {
            dict.shift_remove("Parent");
            dict.shift_remove("Annots");
            for key in INHERITABLE_KEYS {
                if !dict.contains_key(key) {
                    let value = self.get_inheritable(&page_obj, key);
                    if !value.is_null() {
                        dict.insert(key.to_string(), value.clone());
                    }
                }
            }
        }
        self.add_object(copy)
    }

    fn materialize_inherited(&mut self, page: ObjectRef) -> Result<()> {
        let page_obj = Object::Reference(page);
        let missing: Vec<(&str, Object)> = INHERITABLE_KEYS
            .iter()
            .filter(|key| {
                self.resolve_ref(page)
                    .as_dict()
                    .map_or(false, |d| !d.contains_key(**key))
            })
            .map(|&key| (key, self.get_inheritable(&page_obj, key).clone()))
            .filter(|(_, value)| !value.is_null())
            .collect();
        for (key, value) in missing {
            self.put(page, key, value)?;
        }
        Ok(())
    }

    fn copy_page_annotations(
        &mut self,
        source: &Document,
        source_index: usize,
        target_index: usize,
        options: &MergeOptions,
    ) -> Result<()> {
        for annot in source.page_annotations(source_index)? {
            let rect = match annot.rect {
                Some(rect) => rect,
                None => continue,
            };
            if annot.is_link() {
                if !options.copy_links {
                    continue;
                }
                match annot.uri() {
                    Some(uri) => {
                        self.create_link(target_index, rect, uri)?;
                    },
                    None => log::debug!("skipping internal link on page {}", source_index),
                }
                continue;
            }
            if !options.copy_annotations {
                continue;
            }
            match annot.subtype.as_deref() {
                Some(subtype) if !SKIPPED_ANNOTATIONS.contains(&subtype) => {
                    self.create_annotation(
                        target_index,
                        subtype,
                        rect,
                        annot.contents.as_deref(),
                        annot.author.as_deref(),
                    )?;
                },
                _ => {},
            }
        }
        Ok(())
    }

    /// Split into one new document per interval of pages.
    ///
    /// See [`split`].
    pub fn split(&self, boundaries: Option<&[i64]>) -> Result<Vec<Document>> {
        split(self, boundaries)
    }
}

fn normalize_rect([x0, y0, x1, y1]: [f64; 4]) -> [f64; 4] {
    [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)]
}

/// Split `doc` into new documents.
///
/// Without boundaries (or with an empty list) every page becomes its own
/// document. Otherwise `boundaries` lists ascending start indices, the first
/// being 0, and each output covers `[b[i], b[i + 1])`, the last running to
/// the end. Each output is filled through its own graft session.
pub fn split(doc: &Document, boundaries: Option<&[i64]>) -> Result<Vec<Document>> {
    let page_count = doc.page_count();
    let starts: Vec<usize> = match boundaries {
        None | Some([]) => (0..page_count).collect(),
        Some(list) => validate_boundaries(list, page_count)?,
    };

    let mut outputs = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(page_count);
        let mut out = Document::with_heap(Arc::clone(doc.heap()), *doc.config());
        let mut map = out.new_graft_map();
        for page in start..end {
            map.graft_page(&mut out, -1, doc, page)?;
        }
        outputs.push(out);
    }
    log::debug!("split {} into {} documents", doc.id(), outputs.len());
    Ok(outputs)
}

fn validate_boundaries(list: &[i64], page_count: usize) -> Result<Vec<usize>> {
    let invalid = |boundary: i64, reason: String| Error::InvalidSplitBoundary { boundary, reason };
    let mut starts = Vec::with_capacity(list.len());
    for &boundary in list {
        let start = usize::try_from(boundary)
            .map_err(|_| invalid(boundary, "boundary is negative".to_string()))?;
        if start >= page_count {
            return Err(invalid(
                boundary,
                format!("document has {} pages", page_count),
            ));
        }
        if let Some(&prev) = starts.last() {
            if start <= prev {
                return Err(invalid(boundary, "boundaries must be strictly ascending".to_string()));
            }
        } else if start != 0 {
            return Err(invalid(boundary, "first boundary must be 0".to_string()));
        }
        starts.push(start);
    }
    Ok(starts)
}

/// Create a document with one empty page of the given size.
///
/// The page's resources declare Helvetica as `/Helv`.
pub fn create_blank_document(width: f64, height: f64) -> Result<Document> {
    if !(width > 0.0 && height > 0.0) {
        return Err(Error::InvalidPageSize { width, height });
    }
    let mut doc = Document::new();
    let helvetica = Object::dict([
        ("Type", Object::name("Font")),
        ("Subtype", Object::name("Type1")),
        ("Name", Object::name("Helv")),
        ("BaseFont", Object::name("Helvetica")),
        ("Encoding", Object::name("WinAnsiEncoding")),
    ]);
    let resources = doc.add_object(Object::dict([(
        "Font",
        Object::dict([("Helv", helvetica)]),
    )]));
    let contents = doc.add_stream(&b"BT /Helv ET"[..], Object::Null)?;
    let page = doc.add_page(
        [0.0, 0.0, width, height],
        0,
        Object::Reference(resources),
        Object::Reference(contents),
    )?;
    doc.insert_page(-1, page)?;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_pages(n: usize) -> Document {
        let mut doc = Document::new();
        for i in 0..n {
            doc.new_page(-1, 100.0 + i as f64, 200.0).unwrap();
        }
        doc
    }

    fn widths(doc: &Document) -> Vec<f64> {
        (0..doc.page_count())
            .map(|i| doc.page_bounds(i).unwrap()[2])
            .collect()
    }

    #[test]
    fn test_blank_document() {
        let doc = create_blank_document(595.0, 842.0).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.page_bounds(0).unwrap(), [0.0, 0.0, 595.0, 842.0]);
        assert!(create_blank_document(0.0, 10.0).is_err());
    }

    #[test]
    fn test_copy_page_append_and_insert() {
        let mut doc = doc_with_pages(2);
        doc.copy_page(0, -1).unwrap();
        assert_eq!(widths(&doc), vec![100.0, 101.0, 100.0]);
        doc.copy_page(1, 0).unwrap();
        assert_eq!(widths(&doc), vec![101.0, 100.0, 101.0, 100.0]);
    }

    #[test]
    fn test_copy_page_bounds() {
        let mut doc = doc_with_pages(2);
        assert!(doc.copy_page(2, -1).is_err());
        assert!(doc.copy_page(0, 3).is_err());
        assert!(doc.copy_page(0, -2).is_err());
        doc.copy_page(0, 2).unwrap();
        assert_eq!(doc.page_count(), 3);
    }

    #[test]
    fn test_delete_pages_shapes() {
        let mut doc = doc_with_pages(5);
        assert_eq!(doc.delete_pages(-1).unwrap(), 1);
        assert_eq!(widths(&doc), vec![100.0, 101.0, 102.0, 103.0]);
        doc.delete_pages([0, 2]).unwrap();
        assert_eq!(widths(&doc), vec![101.0, 103.0]);
        assert_eq!(doc.delete_pages(Vec::<i64>::new()).unwrap(), 0);
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn test_delete_pages_validates_before_deleting() {
        let mut doc = doc_with_pages(3);
        assert!(doc.delete_pages([0, 3]).is_err());
        assert_eq!(doc.page_count(), 3);
    }

    #[test]
    fn test_rearrange_pages() {
        let mut doc = doc_with_pages(3);
        doc.rearrange_pages(&[2, 1, 0]).unwrap();
        assert_eq!(widths(&doc), vec![102.0, 101.0, 100.0]);

        doc.rearrange_pages(&[0, 0]).unwrap();
        let refs = doc.page_refs();
        assert_eq!(refs.len(), 2);
        assert_ne!(refs[0], refs[1]);
        assert_eq!(widths(&doc), vec![102.0, 102.0]);

        assert!(doc.rearrange_pages(&[5]).is_err());
    }

    #[test]
    fn test_merge_whole_document() {
        let mut target = doc_with_pages(1);
        let source = doc_with_pages(3);
        assert_eq!(target.merge(&source, MergeOptions::new()).unwrap(), 3);
        assert_eq!(widths(&target), vec![100.0, 100.0, 101.0, 102.0]);
    }

    #[test]
    fn test_merge_range_with_rotation() {
        let mut target = doc_with_pages(2);
        let source = doc_with_pages(4);
        let options = MergeOptions::new().with_pages(1, 2).with_start_at(1).with_rotate(90);
        target.merge(&source, options).unwrap();
        assert_eq!(widths(&target), vec![100.0, 101.0, 102.0, 101.0]);
        assert_eq!(target.page_rotation(1).unwrap(), 90);
    }

    #[test]
    fn test_merge_rejects_bad_rotation() {
        let mut target = doc_with_pages(1);
        let source = doc_with_pages(1);
        assert!(target
            .merge(&source, MergeOptions::new().with_rotate(33))
            .is_err());
        assert_eq!(target.page_count(), 1);
    }

    #[test]
    fn test_split_validation() {
        let doc = doc_with_pages(4);
        assert!(split(&doc, Some(&[0, 4][..])).is_err());
        assert!(split(&doc, Some(&[0, -1][..])).is_err());
        assert!(split(&doc, Some(&[0, 2, 2][..])).is_err());
        assert!(split(&doc, Some(&[1, 2][..])).is_err());
    }

    #[test]
    fn test_split_intervals() {
        let doc = doc_with_pages(5);
        let parts = doc.split(Some(&[0, 2, 3][..])).unwrap();
        let counts: Vec<usize> = parts.iter().map(Document::page_count).collect();
        assert_eq!(counts, vec![2, 1, 2]);
        assert_eq!(widths(&parts[2]), vec![103.0, 104.0]);

        let singles = doc.split(None).unwrap();
        assert_eq!(singles.len(), 5);
        assert!(singles.iter().all(|d| d.page_count() == 1));
    }
}
