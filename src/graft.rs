//! Cross-document copying.
//!
//! A [`GraftMap`] copies objects from a source document into a target
//! document and remembers, for every source object number it has seen, the
//! target object it became. Copying the same source object twice through one
//! map yields the same target object, so shared sub-graphs stay shared and
//! cycles terminate.
//!
//! When a reference to an unseen object is met, a target object number is
//! allocated and recorded *before* the referent is copied. The referent is
//! then copied from a work queue, so a back-reference to an object still being
//! copied finds the recorded number instead of recursing again.

use crate::document::{Document, DocumentId};
use crate::error::{Error, Result};
use crate::handle::ResourceHandle;
use crate::native::ResourceKind;
use crate::object::{Dictionary, Object, ObjectRef};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Page keys carried over by [`GraftMap::graft_page`], inherited values included.
pub const GRAFTED_PAGE_KEYS: [&str; 9] = [
    "Contents",
    "Resources",
    "MediaBox",
    "CropBox",
    "BleedBox",
    "TrimBox",
    "ArtBox",
    "Rotate",
    "UserUnit",
];

/// Memoizing copy session from one source document into one target document.
///
/// A map is bound to the target that created it and to the first source it
/// is used with. Not safe to share between threads while grafting; it needs
/// `&mut self` for every copy.
#[derive(Debug)]
pub struct GraftMap {
    target: DocumentId,
    source: Option<DocumentId>,
    memo: HashMap<u32, ObjectRef>,
    max_depth: u32,
    handle: ResourceHandle,
}

impl GraftMap {
    pub(crate) fn new(target: &Document) -> Self {
        Self {
            target: target.id(),
            source: None,
            memo: HashMap::new(),
            max_depth: target.config().max_nesting_depth,
            handle: ResourceHandle::allocate(Arc::clone(target.heap()), ResourceKind::GraftMap),
        }
    }

    /// Target document the map copies into.
    pub fn target_id(&self) -> DocumentId {
        self.target
    }

    /// Source document the map is bound to, once it has been used.
    pub fn source_id(&self) -> Option<DocumentId> {
        self.source
    }

    /// Target object that source object `number` was copied to.
    pub fn lookup(&self, number: u32) -> Option<ObjectRef> {
        self.memo.get(&number).copied()
    }

    /// Number of source objects copied so far.
    pub fn len(&self) -> usize {
        self.memo.len()
    }

    /// Whether nothing has been copied yet.
    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }

    /// Native pointer backing the map.
    pub fn native_pointer(&self) -> crate::native::NativePtr {
        self.handle.pointer()
    }

    fn bind(&mut self, target: &Document, source: &Document) -> Result<()> {
        if target.id() != self.target {
            return Err(Error::GraftTargetMismatch {
                expected: self.target,
                found: target.id(),
            });
        }
        match self.source {
            Some(bound) if bound != source.id() => Err(Error::GraftSourceMismatch {
                expected: bound,
                found: source.id(),
            }),
            Some(_) => Ok(()),
            None => {
                log::trace!("graft map bound: {} -> {}", source.id(), self.target);
                self.source = Some(source.id());
                Ok(())
            },
        }
    }

    /// Copy `obj`, which belongs to `source`, into `target`.
    ///
    /// Scalars are returned as is, containers are rebuilt and references are
    /// replaced by references to target objects.
    ///
    /// On error, objects this call allocated in `target` are deleted again and
    /// the map forgets them.
    pub fn graft_object(
        &mut self,
        target: &mut Document,
        source: &Document,
        obj: &Object,
    ) -> Result<Object> {
        self.bind(target, source)?;

        let mut queue = VecDeque::new();
        let mut done = Vec::new();
        let result = self.copy_all(target, source, obj, &mut queue, &mut done);
        if result.is_err() {
            // The memo only maps filled objects.
            done.extend(queue);
            self.discard(target, &done);
        }
        result
    }

    fn copy_all(
        &mut self,
        target: &mut Document,
        source: &Document,
        obj: &Object,
        queue: &mut VecDeque<(u32, ObjectRef)>,
        done: &mut Vec<(u32, ObjectRef)>,
    ) -> Result<Object> {
        let copied = self.copy_value(target, obj, queue, 0)?;

        while let Some((from, to)) = queue.pop_front() {
            done.push((from, to));
            // A dangling source reference leaves the placeholder as Null.
            let referent = match source.object(from) {
                Some(referent) => referent,
                None => continue,
            };
            let value = self.copy_value(target, referent, queue, 0)?;
            target.update_object(to.id, value)?;
        }
        Ok(copied)
    }

    fn discard(&mut self, target: &mut Document, entries: &[(u32, ObjectRef)]) {
        for &(from, to) in entries {
            self.memo.remove(&from);
            if let Err(e) = target.delete_object(to.id) {
                log::warn!("could not discard graft placeholder {}: {}", to, e);
            }
        }
        log::debug!("graft into {} failed, discarded {} placeholders", self.target, entries.len());
    }

    fn copy_value(
        &mut self,
        target: &mut Document,
        obj: &Object,
        queue: &mut VecDeque<(u32, ObjectRef)>,
        depth: u32,
    ) -> Result<Object> {
        if depth > self.max_depth {
            return Err(Error::RecursionLimitExceeded(self.max_depth));
        }
        Ok(match obj {
            Object::Reference(r) => {
                if let Some(&mapped) = self.memo.get(&r.id) {
                    return Ok(Object::Reference(mapped));
                }
                let placeholder = target.create_object();
                self.memo.insert(r.id, placeholder);
                queue.push_back((r.id, placeholder));
                Object::Reference(placeholder)
            },
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy_value(target, item, queue, depth + 1))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Object::Dictionary(dict) => {
                Object::Dictionary(self.copy_dict(target, dict, queue, depth)?)
            },
            Object::Stream { dict, data } => Object::Stream {
                dict: self.copy_dict(target, dict, queue, depth)?,
                data: data.clone(),
            },
            scalar => scalar.clone(),
        })
    }

    fn copy_dict(
        &mut self,
        target: &mut Document,
        dict: &Dictionary,
        queue: &mut VecDeque<(u32, ObjectRef)>,
        depth: u32,
    ) -> Result<Dictionary> {
        let mut out = Dictionary::with_capacity(dict.len());
        for (key, value) in dict {
            out.insert(key.clone(), self.copy_value(target, value, queue, depth + 1)?);
        }
        Ok(out)
    }

    /// Copy page `page_index` of `source` into `target` and insert it before
    /// `to` (`-1` appends).
    ///
    /// The new page gets the source page's contents, resources and boxes;
    /// values the source page inherits from its ancestors are copied onto the
    /// new page directly. Both indices are checked before anything is copied.
    pub fn graft_page(
        &mut self,
        target: &mut Document,
        to: i64,
        source: &Document,
        page_index: usize,
    ) -> Result<ObjectRef> {
        self.bind(target, source)?;
        let source_page = source.find_page(page_index)?;
        let target_count = target.page_count();
        if to < -1 || to > target_count as i64 {
            return Err(Error::PageIndexOutOfRange {
                index: to,
                page_count: target_count,
            });
        }

        let page_obj = Object::Reference(source_page);
        let mut page = Dictionary::new();
        page.insert("Type".to_string(), Object::name("Page"));
        for key in GRAFTED_PAGE_KEYS {
            let value = source.get_inheritable(&page_obj, key);
            if value.is_null() {
                continue;
            }
            let copied = self.graft_object(target, source, value)?;
            page.insert(key.to_string(), copied);
        }

        let new_page = target.add_object(Object::Dictionary(page));
        target.insert_page(to, new_page)?;
        log::debug!(
            "grafted page {} of {} as {} in {} ({} objects mapped)",
            page_index,
            source.id(),
            new_page,
            target.id(),
            self.memo.len()
        );
        Ok(new_page)
    }
}
