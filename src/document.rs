//! Document object graph.
//!
//! A [`Document`] is an arena of indirect objects keyed by object number.
//! Numbers are handed out monotonically and never reused; deleting an object
//! leaves a hole, and references into a hole resolve to `Null`.

use crate::config::DocumentConfig;
use crate::error::{Error, Result};
use crate::graft::GraftMap;
use crate::handle::ResourceHandle;
use crate::native::{NativeHeap, NativePtr, RefCountHeap, ResourceKind};
use crate::object::{Dictionary, Object, ObjectRef, PathKey};
use bytes::Bytes;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NULL: Object = Object::Null;

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a document.
///
/// Object numbers are only meaningful together with the document they came
/// from; graft sessions use this id to check they are given the right pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        Self(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
struct Slot {
    object: Object,
    handle: ResourceHandle,
}

/// A leaf of the page tree together with the node whose `/Kids` lists it.
#[derive(Debug, Clone, Copy)]
struct PageEntry {
    page: ObjectRef,
    parent: ObjectRef,
}

/// A caller-held reference to one object slot.
///
/// Keeps the slot's native resource alive even if the object is deleted from
/// the document afterwards.
#[derive(Debug)]
pub struct RetainedObject {
    reference: ObjectRef,
    handle: ResourceHandle,
}

impl RetainedObject {
    /// Object this handle was taken for.
    pub fn reference(&self) -> ObjectRef {
        self.reference
    }

    /// Native pointer of the slot. Panics after [`release`](Self::release).
    pub fn pointer(&self) -> NativePtr {
        self.handle.pointer()
    }

    /// Release early; dropping does the same.
    pub fn release(&self) -> bool {
        self.handle.release()
    }

    /// Whether the handle has been released.
    pub fn is_released(&self) -> bool {
        self.handle.is_released()
    }
}

/// In-memory document: an object table, a trailer and a page tree.
///
/// # Example
///
/// ```
/// use pdf_graft::document::Document;
/// use pdf_graft::object::Object;
///
/// let mut doc = Document::new();
/// let page = doc.add_page([0.0, 0.0, 612.0, 792.0], 0, Object::Null, Object::Null)?;
/// doc.insert_page(-1, page)?;
/// assert_eq!(doc.page_count(), 1);
/// # Ok::<(), pdf_graft::error::Error>(())
/// ```
#[derive(Debug)]
pub struct Document {
    id: DocumentId,
    config: DocumentConfig,
    heap: Arc<dyn NativeHeap>,
    handle: ResourceHandle,
    objects: BTreeMap<u32, Slot>,
    next_number: u32,
    trailer: Object,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with a catalog and an empty page tree.
    pub fn new() -> Self {
        Self::with_config(DocumentConfig::default())
    }

    /// Create an empty document with the given configuration.
    pub fn with_config(config: DocumentConfig) -> Self {
        Self::with_heap(RefCountHeap::shared(), config)
    }

    /// Create an empty document whose resources live on `heap`.
    pub fn with_heap(heap: Arc<dyn NativeHeap>, config: DocumentConfig) -> Self {
        let handle = ResourceHandle::allocate(Arc::clone(&heap), ResourceKind::Document);
        let mut doc = Self {
            id: DocumentId::next(),
            config,
            heap,
            handle,
            objects: BTreeMap::new(),
            next_number: 1,
            trailer: Object::Dictionary(Dictionary::new()),
        };

        let pages = doc.add_object(Object::dict([
            ("Type", Object::name("Pages")),
            ("Kids", Object::Array(Vec::new())),
            ("Count", Object::Integer(0)),
        ]));
        let catalog = doc.add_object(Object::dict([
            ("Type", Object::name("Catalog")),
            ("Pages", Object::Reference(pages)),
        ]));
        doc.trailer = Object::dict([("Root", Object::Reference(catalog))]);

        log::debug!("created document {} (handle {})", doc.id, doc.handle.pointer());
        doc
    }

    /// Process-unique id of this document.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Configuration the document was created with.
    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    /// Heap backing this document's resources.
    pub fn heap(&self) -> &Arc<dyn NativeHeap> {
        &self.heap
    }

    /// Native pointer of the document itself.
    pub fn native_pointer(&self) -> NativePtr {
        self.handle.pointer()
    }

    /// Native pointer of an object slot.
    pub fn object_pointer(&self, number: u32) -> Option<NativePtr> {
        self.objects.get(&number).map(|slot| slot.handle.pointer())
    }

    /// Trailer dictionary.
    pub fn trailer(&self) -> &Object {
        &self.trailer
    }

    /// Mutable trailer dictionary.
    pub fn trailer_mut(&mut self) -> &mut Object {
        &mut self.trailer
    }

    // === Object table ===

    /// Allocate a fresh object number bound to `Null`.
    pub fn create_object(&mut self) -> ObjectRef {
        let number = self.next_number;
        self.next_number += 1;
        let handle = ResourceHandle::allocate(Arc::clone(&self.heap), ResourceKind::Object);
        log::trace!("document {}: allocated object {} ({})", self.id, number, handle.pointer());
        self.objects.insert(
            number,
            Slot {
                object: Object::Null,
                handle,
            },
        );
        ObjectRef::new(number, 0)
    }

    /// Allocate a new object number holding `obj`.
    pub fn add_object(&mut self, obj: Object) -> ObjectRef {
        let r = self.create_object();
        if let Some(slot) = self.objects.get_mut(&r.id) {
            slot.object = obj;
        }
        r
    }

    /// Add a stream holding unencoded `data`.
    ///
    /// `dict` may be `Null` or a dictionary; any `/Filter` and `/DecodeParms`
    /// entries are dropped and `/Length` is set.
    pub fn add_stream(&mut self, data: impl Into<Bytes>, dict: Object) -> Result<ObjectRef> {
        let mut dict = stream_header(dict)?;
        dict.shift_remove("Filter");
        dict.shift_remove("DecodeParms");
        Ok(self.add_object(make_stream(dict, data.into())))
    }

    /// Add a stream whose `data` is already encoded as `dict` describes.
    pub fn add_raw_stream(&mut self, data: impl Into<Bytes>, dict: Object) -> Result<ObjectRef> {
        let dict = stream_header(dict)?;
        Ok(self.add_object(make_stream(dict, data.into())))
    }

    /// Replace the object stored under `number`.
    ///
    /// Writing into a deleted number fills the hole again.
    pub fn update_object(&mut self, number: u32, obj: Object) -> Result<()> {
        self.check_number(number)?;
        match self.objects.get_mut(&number) {
            Some(slot) => slot.object = obj,
            None => {
                log::debug!("document {}: refilling deleted object {}", self.id, number);
                let handle =
                    ResourceHandle::allocate(Arc::clone(&self.heap), ResourceKind::Object);
                self.objects.insert(number, Slot { object: obj, handle });
            },
        }
        Ok(())
    }

    /// Replace a stream's payload.
    ///
    /// With `compressed == false` the data is taken as unencoded and filter
    /// entries are removed. A plain dictionary object is turned into a stream.
    pub fn update_stream(
        &mut self,
        target: ObjectRef,
        data: impl Into<Bytes>,
        compressed: bool,
    ) -> Result<()> {
        let data = data.into();
        let slot = self
            .objects
            .get_mut(&target.id)
            .ok_or(Error::ObjectNotFound(target.id, target.gen))?;
        let mut dict = match std::mem::replace(&mut slot.object, Object::Null) {
            Object::Stream { dict, .. } | Object::Dictionary(dict) => dict,
            other => {
                let found = other.type_name().to_string();
                slot.object = other;
                return Err(Error::InvalidObjectType {
                    expected: "Stream".to_string(),
                    found,
                });
            },
        };
        if !compressed {
            dict.shift_remove("Filter");
            dict.shift_remove("DecodeParms");
        }
        slot.object = make_stream(dict, data);
        Ok(())
    }

    /// Decoded payload of a stream object.
    pub fn read_stream(&self, target: ObjectRef) -> Result<Vec<u8>> {
        self.object(target.id)
            .ok_or(Error::ObjectNotFound(target.id, target.gen))?
            .decode_stream_data()
    }

    /// Payload of a stream object exactly as stored.
    pub fn read_raw_stream(&self, target: ObjectRef) -> Result<Bytes> {
        match self.object(target.id) {
            Some(Object::Stream { data, .. }) => Ok(data.clone()),
            Some(other) => Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: other.type_name().to_string(),
            }),
            None => Err(Error::ObjectNotFound(target.id, target.gen)),
        }
    }

    /// Free an object number. Other numbers are not renumbered.
    ///
    /// References still pointing at the number resolve to `Null` afterwards.
    pub fn delete_object(&mut self, number: u32) -> Result<()> {
        self.check_number(number)?;
        if let Some(slot) = self.objects.remove(&number) {
            slot.handle.release();
            log::trace!("document {}: deleted object {}", self.id, number);
        }
        Ok(())
    }

    /// Object stored under `number`, if any.
    pub fn object(&self, number: u32) -> Option<&Object> {
        self.objects.get(&number).map(|slot| &slot.object)
    }

    /// Mutable access to the object stored under `number`.
    pub fn object_mut(&mut self, number: u32) -> Option<&mut Object> {
        self.objects.get_mut(&number).map(|slot| &mut slot.object)
    }

    /// Number of object numbers handed out so far, including the reserved 0.
    pub fn count_objects(&self) -> u32 {
        self.next_number
    }

    /// Whether `number` currently holds an object.
    pub fn contains_object(&self, number: u32) -> bool {
        self.objects.contains_key(&number)
    }

    /// Live objects in ascending object-number order.
    pub fn iter_objects(&self) -> impl Iterator<Item = (ObjectRef, &Object)> {
        self.objects
            .iter()
            .map(|(&number, slot)| (ObjectRef::new(number, 0), &slot.object))
    }

    fn check_number(&self, number: u32) -> Result<()> {
        if number == 0 || number >= self.next_number {
            return Err(Error::ObjectNumberOutOfRange {
                number,
                count: self.next_number,
            });
        }
        Ok(())
    }

    /// Take a caller-held handle to an object slot.
    pub fn retain(&self, target: ObjectRef) -> Option<RetainedObject> {
        let slot = self.objects.get(&target.id)?;
        Some(RetainedObject {
            reference: target,
            handle: slot.handle.borrow_again(),
        })
    }

    /// Release every resource held by the document.
    ///
    /// Dropping the document releases them as well; this makes the point of
    /// release explicit.
    pub fn close(self) {
        let released = self
            .objects
            .values()
            .filter(|slot| slot.handle.release())
            .count();
        self.handle.release();
        log::debug!("closed document {} ({} objects released)", self.id, released);
    }

    // === Node factories ===

    /// A `Null` node.
    pub fn new_null(&self) -> Object {
        Object::Null
    }

    /// A boolean node.
    pub fn new_boolean(&self, value: bool) -> Object {
        Object::Boolean(value)
    }

    /// An integer node.
    pub fn new_integer(&self, value: i64) -> Object {
        Object::Integer(value)
    }

    /// A real node.
    pub fn new_real(&self, value: f64) -> Object {
        Object::Real(value)
    }

    /// A name node.
    pub fn new_name(&self, name: &str) -> Object {
        Object::name(name)
    }

    /// A text string node.
    pub fn new_string(&self, text: &str) -> Object {
        Object::text(text)
    }

    /// A binary string node.
    pub fn new_byte_string(&self, bytes: &[u8]) -> Object {
        Object::ByteString(bytes.to_vec())
    }

    /// An empty array node.
    pub fn new_array(&self) -> Object {
        Object::Array(Vec::new())
    }

    /// An empty dictionary node.
    pub fn new_dict(&self) -> Object {
        Object::Dictionary(Dictionary::new())
    }

    /// A reference to `number` in this document.
    pub fn new_indirect(&self, number: u32) -> Object {
        Object::Reference(ObjectRef::new(number, 0))
    }

    // === Navigation ===

    /// Follow one level of indirection.
    ///
    /// Dangling references resolve to `Null`; other values are returned as is.
    pub fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        match obj {
            Object::Reference(r) => self.resolve_ref(*r),
            other => other,
        }
    }

    /// Object behind a reference, or `Null`.
    pub fn resolve_ref(&self, r: ObjectRef) -> &Object {
        self.object(r.id).unwrap_or(&NULL)
    }

    /// Walk `path` through arrays and dictionaries.
    ///
    /// Containers met along the way are resolved; the value at the end is
    /// returned as stored. Any missing step yields `Null`.
    pub fn get<'a>(&'a self, obj: &'a Object, path: &[PathKey]) -> &'a Object {
        let mut current = obj;
        for key in path {
            current = match self.resolve(current).get_key(key) {
                Some(next) => next,
                None => return &NULL,
            };
        }
        current
    }

    /// Look up `key` on a page node, falling back to its `/Parent` chain.
    pub fn get_inheritable<'a>(&'a self, node: &'a Object, key: &str) -> &'a Object {
        let mut visited = HashSet::new();
        if let Some(r) = node.as_reference() {
            visited.insert(r.id);
        }
        let mut current = node;
        loop {
            let dict = match self.resolve(current).as_dict() {
                Some(dict) => dict,
                None => return &NULL,
            };
            if let Some(value) = dict.get(key).filter(|v| !v.is_null()) {
                return value;
            }
            match dict.get("Parent").and_then(Object::as_reference) {
                Some(parent) if visited.insert(parent.id) => current = self.resolve_ref(parent),
                Some(parent) => {
                    log::warn!("document {}: /Parent cycle at {}", self.id, parent);
                    return &NULL;
                },
                None => return &NULL,
            }
        }
    }

    /// Set `key` on the object `target` refers to.
    pub fn put(
        &mut self,
        target: ObjectRef,
        key: impl Into<PathKey>,
        value: impl Into<Object>,
    ) -> Result<()> {
        self.target_mut(target)?.put(key, value)
    }

    /// Append to the array `target` refers to.
    pub fn push(&mut self, target: ObjectRef, value: impl Into<Object>) -> Result<()> {
        self.target_mut(target)?.push(value)
    }

    /// Remove `key` from the object `target` refers to.
    pub fn delete(&mut self, target: ObjectRef, key: impl Into<PathKey>) -> Result<()> {
        self.target_mut(target)?.delete(key)
    }

    fn target_mut(&mut self, target: ObjectRef) -> Result<&mut Object> {
        self.object_mut(target.id)
            .ok_or(Error::ObjectNotFound(target.id, target.gen))
    }

    /// Convert a node to plain JSON.
    ///
    /// With `seen`, references are followed and their results cached by
    /// object number; a number already in `seen` returns the cached value
    /// (`Null` while it is still being converted), which stops cycles.
    /// Without `seen`, references render as `"N G R"`.
    pub fn to_plain(&self, obj: &Object, seen: Option<&mut HashMap<u32, Value>>) -> Value {
        let mut seen = seen;
        self.plain(obj, &mut seen)
    }

    fn plain(&self, obj: &Object, seen: &mut Option<&mut HashMap<u32, Value>>) -> Value {
        match obj {
            Object::Null => Value::Null,
            Object::Boolean(b) => Value::Bool(*b),
            Object::Integer(i) => Value::from(*i),
            Object::Real(r) => serde_json::Number::from_f64(*r)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Object::Name(s) | Object::String(s) => Value::String(s.clone()),
            Object::ByteString(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
            Object::Array(items) => {
                Value::Array(items.iter().map(|item| self.plain(item, seen)).collect())
            },
            Object::Dictionary(dict) | Object::Stream { dict, .. } => Value::Object(
                dict.iter()
                    .map(|(k, v)| (k.clone(), self.plain(v, seen)))
                    .collect(),
            ),
            Object::Reference(r) => {
                match seen {
                    None => return Value::String(r.to_string()),
                    Some(map) => {
                        if let Some(cached) = map.get(&r.id) {
                            return cached.clone();
                        }
                        map.insert(r.id, Value::Null);
                    },
                }
                let value = self.plain(self.resolve_ref(*r), seen);
                if let Some(map) = seen {
                    map.insert(r.id, value.clone());
                }
                value
            },
        }
    }

    // === Page tree ===

    /// Reference to the document catalog.
    pub fn catalog_ref(&self) -> Option<ObjectRef> {
        self.trailer.as_dict()?.get("Root")?.as_reference()
    }

    /// The document catalog, or `Null` when the trailer has no `/Root`.
    pub fn catalog(&self) -> &Object {
        match self.catalog_ref() {
            Some(r) => self.resolve_ref(r),
            None => &NULL,
        }
    }

    /// Root node of the page tree.
    pub fn pages_root(&self) -> Option<ObjectRef> {
        self.catalog().as_dict()?.get("Pages")?.as_reference()
    }

    fn page_entries(&self) -> Vec<PageEntry> {
        let mut entries = Vec::new();
        if let Some(root) = self.pages_root() {
            let mut visited = HashSet::new();
            visited.insert(root.id);
            self.collect_pages(root, &mut entries, &mut visited);
        }
        entries
    }

    /// Flatten the page tree below `node`, recursing into intermediate
    /// `/Pages` nodes.
    fn collect_pages(&self, node: ObjectRef, out: &mut Vec<PageEntry>, visited: &mut HashSet<u32>) {
        let kids = self.resolve(self.get(self.resolve_ref(node), &[PathKey::from("Kids")]));
        let kids = match kids.as_array() {
            Some(kids) => kids,
            None => return,
        };
        for kid in kids {
            let kid_ref = match kid.as_reference() {
                Some(r) => r,
                None => {
                    log::warn!("document {}: direct object in /Kids of {}", self.id, node);
                    continue;
                },
            };
            if !visited.insert(kid_ref.id) {
                log::warn!("document {}: page tree cycle at {}, skipping", self.id, kid_ref);
                continue;
            }
            let dict = match self.resolve_ref(kid_ref).as_dict() {
                Some(dict) => dict,
                None => continue,
            };
            let type_name = dict.get("Type").and_then(Object::as_name).unwrap_or("");
            let is_node = type_name == "Pages" || (type_name != "Page" && dict.contains_key("Kids"));
            if is_node {
                self.collect_pages(kid_ref, out, visited);
            } else {
                out.push(PageEntry {
                    page: kid_ref,
                    parent: node,
                });
            }
        }
    }

    /// Page objects in document order.
    pub fn page_refs(&self) -> Vec<ObjectRef> {
        self.page_entries().into_iter().map(|e| e.page).collect()
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.page_entries().len()
    }

    /// Page object at `index`.
    pub fn find_page(&self, index: usize) -> Result<ObjectRef> {
        let refs = self.page_refs();
        refs.get(index).copied().ok_or(Error::PageIndexOutOfRange {
            index: index as i64,
            page_count: refs.len(),
        })
    }

    /// Media box of the page at `index`, inherited values included.
    ///
    /// A page without a usable media box reports the configured default size.
    pub fn page_bounds(&self, index: usize) -> Result<[f64; 4]> {
        let page = Object::Reference(self.find_page(index)?);
        let media_box = self.resolve(self.get_inheritable(&page, "MediaBox"));
        Ok(media_box.as_rect().unwrap_or_else(|| {
            let (w, h) = self.config.default_page_size;
            [0.0, 0.0, w, h]
        }))
    }

    /// Rotation of the page at `index`, inherited values included.
    pub fn page_rotation(&self, index: usize) -> Result<i32> {
        let page = Object::Reference(self.find_page(index)?);
        let rotate = self.resolve(self.get_inheritable(&page, "Rotate"));
        Ok(rotate.as_integer().unwrap_or(0) as i32)
    }

    /// Create a page object. The page is not part of the page tree until
    /// passed to [`insert_page`](Self::insert_page).
    pub fn add_page(
        &mut self,
        media_box: [f64; 4],
        rotate: i32,
        resources: Object,
        contents: Object,
    ) -> Result<ObjectRef> {
        let rotate = normalize_rotation(rotate)?;
        let [x0, y0, x1, y1] = media_box;
        if x1 <= x0 || y1 <= y0 {
            return Err(Error::InvalidPageSize {
                width: x1 - x0,
                height: y1 - y0,
            });
        }

        let mut page = Dictionary::new();
        page.insert("Type".to_string(), Object::name("Page"));
        page.insert("MediaBox".to_string(), Object::rect(media_box));
        page.insert("Rotate".to_string(), Object::Integer(rotate as i64));
        let resources = if resources.is_null() {
            Object::Dictionary(Dictionary::new())
        } else {
            resources
        };
        page.insert("Resources".to_string(), resources);
        if !contents.is_null() {
            page.insert("Contents".to_string(), contents);
        }
        Ok(self.add_object(Object::Dictionary(page)))
    }

    /// Insert an existing page object into the page tree before the page at
    /// `at`. `-1` or the page count appends.
    ///
    /// A page may appear in the tree only once; use
    /// [`copy_page`](crate::editor::PageEditing::copy_page) to duplicate one.
    pub fn insert_page(&mut self, at: i64, page: ObjectRef) -> Result<()> {
        if !self.contains_object(page.id) {
            return Err(Error::ObjectNotFound(page.id, page.gen));
        }
        let entries = self.page_entries();
        if entries.iter().any(|e| e.page.id == page.id) {
            return Err(Error::PageAlreadyInTree(page));
        }
        let count = entries.len();
        let at = if at == -1 {
            count
        } else {
            usize::try_from(at)
                .ok()
                .filter(|&a| a <= count)
                .ok_or(Error::PageIndexOutOfRange {
                    index: at,
                    page_count: count,
                })?
        };

        let (parent, position) = if at < count {
            let entry = entries[at];
            (entry.parent, self.kid_position(entry.parent, entry.page)?)
        } else if let Some(last) = entries.last() {
            (last.parent, self.kid_position(last.parent, last.page)? + 1)
        } else {
            let root = self
                .pages_root()
                .ok_or_else(|| Error::InvalidPdf("catalog has no /Pages tree".to_string()))?;
            (root, 0)
        };

        self.kids_mut(parent)?
            .insert(position, Object::Reference(page));
        self.put(page, "Parent", parent)?;
        self.adjust_counts(parent, 1);
        log::debug!("document {}: inserted page {} at index {}", self.id, page, at);
        Ok(())
    }

    /// Remove the page at `index` from the page tree.
    ///
    /// The page object itself stays in the object table.
    pub fn delete_page(&mut self, index: usize) -> Result<()> {
        let entries = self.page_entries();
        let entry = *entries.get(index).ok_or(Error::PageIndexOutOfRange {
            index: index as i64,
            page_count: entries.len(),
        })?;
        let position = self.kid_position(entry.parent, entry.page)?;
        self.kids_mut(entry.parent)?.remove(position);
        self.adjust_counts(entry.parent, -1);
        log::trace!("document {}: removed page {} ({})", self.id, index, entry.page);
        Ok(())
    }

    fn kid_position(&self, parent: ObjectRef, page: ObjectRef) -> Result<usize> {
        let kids = self.resolve(self.get(self.resolve_ref(parent), &[PathKey::from("Kids")]));
        kids.as_array()
            .and_then(|kids| kids.iter().position(|k| k.as_reference() == Some(page)))
            .ok_or_else(|| {
                Error::InvalidPdf(format!("page {} is not listed in /Kids of {}", page, parent))
            })
    }

    fn kids_mut(&mut self, parent: ObjectRef) -> Result<&mut Vec<Object>> {
        let indirect_kids = self
            .resolve_ref(parent)
            .as_dict()
            .and_then(|d| d.get("Kids"))
            .and_then(Object::as_reference);
        if let Some(kids_ref) = indirect_kids {
            return self
                .object_mut(kids_ref.id)
                .and_then(Object::as_array_mut)
                .ok_or_else(|| Error::InvalidPdf(format!("/Kids of {} is not an array", parent)));
        }
        let dict = self
            .object_mut(parent.id)
            .and_then(Object::as_dict_mut)
            .ok_or_else(|| Error::InvalidPdf(format!("page tree node {} is not a dictionary", parent)))?;
        dict.entry("Kids".to_string())
            .or_insert_with(|| Object::Array(Vec::new()))
            .as_array_mut()
            .ok_or_else(|| Error::InvalidPdf(format!("/Kids of {} is not an array", parent)))
    }

    /// Add `delta` to `/Count` on `start` and every ancestor.
    fn adjust_counts(&mut self, start: ObjectRef, delta: i64) {
        let mut visited = HashSet::new();
        let mut node = Some(start);
        while let Some(r) = node {
            if !visited.insert(r.id) {
                log::warn!("document {}: /Parent cycle at {}", self.id, r);
                break;
            }
            let dict = match self.object_mut(r.id).and_then(Object::as_dict_mut) {
                Some(dict) => dict,
                None => break,
            };
            let count = dict.get("Count").and_then(Object::as_integer).unwrap_or(0);
            dict.insert("Count".to_string(), Object::Integer((count + delta).max(0)));
            node = dict.get("Parent").and_then(Object::as_reference);
        }
    }

    // === Grafting ===

    /// Start a graft session that copies into this document.
    pub fn new_graft_map(&self) -> GraftMap {
        GraftMap::new(self)
    }

    /// Copy `obj` from `source` into this document with a one-shot session.
    pub fn graft_object(&mut self, source: &Document, obj: &Object) -> Result<Object> {
        let mut map = self.new_graft_map();
        map.graft_object(self, source, obj)
    }

    /// Copy page `page_index` of `source` and insert it before `to`
    /// (`-1` appends) with a one-shot session.
    pub fn graft_page(&mut self, to: i64, source: &Document, page_index: usize) -> Result<ObjectRef> {
        let mut map = self.new_graft_map();
        map.graft_page(self, to, source, page_index)
    }
}

fn stream_header(dict: Object) -> Result<Dictionary> {
    match dict {
        Object::Null => Ok(Dictionary::new()),
        Object::Dictionary(dict) => Ok(dict),
        other => Err(Error::InvalidObjectType {
            expected: "Dictionary".to_string(),
            found: other.type_name().to_string(),
        }),
    }
}

fn make_stream(mut dict: Dictionary, data: Bytes) -> Object {
    dict.insert("Length".to_string(), Object::Integer(data.len() as i64));
    Object::Stream { dict, data }
}

/// Fold a rotation into `0..360`; it must be a multiple of 90.
pub(crate) fn normalize_rotation(rotate: i32) -> Result<i32> {
    if rotate % 90 != 0 {
        return Err(Error::InvalidRotation(rotate));
    }
    Ok(rotate.rem_euclid(360))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_pages(doc: &mut Document, n: usize) -> Vec<ObjectRef> {
        (0..n)
            .map(|_| {
                let page = doc
                    .add_page([0.0, 0.0, 612.0, 792.0], 0, Object::Null, Object::Null)
                    .unwrap();
                doc.insert_page(-1, page).unwrap();
                page
            })
            .collect()
    }

    #[test]
    fn test_new_document_structure() {
        let doc = Document::new();
        assert_eq!(doc.catalog().as_dict().unwrap()["Type"], Object::name("Catalog"));
        let root = doc.pages_root().unwrap();
        assert_eq!(
            doc.get(&Object::Reference(root), &["Count".into()]),
            &Object::Integer(0)
        );
        assert_eq!(doc.page_count(), 0);
        assert_eq!(doc.count_objects(), 3);
    }

    #[test]
    fn test_document_ids_are_unique() {
        assert_ne!(Document::new().id(), Document::new().id());
    }

    #[test]
    fn test_create_object_is_null_and_monotonic() {
        let mut doc = Document::new();
        let a = doc.create_object();
        let b = doc.create_object();
        assert!(b.id > a.id);
        assert_eq!(doc.object(a.id), Some(&Object::Null));

        doc.delete_object(a.id).unwrap();
        let c = doc.create_object();
        assert!(c.id > b.id, "numbers are never reused");
    }

    #[test]
    fn test_delete_object_bounds() {
        let mut doc = Document::new();
        assert!(matches!(
            doc.delete_object(0),
            Err(Error::ObjectNumberOutOfRange { number: 0, .. })
        ));
        let past = doc.count_objects();
        assert!(doc.delete_object(past).unwrap_err().is_usage_error());

        let r = doc.create_object();
        doc.delete_object(r.id).unwrap();
        // deleting a hole again is a no-op
        doc.delete_object(r.id).unwrap();
    }

    #[test]
    fn test_dangling_reference_resolves_to_null() {
        let mut doc = Document::new();
        let target = doc.add_object(Object::Integer(7));
        let holder = doc.add_object(Object::Array(vec![Object::Reference(target)]));
        doc.delete_object(target.id).unwrap();

        let holder_ref = Object::Reference(holder);
        let element = doc.get(&holder_ref, &[PathKey::Index(0)]);
        assert_eq!(element, &Object::Reference(target));
        assert!(doc.resolve(element).is_null());
    }

    #[test]
    fn test_get_walks_references_and_reports_absence() {
        let mut doc = Document::new();
        let font = doc.add_object(Object::dict([("BaseFont", Object::name("Helvetica"))]));
        let res = doc.add_object(Object::dict([(
            "Font",
            Object::dict([("F1", Object::Reference(font))]),
        )]));
        let res_obj = Object::Reference(res);

        let base = doc.get(&res_obj, &["Font".into(), "F1".into(), "BaseFont".into()]);
        assert_eq!(base, &Object::name("Helvetica"));
        assert!(doc.get(&res_obj, &["Font".into(), "F2".into()]).is_null());
        assert!(doc.get(&res_obj, &["Font".into(), PathKey::Index(3)]).is_null());
    }

    #[test]
    fn test_put_through_reference() {
        let mut doc = Document::new();
        let dict = doc.add_object(Object::dict(Vec::<(String, Object)>::new()));
        doc.put(dict, "Title", "(Report)").unwrap();
        doc.put(dict, "Kind", "Summary").unwrap();
        let obj = doc.object(dict.id).unwrap();
        assert_eq!(obj.as_dict().unwrap()["Title"], Object::text("Report"));
        assert_eq!(obj.as_dict().unwrap()["Kind"], Object::name("Summary"));

        doc.delete(dict, "Kind").unwrap();
        assert_eq!(doc.object(dict.id).unwrap().len(), 1);

        let missing = ObjectRef::new(999, 0);
        assert!(matches!(
            doc.put(missing, "A", 1),
            Err(Error::ObjectNotFound(999, 0))
        ));
    }

    #[test]
    fn test_streams() {
        let mut doc = Document::new();
        let dict = Object::dict([("Filter", Object::name("FlateDecode"))]);
        let s = doc.add_stream(&b"q Q"[..], dict).unwrap();
        let stored = doc.object(s.id).unwrap();
        assert!(stored.as_dict().unwrap().get("Filter").is_none());
        assert_eq!(stored.as_dict().unwrap()["Length"], Object::Integer(3));
        assert_eq!(doc.read_stream(s).unwrap(), b"q Q");

        doc.update_stream(s, &b"BT ET"[..], false).unwrap();
        assert_eq!(doc.read_raw_stream(s).unwrap(), Bytes::from_static(b"BT ET"));

        let int = doc.add_object(Object::Integer(1));
        assert!(doc.read_raw_stream(int).is_err());
        assert!(doc.update_stream(int, &b""[..], false).is_err());
        assert_eq!(doc.object(int.id), Some(&Object::Integer(1)));
    }

    #[test]
    fn test_to_plain_without_seen_renders_refs() {
        let mut doc = Document::new();
        let inner = doc.add_object(Object::Integer(5));
        let outer = Object::dict([("Inner", Object::Reference(inner))]);
        let plain = doc.to_plain(&outer, None);
        assert_eq!(plain, serde_json::json!({ "Inner": format!("{} 0 R", inner.id) }));
    }

    #[test]
    fn test_to_plain_with_seen_breaks_cycles() {
        let mut doc = Document::new();
        let a = doc.create_object();
        doc.update_object(
            a.id,
            Object::dict([("Name", Object::name("A")), ("Self", Object::Reference(a))]),
        )
        .unwrap();

        let mut seen = HashMap::new();
        let plain = doc.to_plain(&Object::Reference(a), Some(&mut seen));
        assert_eq!(plain["Name"], "A");
        assert!(plain["Self"].is_null());
        assert!(seen.contains_key(&a.id));
    }

    #[test]
    fn test_nested_page_tree() {
        let mut doc = Document::new();
        let root = doc.pages_root().unwrap();
        let pages = blank_pages(&mut doc, 2);

        // Move the second page under an intermediate node.
        let mid = doc.add_object(Object::dict([
            ("Type", Object::name("Pages")),
            ("Kids", Object::Array(vec![Object::Reference(pages[1])])),
            ("Count", Object::Integer(1)),
            ("Parent", Object::Reference(root)),
        ]));
        doc.put(pages[1], "Parent", mid).unwrap();
        doc.put(
            root,
            "Kids",
            Object::Array(vec![Object::Reference(pages[0]), Object::Reference(mid)]),
        )
        .unwrap();

        assert_eq!(doc.page_refs(), pages);

        let extra = doc
            .add_page([0.0, 0.0, 100.0, 100.0], 90, Object::Null, Object::Null)
            .unwrap();
        doc.insert_page(-1, extra).unwrap();
        assert_eq!(doc.page_refs()[2], extra);
        assert_eq!(doc.get(&Object::Reference(mid), &["Count".into()]), &Object::Integer(2));
        assert_eq!(doc.get(&Object::Reference(root), &["Count".into()]), &Object::Integer(3));

        doc.delete_page(1).unwrap();
        assert_eq!(doc.page_refs(), vec![pages[0], extra]);
        assert_eq!(doc.get(&Object::Reference(root), &["Count".into()]), &Object::Integer(2));
    }

    #[test]
    fn test_insert_page_positions_and_bounds() {
        let mut doc = Document::new();
        let pages = blank_pages(&mut doc, 2);
        let front = doc
            .add_page([0.0, 0.0, 10.0, 10.0], 0, Object::Null, Object::Null)
            .unwrap();
        doc.insert_page(0, front).unwrap();
        assert_eq!(doc.page_refs(), vec![front, pages[0], pages[1]]);

        let other = doc
            .add_page([0.0, 0.0, 10.0, 10.0], 0, Object::Null, Object::Null)
            .unwrap();
        assert!(doc.insert_page(4, other).is_err());
        assert!(doc.insert_page(-2, other).is_err());
        doc.insert_page(3, other).unwrap();
        assert_eq!(doc.page_count(), 4);
    }

    #[test]
    fn test_insert_page_already_in_tree() {
        let mut doc = Document::new();
        let root = doc.pages_root().unwrap();
        let pages = blank_pages(&mut doc, 1);

        let err = doc.insert_page(-1, pages[0]).unwrap_err();
        assert!(matches!(err, Error::PageAlreadyInTree(r) if r == pages[0]));
        assert!(err.is_usage_error());
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.get(&Object::Reference(root), &["Count".into()]), &Object::Integer(1));
    }

    #[test]
    fn test_page_tree_cycle_is_skipped() {
        let mut doc = Document::new();
        let root = doc.pages_root().unwrap();
        blank_pages(&mut doc, 1);
        // root is a dictionary, not an array
        assert!(doc.push(root, Object::Reference(root)).is_err());

        let mut kids = doc
            .get(&Object::Reference(root), &["Kids".into()])
            .as_array()
            .cloned()
            .unwrap();
        kids.push(Object::Reference(root));
        doc.put(root, "Kids", Object::Array(kids)).unwrap();
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn test_page_bounds_and_inheritance() {
        let mut doc = Document::new();
        let root = doc.pages_root().unwrap();
        doc.put(root, "Rotate", 180).unwrap();
        let page = doc.add_object(Object::dict([("Type", Object::name("Page"))]));
        doc.insert_page(-1, page).unwrap();

        assert_eq!(doc.page_bounds(0).unwrap(), [0.0, 0.0, 595.0, 842.0]);
        assert_eq!(doc.page_rotation(0).unwrap(), 180);
        assert!(doc.page_bounds(1).is_err());
    }

    #[test]
    fn test_page_bounds_fallback_uses_configured_size() {
        let config = DocumentConfig::new().with_default_page_size(100.0, 200.0);
        let mut doc = Document::with_config(config);
        let page = doc.add_object(Object::dict([("Type", Object::name("Page"))]));
        doc.insert_page(-1, page).unwrap();
        assert_eq!(doc.page_bounds(0).unwrap(), [0.0, 0.0, 100.0, 200.0]);
    }

    #[test]
    fn test_add_page_validation() {
        let mut doc = Document::new();
        assert!(matches!(
            doc.add_page([0.0, 0.0, 10.0, 10.0], 45, Object::Null, Object::Null),
            Err(Error::InvalidRotation(45))
        ));
        assert!(matches!(
            doc.add_page([0.0, 0.0, 0.0, 10.0], 0, Object::Null, Object::Null),
            Err(Error::InvalidPageSize { .. })
        ));
        let page = doc
            .add_page([0.0, 0.0, 10.0, 10.0], -90, Object::Null, Object::Null)
            .unwrap();
        assert_eq!(doc.object(page.id).unwrap().as_dict().unwrap()["Rotate"], Object::Integer(270));
    }

    #[test]
    fn test_close_releases_everything() {
        let heap = RefCountHeap::shared();
        let mut doc = Document::with_heap(heap.clone(), DocumentConfig::default());
        doc.create_object();
        assert_eq!(heap.live_count(), 4);
        doc.close();
        assert_eq!(heap.live_count(), 0);
    }

    #[test]
    fn test_drop_releases_everything() {
        let heap = RefCountHeap::shared();
        {
            let mut doc = Document::with_heap(heap.clone(), DocumentConfig::default());
            doc.create_object();
        }
        assert_eq!(heap.live_count(), 0);
    }

    #[test]
    fn test_retained_object_outlives_delete() {
        let heap = RefCountHeap::shared();
        let mut doc = Document::with_heap(heap.clone(), DocumentConfig::default());
        let r = doc.add_object(Object::Integer(1));
        let retained = doc.retain(r).unwrap();
        let ptr = retained.pointer();

        doc.delete_object(r.id).unwrap();
        assert_eq!(heap.ref_count(ptr), Some(1));
        drop(retained);
        assert_eq!(heap.ref_count(ptr), None);
        assert!(doc.retain(r).is_none());
    }

    #[test]
    fn test_document_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Document>();
    }
}
