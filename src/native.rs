//! Native engine boundary.
//!
//! Every document, object slot and graft map is backed by a resource that
//! lives on the engine side and is reference counted there. The engine is
//! reached through [`NativeHeap`]; [`RefCountHeap`] is the in-process
//! implementation used unless a caller supplies its own.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Opaque engine pointer. Zero is the "no value" sentinel and is never wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativePtr(NonZeroUsize);

impl NativePtr {
    /// Wrap a raw pointer value; `0` yields `None`.
    pub fn new(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(Self)
    }

    /// Raw pointer value.
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl fmt::Display for NativePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0.get())
    }
}

/// Kind of engine resource behind a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A whole document
    Document,
    /// One object slot in a document's object table
    Object,
    /// A graft session's identity map
    GraftMap,
}

/// Reference-counting interface of the native engine.
///
/// Calls are atomic and non-reentrant from the caller's point of view.
pub trait NativeHeap: Send + Sync + fmt::Debug {
    /// Allocate a new resource with a reference count of one.
    fn alloc(&self, kind: ResourceKind) -> NativePtr;

    /// Take an additional reference.
    fn keep(&self, ptr: NativePtr);

    /// Drop one reference, freeing the resource when the count reaches zero.
    ///
    /// Dropping a pointer that is no longer live is a double free and panics.
    fn drop_ref(&self, ptr: NativePtr);
}

#[derive(Debug)]
struct Entry {
    kind: ResourceKind,
    refs: usize,
}

/// In-process reference-counted heap.
#[derive(Debug)]
pub struct RefCountHeap {
    next: AtomicUsize,
    allocated: AtomicUsize,
    entries: Mutex<HashMap<NativePtr, Entry>>,
}

impl Default for RefCountHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl RefCountHeap {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self {
            next: AtomicUsize::new(1),
            allocated: AtomicUsize::new(0),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Create an empty heap behind an `Arc`, ready to hand to documents.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of resources currently alive.
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    /// Number of live resources of the given kind.
    pub fn live_count_of(&self, kind: ResourceKind) -> usize {
        self.lock().values().filter(|e| e.kind == kind).count()
    }

    /// Current reference count of `ptr`, or `None` once it has been freed.
    pub fn ref_count(&self, ptr: NativePtr) -> Option<usize> {
        self.lock().get(&ptr).map(|e| e.refs)
    }

    /// Total number of allocations ever made.
    pub fn total_allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<NativePtr, Entry>> {
        // A panic while holding the lock only happens on a double free; the
        // table itself is still consistent.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl NativeHeap for RefCountHeap {
    fn alloc(&self, kind: ResourceKind) -> NativePtr {
        // Pointers start at 1 and only grow, so the sentinel is never produced.
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        let ptr = NativePtr(NonZeroUsize::new(raw).unwrap_or(NonZeroUsize::MIN));
        self.allocated.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(ptr, Entry { kind, refs: 1 });
        log::trace!("native alloc {:?} {}", kind, ptr);
        ptr
    }

    fn keep(&self, ptr: NativePtr) {
        let mut entries = self.lock();
        match entries.get_mut(&ptr) {
            Some(entry) => entry.refs += 1,
            None => {
                drop(entries);
                panic!("keep on freed native resource {}", ptr);
            },
        }
    }

    fn drop_ref(&self, ptr: NativePtr) {
        let mut entries = self.lock();
        let freed = match entries.get_mut(&ptr) {
            Some(entry) => {
                entry.refs -= 1;
                entry.refs == 0
            },
            None => {
                drop(entries);
                panic!("double free of native resource {}", ptr);
            },
        };
        if freed {
            if let Some(entry) = entries.remove(&ptr) {
                log::trace!("native free {:?} {}", entry.kind, ptr);
            }
        }
    }
}
