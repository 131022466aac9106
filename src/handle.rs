//! Ownership of native resources.
//!
//! A [`ResourceHandle`] holds one reference to an engine resource and gives it
//! back exactly once. The explicit [`ResourceHandle::release`] call and the
//! automatic release in `Drop` share one code path guarded by an atomic flag,
//! so whichever runs first frees the pointer and the other does nothing.

use crate::native::{NativeHeap, NativePtr, ResourceKind};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How a pointer came into the handle's possession.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The engine call returned a fresh reference that we now own.
    New,
    /// The pointer is borrowed from someone else; the handle takes its own reference.
    Borrowed,
}

/// Single-owner handle to a reference-counted native resource.
pub struct ResourceHandle {
    ptr: NativePtr,
    kind: ResourceKind,
    ownership: Ownership,
    heap: Arc<dyn NativeHeap>,
    released: AtomicBool,
}

impl ResourceHandle {
    /// Wrap `ptr`, taking a reference first when it is borrowed.
    pub fn acquire(
        heap: Arc<dyn NativeHeap>,
        ptr: NativePtr,
        kind: ResourceKind,
        ownership: Ownership,
    ) -> Self {
        if ownership == Ownership::Borrowed {
            heap.keep(ptr);
        }
        Self {
            ptr,
            kind,
            ownership,
            heap,
            released: AtomicBool::new(false),
        }
    }

    /// Allocate a fresh resource of `kind` on `heap` and own it.
    pub fn allocate(heap: Arc<dyn NativeHeap>, kind: ResourceKind) -> Self {
        let ptr = heap.alloc(kind);
        Self::acquire(heap, ptr, kind, Ownership::New)
    }

    /// The native pointer.
    ///
    /// # Panics
    ///
    /// Panics if the handle has been released; the pointer may already be
    /// reused by the engine.
    pub fn pointer(&self) -> NativePtr {
        if self.is_released() {
            panic!("use of released {:?} handle {}", self.kind, self.ptr);
        }
        self.ptr
    }

    /// Kind of resource behind the handle.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Ownership the handle was created with.
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Whether the reference has been given back.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Give the reference back to the engine.
    ///
    /// Returns `true` if this call released it, `false` if it was already
    /// released (explicitly or by a concurrent drop).
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.heap.drop_ref(self.ptr);
        true
    }

    /// Take another handle to the same resource.
    pub fn borrow_again(&self) -> Self {
        Self::acquire(
            Arc::clone(&self.heap),
            self.pointer(),
            self.kind,
            Ownership::Borrowed,
        )
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("ptr", &self.ptr)
            .field("kind", &self.kind)
            .field("ownership", &self.ownership)
            .field("released", &self.is_released())
            .finish()
    }
}
