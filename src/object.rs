// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Shared ownership for long-lived GPU-side objects.

Pipelines, pipeline states, shader blobs and similar objects are handed around by
[`Shared`] handles.  Cloning a handle adds a reference, dropping it releases one, and
the object is destroyed on the thread that releases the final reference.

```
use slots_and_names::object::{GpuObject, Shared};

#[derive(Debug)]
struct Fence(&'static str);
impl GpuObject for Fence {
    fn debug_label(&self) -> &str { self.0 }
}

let a = Shared::new(Fence("frame fence"));
let b = a.clone();
assert_eq!(a.ref_count(), 2);
assert!(!b.release());
assert_eq!(a.ref_count(), 1);

// erase the type, then recover it with a checked downcast
let erased = a.into_object();
let fence: Shared<Fence> = erased.downcast().expect("it's a fence");
assert_eq!(fence.debug_label(), "frame fence");
```
*/

use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::sync::Arc;

/// An object whose lifetime is managed by [`Shared`].
///
/// The [`AsAny`] supertrait is what makes [`Shared::downcast`] possible.
pub trait GpuObject: AsAny + Send + Sync + Debug {
    /// A human-readable label used in logs.
    fn debug_label(&self) -> &str;
}

/// Type erasure for [`GpuObject`]s.  Implemented for every eligible type.
#[doc(hidden)]
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/**
A reference-counted handle to a [`GpuObject`].

The count is atomic; the final release observes every write made through other handles
before the object is dropped.  Moving a handle does not touch the count.
*/
pub struct Shared<T: ?Sized> {
    inner: Arc<T>,
}

impl<T: GpuObject> Shared<T> {
    /// Creates a new object with a reference count of one.
    pub fn new(object: T) -> Self {
        Shared {
            inner: Arc::new(object),
        }
    }

    /// Erases the concrete type.
    pub fn into_object(self) -> Shared<dyn GpuObject> {
        let inner: Arc<dyn GpuObject> = self.inner;
        Shared { inner }
    }
}

impl<T: ?Sized> Shared<T> {
    /// Number of live handles to this object.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// True if both handles refer to the same object.
    pub fn ptr_eq(&self, other: &Shared<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Shared<T> {
    /**
    Releases this handle.

    Returns true if this was the last reference, in which case the object has been
    destroyed by the time this function returns.  Only one of several racing releases
    can return true.
    */
    pub fn release(self) -> bool {
        Arc::into_inner(self.inner).is_some()
    }
}

impl Shared<dyn GpuObject> {
    /**
    Checked downcast to a concrete type.

    On success the returned handle holds its own reference; `self` is unaffected.
    */
    pub fn downcast<U: GpuObject>(&self) -> Option<Shared<U>> {
        AsAny::into_any_arc(Arc::clone(&self.inner))
            .downcast::<U>()
            .ok()
            .map(|inner| Shared { inner })
    }

    /// True if the object is a `U`.
    pub fn is<U: GpuObject>(&self) -> bool {
        AsAny::as_any(&*self.inner).is::<U>()
    }
}

impl<T: ?Sized> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Shared {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ?Sized> Deref for Shared<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T: ?Sized + Debug> Debug for Shared<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("object", &&*self.inner)
            .field("ref_count", &Arc::strong_count(&self.inner))
            .finish()
    }
}

impl<T: ?Sized> PartialEq for Shared<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
impl<T: ?Sized> Eq for Shared<T> {}
