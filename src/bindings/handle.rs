// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Opaque native resource handles.

A [`RawHandle`] is whatever the native backend uses to name a view, buffer or sampler,
usually a pointer.  It is never null; "unbound" is spelled `None`.  Because of the niche,
`Option<RawHandle>` is pointer-sized and a `&[Option<RawHandle>]` has the same layout as a
native array of nullable pointers, so backends can hand slot arrays straight to the driver.
*/

use std::fmt::{Debug, Formatter};
use std::num::NonZeroUsize;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct RawHandle(NonZeroUsize);

impl RawHandle {
    /// Wraps a raw value.  Returns `None` for zero (null).
    pub const fn from_raw(raw: usize) -> Option<Self> {
        match NonZeroUsize::new(raw) {
            Some(n) => Some(RawHandle(n)),
            None => None,
        }
    }

    /// Wraps a native pointer.  Returns `None` for null.
    pub fn from_ptr<T>(ptr: *mut T) -> Option<Self> {
        Self::from_raw(ptr as usize)
    }

    pub const fn as_raw(self) -> usize {
        self.0.get()
    }
}

impl Debug for RawHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawHandle({:#x})", self.0.get())
    }
}
