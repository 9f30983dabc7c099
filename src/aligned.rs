//! Fixed-length, zero-initialized element buffer aligned for SIMD loads.
use crate::element::Element;
use crate::error::{NnError, Result};
use std::alloc::{self, Layout};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

/// Byte alignment of every matrix buffer. Covers AVX-512 and cache lines.
pub const MATRIX_ALIGN: usize = 64;

/// Heap buffer of `len` elements whose first element sits on a
/// [`MATRIX_ALIGN`] boundary. The length never changes after allocation.
pub struct AlignedBuf<F: Element> {
    ptr: NonNull<F>,
    len: usize,
}

// The buffer uniquely owns its allocation, like `Vec<F>`.
unsafe impl<F: Element> Send for AlignedBuf<F> {}
unsafe impl<F: Element> Sync for AlignedBuf<F> {}

impl<F: Element> AlignedBuf<F> {
    fn layout(len: usize) -> Result<Layout> {
        let bytes = len
            .checked_mul(std::mem::size_of::<F>())
            .ok_or(NnError::Allocation { bytes: usize::MAX })?;
        Layout::from_size_align(bytes, MATRIX_ALIGN).map_err(|_| NnError::Allocation { bytes })
    }

    /// Allocates `len` zeroed elements. Only fails when the allocator does.
    pub fn zeroed(len: usize) -> Result<Self> {
        if len == 0 {
            return Ok(Self {
                ptr: NonNull::dangling(),
                len,
            });
        }
        let layout = Self::layout(len)?;
        // SAFETY: layout has non-zero size; all-zero bits are 0.0 for IEEE floats.
        let raw = unsafe { alloc::alloc_zeroed(layout) } as *mut F;
        let ptr = NonNull::new(raw).ok_or(NnError::Allocation {
            bytes: layout.size(),
        })?;
        Ok(Self { ptr, len })
    }

    /// Allocates a buffer holding a copy of `src`.
    pub fn from_slice(src: &[F]) -> Result<Self> {
        let mut buf = Self::zeroed(src.len())?;
        buf.copy_from_slice(src);
        Ok(buf)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[F] {
        // SAFETY: ptr is valid for len initialized elements (or dangling with len 0).
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [F] {
        // SAFETY: unique ownership through &mut self.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<F: Element> Drop for AlignedBuf<F> {
    fn drop(&mut self) {
        if self.len == 0 {
            return;
        }
        if let Ok(layout) = Self::layout(self.len) {
            // SAFETY: allocated in `zeroed` with this exact layout.
            unsafe { alloc::dealloc(self.ptr.as_ptr() as *mut u8, layout) }
        }
    }
}

impl<F: Element> Clone for AlignedBuf<F> {
    fn clone(&self) -> Self {
        match Self::from_slice(self.as_slice()) {
            Ok(buf) => buf,
            Err(_) => match Self::layout(self.len) {
                Ok(layout) => alloc::handle_alloc_error(layout),
                Err(e) => panic!("{e}"),
            },
        }
    }
}

impl<F: Element> Deref for AlignedBuf<F> {
    type Target = [F];

    fn deref(&self) -> &[F] {
        self.as_slice()
    }
}

impl<F: Element> DerefMut for AlignedBuf<F> {
    fn deref_mut(&mut self) -> &mut [F] {
        self.as_mut_slice()
    }
}

impl<F: Element> fmt::Debug for AlignedBuf<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}
