// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Byte buffers for vertex and index data.

A [Buffer] does not know whether it holds vertices or indices; that is decided each time a draw
binds it.  Uploads snapshot the caller's data, so the caller may reuse or mutate its memory
immediately afterwards.

```
use accelerated_graphics::bindings::buffer::{Buffer, CRepr};

#[repr(C)]
#[derive(Clone, Copy)]
struct Vertex {
    position: [f32; 2],
    color: [f32; 4],
}
unsafe impl CRepr for Vertex {}

let buffer = Buffer::new("triangle");
buffer.upload_slice(&[
    Vertex { position: [0.0, 0.0], color: [1.0, 0.0, 0.0, 1.0] },
    Vertex { position: [1.0, 0.0], color: [0.0, 1.0, 0.0, 1.0] },
    Vertex { position: [0.0, 1.0], color: [0.0, 0.0, 1.0, 1.0] },
]);
assert_eq!(buffer.len(), 3 * 24);
assert_eq!(buffer.version(), 1);
```
*/

use crate::bindings::resource::{ResourceCore, ResourceId};
use std::sync::Arc;
use wasm_safe_mutex::Mutex;

/// Types whose in-memory representation may be copied to the GPU byte-for-byte.
///
/// # Safety
/// Implementors must be `#[repr(C)]` (or primitive), `Copy`, and contain no padding that would
/// expose uninitialized bytes.
pub unsafe trait CRepr: Copy {}

unsafe impl CRepr for u8 {}
unsafe impl CRepr for i8 {}
unsafe impl CRepr for u16 {}
unsafe impl CRepr for i16 {}
unsafe impl CRepr for u32 {}
unsafe impl CRepr for i32 {}
unsafe impl CRepr for f32 {}
unsafe impl CRepr for f64 {}
unsafe impl<T: CRepr, const N: usize> CRepr for [T; N] {}

pub(crate) fn as_bytes<T: CRepr>(data: &[T]) -> &[u8] {
    // SAFETY: CRepr guarantees every byte of T is initialized plain data.
    unsafe { std::slice::from_raw_parts(data.as_ptr() as *const u8, std::mem::size_of_val(data)) }
}

#[derive(Debug)]
pub(crate) struct BufferContents {
    pub(crate) bytes: Arc<[u8]>,
    pub(crate) version: u64,
}

#[derive(Debug)]
struct Shared {
    core: ResourceCore,
    debug_name: String,
    contents: Mutex<BufferContents>,
}

/// A versioned byte buffer.  Clones share the same underlying resource.
#[derive(Debug, Clone)]
pub struct Buffer {
    shared: Arc<Shared>,
}

impl Buffer {
    pub fn new(debug_name: &str) -> Self {
        Buffer {
            shared: Arc::new(Shared {
                core: ResourceCore::new(),
                debug_name: debug_name.to_string(),
                contents: Mutex::new(BufferContents {
                    bytes: Arc::from(&[][..]),
                    version: 0,
                }),
            }),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.shared.core.id()
    }

    pub fn debug_name(&self) -> &str {
        &self.shared.debug_name
    }

    /// Replaces the contents with a copy of `data`.
    pub fn upload(&self, data: &[u8]) {
        let mut contents = self.shared.contents.lock_sync();
        contents.bytes = Arc::from(data);
        contents.version += 1;
    }

    /// Replaces the contents with a byte copy of `data`.
    pub fn upload_slice<T: CRepr>(&self, data: &[T]) {
        self.upload(as_bytes(data));
    }

    /// Replaces the contents with a copy of `len` elements of `data` starting at `offset`.
    ///
    /// # Panics
    /// If the range does not lie within `data`.
    pub fn upload_range<T: CRepr>(&self, data: &[T], offset: usize, len: usize) {
        let end = offset.checked_add(len);
        assert!(
            end.is_some_and(|end| end <= data.len()),
            "upload range {offset}+{len} exceeds {} elements",
            data.len()
        );
        self.upload_slice(&data[offset..offset + len]);
    }

    /// Size of the current contents in bytes.
    pub fn len(&self) -> usize {
        self.shared.contents.lock_sync().bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of uploads performed so far.
    pub fn version(&self) -> u64 {
        self.shared.contents.lock_sync().version
    }

    /// Releases the native buffer in every context that created one.  Safe to call repeatedly.
    pub fn close(&self) {
        self.shared.core.close();
    }

    pub(crate) fn core(&self) -> &ResourceCore {
        &self.shared.core
    }

    /// A consistent snapshot of contents and the version they belong to.
    pub(crate) fn snapshot(&self) -> (Arc<[u8]>, u64) {
        let contents = self.shared.contents.lock_sync();
        (contents.bytes.clone(), contents.version)
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Buffer {}
