// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The native-resource table of one context.

Every handle a context has touched gets an entry here, keyed by the handle's [ResourceId].  The
entry holds the native object and the handle version it was last materialized from.

Deletions arrive through a [DeletionQueue].  Closing a handle may happen on any thread, so the
queue is the only part of the table shared outside the render thread.  The table itself is owned
by its context and only drains the queue at flush points.
*/

use crate::bindings::buffer::Buffer;
use crate::bindings::frame_buffer::{FrameBufferBase, FrameBufferInfo};
use crate::bindings::resource::{CachedVersion, ResourceCore, ResourceId};
use crate::bindings::texture::Texture;
use crate::images::shader::{CompiledProgram, ProgramConfig};
use crate::imp::{Backend, NativeId};
use std::collections::HashMap;
use std::sync::Arc;
use wasm_safe_mutex::Mutex;

/// Ids of closed resources, waiting for their context's next flush point.
///
/// Any number of threads may push; one context drains.
#[derive(Debug, Default)]
pub struct DeletionQueue {
    pending: Mutex<Vec<ResourceId>>,
}

impl DeletionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, id: ResourceId) {
        self.pending.lock_sync().push(id);
    }

    pub fn len(&self) -> usize {
        self.pending.lock_sync().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Swaps the pending list for an empty one and returns what was in it.
    fn take(&self) -> Vec<ResourceId> {
        std::mem::take(&mut *self.pending.lock_sync())
    }

    /// Hands every pending id to `delete`, including ids pushed while draining.
    ///
    /// The lock is not held while `delete` runs, so producers never wait on native deletion.
    pub fn drain(&self, mut delete: impl FnMut(ResourceId)) -> usize {
        let mut drained = 0;
        loop {
            let batch = self.take();
            if batch.is_empty() {
                return drained;
            }
            drained += batch.len();
            for id in batch {
                delete(id);
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct BufferEntry {
    pub(crate) native: NativeId,
    pub(crate) cached: CachedVersion,
    pub(crate) estimated_bytes: u64,
}

#[derive(Debug)]
pub(crate) struct TextureEntry {
    pub(crate) native: NativeId,
    pub(crate) cached: CachedVersion,
    pub(crate) estimated_bytes: u64,
    /// Whether the materialized version has a mipmap chain.
    pub(crate) mipmaps: bool,
}

#[derive(Debug)]
pub(crate) struct FrameBufferEntry {
    pub(crate) framebuffer: NativeId,
    pub(crate) renderbuffer: NativeId,
    pub(crate) info: Option<FrameBufferInfo>,
}

/// Live native objects and their byte estimates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub buffers: usize,
    pub textures: usize,
    pub frame_buffers: usize,
    pub programs: usize,
    pub buffer_bytes: u64,
    pub texture_bytes: u64,
    pub pending_deletions: usize,
}

#[derive(Debug)]
pub(crate) struct NativeTable {
    queue: Arc<DeletionQueue>,
    pub(crate) buffers: HashMap<ResourceId, BufferEntry>,
    pub(crate) textures: HashMap<ResourceId, TextureEntry>,
    pub(crate) frame_buffers: HashMap<ResourceId, FrameBufferEntry>,
    pub(crate) programs: HashMap<(ResourceId, ProgramConfig), CompiledProgram>,
}

impl NativeTable {
    pub(crate) fn new() -> Self {
        NativeTable {
            queue: Arc::new(DeletionQueue::new()),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            frame_buffers: HashMap::new(),
            programs: HashMap::new(),
        }
    }

    pub(crate) fn link(&self, core: &ResourceCore) {
        core.link(&self.queue);
    }

    pub(crate) fn buffer<B: Backend + ?Sized>(&mut self, backend: &mut B, buffer: &Buffer) -> &mut BufferEntry {
        let queue = &self.queue;
        self.buffers.entry(buffer.id()).or_insert_with(|| {
            buffer.core().link(queue);
            BufferEntry {
                native: backend.create_buffer(),
                cached: CachedVersion::new(),
                estimated_bytes: 0,
            }
        })
    }

    pub(crate) fn texture<B: Backend + ?Sized>(&mut self, backend: &mut B, texture: &Texture) -> &mut TextureEntry {
        let queue = &self.queue;
        self.textures.entry(texture.id()).or_insert_with(|| {
            texture.core().link(queue);
            TextureEntry {
                native: backend.create_texture(),
                cached: CachedVersion::new(),
                estimated_bytes: 0,
                mipmaps: false,
            }
        })
    }

    pub(crate) fn frame_buffer<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        base: &FrameBufferBase,
    ) -> &mut FrameBufferEntry {
        let queue = &self.queue;
        self.frame_buffers.entry(base.id()).or_insert_with(|| {
            base.core().link(queue);
            FrameBufferEntry {
                framebuffer: backend.create_framebuffer(),
                renderbuffer: backend.create_renderbuffer(),
                info: None,
            }
        })
    }

    /// Releases one resource's native objects, whatever kind it is.
    pub(crate) fn delete<B: Backend + ?Sized>(&mut self, backend: &mut B, id: ResourceId) {
        if let Some(entry) = self.buffers.remove(&id) {
            backend.delete_buffer(entry.native);
        }
        if let Some(entry) = self.textures.remove(&id) {
            backend.delete_texture(entry.native);
        }
        if let Some(entry) = self.frame_buffers.remove(&id) {
            backend.delete_renderbuffer(entry.renderbuffer);
            backend.delete_framebuffer(entry.framebuffer);
        }
        for program in self.remove_programs(id) {
            backend.delete_program(program.native);
        }
    }

    /// Removes every compiled variant of program `id`.
    pub(crate) fn remove_programs(&mut self, id: ResourceId) -> Vec<CompiledProgram> {
        let keys: Vec<_> = self.programs.keys().filter(|(p, _)| *p == id).copied().collect();
        keys.into_iter()
            .filter_map(|key| self.programs.remove(&key))
            .collect()
    }

    /// Deletes everything closed since the last drain.  Returns how many ids were drained.
    pub(crate) fn drain_deletions<B: Backend + ?Sized>(&mut self, backend: &mut B) -> usize {
        let queue = self.queue.clone();
        queue.drain(|id| self.delete(backend, id))
    }

    /// Forgets every native object without deleting it; the objects died with the context.
    pub(crate) fn forget_all(&mut self) {
        self.buffers.clear();
        self.textures.clear();
        self.frame_buffers.clear();
        self.programs.clear();
    }

    pub(crate) fn stats(&self) -> Stats {
        Stats {
            buffers: self.buffers.len(),
            textures: self.textures.len(),
            frame_buffers: self.frame_buffers.len(),
            programs: self.programs.len(),
            buffer_bytes: self.buffers.values().map(|b| b.estimated_bytes).sum(),
            texture_bytes: self.textures.values().map(|t| t.estimated_bytes).sum(),
            pending_deletions: self.queue.len(),
        }
    }
}
