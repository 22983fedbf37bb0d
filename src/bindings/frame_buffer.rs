// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Render targets.

A [FrameBufferBase] is the shared part of a render target: its identity (the on-screen "main"
target or an offscreen one) and the texture that receives color.  A [FrameBuffer] is a view of a
base that adds the mutable geometry: the region being rendered, the full allocation size, the sample
count, whether depth and stencil storage exist, and an optional scissor rectangle.

Several views may share one base, for example to render into sub-regions of one texture.

Geometry setters compare against the current values first; setting what is already set changes
nothing, so calling them every frame is free.
*/

use crate::bindings::resource::{ResourceCore, ResourceId};
use crate::bindings::texture::Texture;
use crate::images::state::Scissor;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use wasm_safe_mutex::Mutex;

pub const DEFAULT_INITIAL_WIDTH: u32 = 128;
pub const DEFAULT_INITIAL_HEIGHT: u32 = 128;

/// Everything native framebuffer storage depends on.
///
/// Storage is rebuilt exactly when this changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameBufferInfo {
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    pub has_depth: bool,
    pub has_stencil: bool,
}

#[derive(Debug)]
struct BaseShared {
    core: ResourceCore,
    is_main: bool,
    color: Texture,
    estimated_memory: AtomicU64,
}

/// The shared identity and color texture of a render target.
#[derive(Debug, Clone)]
pub struct FrameBufferBase {
    shared: Arc<BaseShared>,
}

impl FrameBufferBase {
    pub fn new(is_main: bool) -> Self {
        let name = if is_main { "main framebuffer" } else { "offscreen framebuffer" };
        FrameBufferBase {
            shared: Arc::new(BaseShared {
                core: ResourceCore::new(),
                is_main,
                color: Texture::new_frame_buffer_color(name),
                estimated_memory: AtomicU64::new(0),
            }),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.shared.core.id()
    }

    pub fn is_main(&self) -> bool {
        self.shared.is_main
    }

    /// Offscreen targets render into a texture that can be sampled afterwards.
    pub fn is_texture(&self) -> bool {
        !self.shared.is_main
    }

    /// The color attachment.
    pub fn texture(&self) -> &Texture {
        &self.shared.color
    }

    /// Bytes of color plus depth/stencil storage, as of the last resize.
    pub fn estimated_memory(&self) -> u64 {
        self.shared.estimated_memory.load(Ordering::Relaxed)
    }

    /// Releases the native framebuffer, its depth/stencil storage and its color texture.
    pub fn close(&self) {
        self.shared.color.close();
        self.shared.core.close();
    }

    pub(crate) fn core(&self) -> &ResourceCore {
        &self.shared.core
    }
}

impl PartialEq for FrameBufferBase {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for FrameBufferBase {}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Geometry {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    full_width: u32,
    full_height: u32,
    samples: u32,
    has_depth: bool,
    has_stencil: bool,
    scissor: Option<Scissor>,
    version: u64,
}

#[derive(Debug)]
struct ViewShared {
    base: FrameBufferBase,
    geometry: Mutex<Geometry>,
}

/// A view of a [FrameBufferBase] with its own geometry.  Clones share the same view.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    shared: Arc<ViewShared>,
}

impl FrameBuffer {
    /// An offscreen framebuffer with its own base.
    pub fn new() -> Self {
        Self::with_base(FrameBufferBase::new(false))
    }

    /// The on-screen framebuffer.
    pub fn main() -> Self {
        Self::with_base(FrameBufferBase::new(true))
    }

    /// A new view over an existing base.
    pub fn with_base(base: FrameBufferBase) -> Self {
        FrameBuffer {
            shared: Arc::new(ViewShared {
                base,
                geometry: Mutex::new(Geometry {
                    x: 0,
                    y: 0,
                    width: DEFAULT_INITIAL_WIDTH,
                    height: DEFAULT_INITIAL_HEIGHT,
                    full_width: DEFAULT_INITIAL_WIDTH,
                    full_height: DEFAULT_INITIAL_HEIGHT,
                    samples: 1,
                    has_depth: true,
                    has_stencil: true,
                    scissor: None,
                    version: 0,
                }),
            }),
        }
    }

    pub fn base(&self) -> &FrameBufferBase {
        &self.shared.base
    }

    pub fn is_main(&self) -> bool {
        self.shared.base.is_main()
    }

    pub fn texture(&self) -> &Texture {
        self.shared.base.texture()
    }

    /// Sets the rendered region to `width`x`height` at the origin, with a matching full size.
    pub fn set_size(&self, width: u32, height: u32) {
        self.set_region(0, 0, width, height, width, height);
    }

    /// Sets the rendered region inside a `full_width`x`full_height` allocation.
    pub fn set_region(&self, x: i32, y: i32, width: u32, height: u32, full_width: u32, full_height: u32) {
        let mut g = self.shared.geometry.lock_sync();
        if g.x == x
            && g.y == y
            && g.width == width
            && g.height == height
            && g.full_width == full_width
            && g.full_height == full_height
        {
            return;
        }
        // Only a new size reallocates; moving the region keeps what was rendered.
        let color = self.texture();
        if (color.width(), color.height()) != (width, height) {
            color.upload(crate::pixel_formats::Bitmap::empty(width, height), false);
        }
        self.shared.base.shared.estimated_memory.store(
            full_width as u64 * full_height as u64 * (4 + 4),
            Ordering::Relaxed,
        );
        g.x = x;
        g.y = y;
        g.width = width;
        g.height = height;
        g.full_width = full_width;
        g.full_height = full_height;
        g.version += 1;
    }

    pub fn set_samples(&self, samples: u32) {
        let mut g = self.shared.geometry.lock_sync();
        if g.samples == samples {
            return;
        }
        g.samples = samples;
        g.version += 1;
    }

    /// Chooses whether depth and stencil storage exist.
    pub fn set_extra(&self, has_depth: bool, has_stencil: bool) {
        let mut g = self.shared.geometry.lock_sync();
        if g.has_depth == has_depth && g.has_stencil == has_stencil {
            return;
        }
        g.has_depth = has_depth;
        g.has_stencil = has_stencil;
        g.version += 1;
    }

    /// Limits rendering to `scissor`, or removes the limit with `None`.
    pub fn set_scissor(&self, scissor: Option<Scissor>) {
        self.shared.geometry.lock_sync().scissor = scissor;
    }

    pub fn scissor(&self) -> Option<Scissor> {
        self.shared.geometry.lock_sync().scissor
    }

    pub fn x(&self) -> i32 {
        self.shared.geometry.lock_sync().x
    }
    pub fn y(&self) -> i32 {
        self.shared.geometry.lock_sync().y
    }
    pub fn width(&self) -> u32 {
        self.shared.geometry.lock_sync().width
    }
    pub fn height(&self) -> u32 {
        self.shared.geometry.lock_sync().height
    }
    pub fn full_width(&self) -> u32 {
        self.shared.geometry.lock_sync().full_width
    }
    pub fn full_height(&self) -> u32 {
        self.shared.geometry.lock_sync().full_height
    }
    pub fn samples(&self) -> u32 {
        self.shared.geometry.lock_sync().samples
    }
    pub fn has_depth(&self) -> bool {
        self.shared.geometry.lock_sync().has_depth
    }
    pub fn has_stencil(&self) -> bool {
        self.shared.geometry.lock_sync().has_stencil
    }

    /// Number of real geometry changes so far.
    pub fn version(&self) -> u64 {
        self.shared.geometry.lock_sync().version
    }

    pub fn info(&self) -> FrameBufferInfo {
        let g = self.shared.geometry.lock_sync();
        FrameBufferInfo {
            width: g.width,
            height: g.height,
            samples: g.samples,
            has_depth: g.has_depth,
            has_stencil: g.has_stencil,
        }
    }

    /// Closes the base; see [FrameBufferBase::close].
    pub fn close(&self) {
        self.shared.base.close();
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for FrameBuffer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for FrameBuffer {}
