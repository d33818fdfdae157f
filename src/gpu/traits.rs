//! The device-facing trait the readback engine is generic over.

use crate::error::Result;
use crate::format::FormatDescriptor;
use std::time::Duration;

/// Opaque handle to a device transfer buffer.
///
/// Not `Clone`: the holder owns the device resource and must hand the
/// handle back to [`GraphicsContext::unmap_and_destroy_buffer`] exactly
/// once.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u64);

impl BufferHandle {
    /// Create a handle from a backend-assigned id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The backend-assigned id.
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Opaque completion fence token.
///
/// Created when a transfer is issued, consumed exactly once via
/// [`GraphicsContext::destroy_fence`] after its wait succeeds.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct FenceHandle(pub(crate) u64);

impl FenceHandle {
    /// Create a handle from a backend-assigned id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The backend-assigned id.
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Outcome of waiting on a fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceStatus {
    /// The device signaled completion within the timeout.
    Signaled,
    /// The timeout elapsed first. The fence is still live and may be
    /// waited on again.
    TimedOut,
}

/// Rectangular pixel region of the render target (16 bytes, Copy).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Left edge in pixels.
    pub x: u32,
    /// Bottom edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Region {
    /// Create a new region.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Number of pixels covered.
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// The device facilities the readback engine consumes.
///
/// Implementations wrap a concrete graphics API (OpenGL pixel-pack
/// buffers, Vulkan staging buffers, ...) or a simulation
/// ([`super::SoftwareContext`]). All calls are made from the single
/// thread that owns the device context.
pub trait GraphicsContext {
    /// Allocate a device buffer of `byte_size` bytes and map it into
    /// host address space for the buffer's entire lifetime.
    ///
    /// The returned pointer stays valid until the handle is passed to
    /// [`unmap_and_destroy_buffer`](Self::unmap_and_destroy_buffer).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AllocationError`] if the device cannot
    /// provide the buffer or the mapping.
    fn create_and_map_persistent_buffer(
        &mut self,
        byte_size: usize,
    ) -> Result<(BufferHandle, *mut u8)>;

    /// Queue an asynchronous copy of the render-target `region` into
    /// `buffer`, sampled as `format`.
    ///
    /// Returns immediately; the device executes later. Completion is
    /// observed through a fence created after this call.
    fn copy_render_target_region(
        &mut self,
        buffer: &BufferHandle,
        region: Region,
        format: FormatDescriptor,
    );

    /// Create a fence covering all device commands submitted so far.
    fn create_fence(&mut self) -> FenceHandle;

    /// Block until `fence` signals or `timeout` elapses.
    fn wait_fence(&mut self, fence: &FenceHandle, timeout: Duration) -> FenceStatus;

    /// Destroy a fence token.
    fn destroy_fence(&mut self, fence: FenceHandle);

    /// Unmap and release a buffer created by
    /// [`create_and_map_persistent_buffer`](Self::create_and_map_persistent_buffer).
    ///
    /// The mapped pointer must no longer be dereferenced afterwards.
    fn unmap_and_destroy_buffer(&mut self, buffer: BufferHandle);
}
