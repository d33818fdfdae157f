//! Fixed ring of persistently mapped transfer buffers.

use crate::error::Result;
use crate::format::FormatDescriptor;
use crate::gpu::{BufferHandle, GraphicsContext, Region};
use smallvec::SmallVec;
use tracing::debug;

/// One ring element: a device buffer plus its stable mapped address.
struct TransferSlot {
    handle: BufferHandle,
    /// Host address of the persistent mapping. Valid from construction
    /// until release; the slot bytes may only be read after the slot's
    /// fence has been observed signaled.
    ptr: *mut u8,
}

/// A fixed-size pool of device transfer buffers, each mapped into host
/// address space once, at construction, for its entire lifetime.
///
/// The ring owns the buffers; fence bookkeeping lives in
/// [`crate::fence::FenceTracker`], and the scheduler
/// ([`crate::reader::PixelReader`]) arbitrates the handoff between
/// device writes and host reads.
pub struct TransferRing {
    slots: SmallVec<[TransferSlot; 4]>,
    byte_size: usize,
    region: Region,
    descriptor: FormatDescriptor,
}

impl TransferRing {
    /// Allocate and persistently map `ring_size` transfer buffers, each
    /// sized for one frame of `region` sampled as `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AllocationError`] if any allocation or
    /// mapping fails; every buffer created before the failure is
    /// released first, so nothing leaks on the error path.
    pub fn new(
        ctx: &mut dyn GraphicsContext,
        region: Region,
        descriptor: FormatDescriptor,
        ring_size: usize,
    ) -> Result<Self> {
        let byte_size = descriptor.frame_size(region.width, region.height);
        let mut slots: SmallVec<[TransferSlot; 4]> = SmallVec::with_capacity(ring_size);

        for index in 0..ring_size {
            match ctx.create_and_map_persistent_buffer(byte_size) {
                Ok((handle, ptr)) => slots.push(TransferSlot { handle, ptr }),
                Err(err) => {
                    debug!(slot = index, "ring allocation failed, rolling back");
                    for slot in slots.drain(..) {
                        ctx.unmap_and_destroy_buffer(slot.handle);
                    }
                    return Err(err);
                }
            }
        }

        debug!(ring_size, byte_size, "transfer ring allocated");
        Ok(Self {
            slots,
            byte_size,
            region,
            descriptor,
        })
    }

    /// Number of slots in the ring.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the ring holds no slots (only true after release).
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Byte size of each slot.
    pub fn slot_size(&self) -> usize {
        self.byte_size
    }

    /// The region this ring captures.
    pub fn region(&self) -> Region {
        self.region
    }

    /// The pixel format this ring captures.
    pub fn descriptor(&self) -> FormatDescriptor {
        self.descriptor
    }

    /// Queue a device-side copy of the configured render-target region
    /// into slot `index`. Asynchronous; the caller arms a fence for it.
    pub fn issue_transfer(&self, ctx: &mut dyn GraphicsContext, index: usize) {
        let slot = &self.slots[index];
        ctx.copy_render_target_region(&slot.handle, self.region, self.descriptor);
    }

    /// The mapped contents of slot `index`.
    ///
    /// Only meaningful after the slot's fence has been observed
    /// signaled and before a new transfer is issued into it; the
    /// scheduler's fence protocol guarantees the device is not writing
    /// the slot while this slice is read.
    pub fn slot_bytes(&self, index: usize) -> &[u8] {
        let slot = &self.slots[index];
        unsafe { std::slice::from_raw_parts(slot.ptr, self.byte_size) }
    }

    /// Unmap and release every buffer. Must not be called while any
    /// fence is armed; the scheduler flushes first.
    pub fn release(&mut self, ctx: &mut dyn GraphicsContext) {
        for slot in self.slots.drain(..) {
            ctx.unmap_and_destroy_buffer(slot.handle);
        }
        debug!("transfer ring released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::format::{ComponentType, PixelLayout};
    use crate::gpu::SoftwareContext;

    const RGBA8: FormatDescriptor = FormatDescriptor::new(PixelLayout::Rgba, ComponentType::U8);

    #[test]
    fn test_ring_allocates_sized_slots() {
        let mut ctx = SoftwareContext::new(8, 8);
        let counters = ctx.resource_counters();
        let ring = TransferRing::new(&mut ctx, Region::new(0, 0, 8, 8), RGBA8, 3).unwrap();

        assert_eq!(ring.len(), 3);
        assert_eq!(ring.slot_size(), 8 * 8 * 4);
        assert_eq!(counters.live_buffers(), 3);
    }

    #[test]
    fn test_ring_rollback_on_partial_failure() {
        let mut ctx = SoftwareContext::new(8, 8).fail_allocations_after(2);
        let counters = ctx.resource_counters();
        let result = TransferRing::new(&mut ctx, Region::new(0, 0, 8, 8), RGBA8, 4);

        assert!(matches!(result, Err(Error::AllocationError(_))));
        assert_eq!(counters.live_buffers(), 0);
    }

    #[test]
    fn test_ring_release_frees_everything() {
        let mut ctx = SoftwareContext::new(8, 8);
        let counters = ctx.resource_counters();
        let mut ring = TransferRing::new(&mut ctx, Region::new(0, 0, 8, 8), RGBA8, 2).unwrap();

        ring.release(&mut ctx);
        assert!(ring.is_empty());
        assert_eq!(counters.live_buffers(), 0);
    }
}
