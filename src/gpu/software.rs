//! Software-simulated graphics context.
//!
//! `SoftwareContext` implements [`GraphicsContext`] over heap memory:
//! "device" buffers are boxed slices, transfers snapshot a shared
//! render-target image, and fences signal after a configurable transfer
//! latency. A stall switch makes fences never signal, for exercising
//! timeout paths.
//!
//! Tests hold on to the [`FrameHandle`], [`StallHandle`], and
//! [`ResourceCounters`] before boxing the context into the reader, so
//! they can keep driving the simulation from outside.

use super::traits::{BufferHandle, FenceHandle, FenceStatus, GraphicsContext, Region};
use crate::error::{Error, Result};
use crate::format::FormatDescriptor;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A queued device-side copy. The region bytes are snapshotted at issue
/// time; they land in the destination buffer when a covering fence wait
/// completes, mirroring how a real device executes behind the host.
struct PendingCopy {
    id: u64,
    buffer: u64,
    bytes: Vec<u8>,
    ready_at: Instant,
}

/// Shared counters of live device resources.
///
/// Cloned out of a [`SoftwareContext`] before it is handed to the
/// engine; used by teardown tests to prove nothing leaked.
#[derive(Clone, Debug, Default)]
pub struct ResourceCounters {
    buffers: Arc<AtomicUsize>,
    fences: Arc<AtomicUsize>,
}

impl ResourceCounters {
    /// Number of device buffers currently allocated and mapped.
    pub fn live_buffers(&self) -> usize {
        self.buffers.load(Ordering::SeqCst)
    }

    /// Number of fences currently outstanding.
    pub fn live_fences(&self) -> usize {
        self.fences.load(Ordering::SeqCst)
    }
}

/// External handle for replacing the simulated render-target contents.
#[derive(Clone)]
pub struct FrameHandle {
    frame: Arc<Mutex<Vec<u8>>>,
}

impl FrameHandle {
    /// Replace the render-target bytes. Layout must match whatever
    /// descriptor the engine was constructed with; transfers read the
    /// target as a tightly packed row-major image.
    pub fn write_frame(&self, bytes: &[u8]) {
        let mut frame = self.frame.lock().unwrap();
        frame.clear();
        frame.extend_from_slice(bytes);
    }
}

/// External switch that makes fences stop signaling.
#[derive(Clone)]
pub struct StallHandle {
    stalled: Arc<AtomicBool>,
}

impl StallHandle {
    /// Enable or disable the simulated device stall.
    pub fn set(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }
}

/// Simulated device implementing [`GraphicsContext`] over heap memory.
pub struct SoftwareContext {
    target_width: u32,
    target_height: u32,
    frame: Arc<Mutex<Vec<u8>>>,
    stalled: Arc<AtomicBool>,
    counters: ResourceCounters,
    buffers: HashMap<u64, Box<[u8]>>,
    fences: HashMap<u64, u64>,
    pending: Vec<PendingCopy>,
    next_buffer_id: u64,
    next_fence_id: u64,
    next_command_id: u64,
    transfer_latency: Duration,
    allocation_budget: Option<usize>,
    allocations_made: usize,
}

impl SoftwareContext {
    /// Create a simulated device with a render target of the given
    /// pixel dimensions. Transfers complete instantly until a latency
    /// is configured with [`with_transfer_latency`](Self::with_transfer_latency).
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
            frame: Arc::new(Mutex::new(Vec::new())),
            stalled: Arc::new(AtomicBool::new(false)),
            counters: ResourceCounters::default(),
            buffers: HashMap::new(),
            fences: HashMap::new(),
            pending: Vec::new(),
            next_buffer_id: 0,
            next_fence_id: 0,
            next_command_id: 0,
            transfer_latency: Duration::ZERO,
            allocation_budget: None,
            allocations_made: 0,
        }
    }

    /// Set the simulated device-side transfer latency: a fence covering
    /// a copy signals this long after the copy was issued.
    pub fn with_transfer_latency(mut self, latency: Duration) -> Self {
        self.transfer_latency = latency;
        self
    }

    /// Make buffer allocation fail after `n` successful allocations.
    /// Used to exercise the construction rollback path.
    pub fn fail_allocations_after(mut self, n: usize) -> Self {
        self.allocation_budget = Some(n);
        self
    }

    /// Handle for replacing the render-target contents from outside.
    pub fn frame_handle(&self) -> FrameHandle {
        FrameHandle {
            frame: Arc::clone(&self.frame),
        }
    }

    /// Handle for toggling the simulated stall from outside.
    pub fn stall_handle(&self) -> StallHandle {
        StallHandle {
            stalled: Arc::clone(&self.stalled),
        }
    }

    /// Shared live-resource counters.
    pub fn resource_counters(&self) -> ResourceCounters {
        self.counters.clone()
    }

    /// Render-target width in pixels.
    pub fn target_width(&self) -> u32 {
        self.target_width
    }

    /// Render-target height in pixels.
    pub fn target_height(&self) -> u32 {
        self.target_height
    }

    /// Snapshot the requested region out of the current frame,
    /// row-major, zero-filling anything outside the stored bytes.
    fn snapshot_region(&self, region: Region, format: FormatDescriptor) -> Vec<u8> {
        let bpp = format.bytes_per_pixel();
        let row_bytes = region.width as usize * bpp;
        let target_stride = self.target_width as usize * bpp;
        let mut out = vec![0u8; row_bytes * region.height as usize];

        let frame = self.frame.lock().unwrap();
        for row in 0..region.height as usize {
            let src_row = region.y as usize + row;
            let src_start = src_row * target_stride + region.x as usize * bpp;
            let dst_start = row * row_bytes;
            if let Some(src) = frame.get(src_start..src_start + row_bytes) {
                out[dst_start..dst_start + row_bytes].copy_from_slice(src);
            }
        }
        out
    }

    /// Execute every pending copy covered by `watermark`.
    fn retire_commands(&mut self, watermark: u64) {
        let mut remaining = Vec::with_capacity(self.pending.len());
        for cmd in self.pending.drain(..) {
            if cmd.id < watermark {
                if let Some(data) = self.buffers.get_mut(&cmd.buffer) {
                    let n = cmd.bytes.len().min(data.len());
                    data[..n].copy_from_slice(&cmd.bytes[..n]);
                }
            } else {
                remaining.push(cmd);
            }
        }
        self.pending = remaining;
    }
}

impl GraphicsContext for SoftwareContext {
    fn create_and_map_persistent_buffer(
        &mut self,
        byte_size: usize,
    ) -> Result<(BufferHandle, *mut u8)> {
        if byte_size == 0 {
            return Err(Error::AllocationError("byte size must be > 0".into()));
        }
        if let Some(budget) = self.allocation_budget {
            if self.allocations_made >= budget {
                return Err(Error::AllocationError(
                    "simulated device memory exhausted".into(),
                ));
            }
        }
        self.allocations_made += 1;

        let mut data = vec![0u8; byte_size].into_boxed_slice();
        let ptr = data.as_mut_ptr();
        let id = self.next_buffer_id;
        self.next_buffer_id += 1;
        self.buffers.insert(id, data);
        self.counters.buffers.fetch_add(1, Ordering::SeqCst);
        Ok((BufferHandle(id), ptr))
    }

    fn copy_render_target_region(
        &mut self,
        buffer: &BufferHandle,
        region: Region,
        format: FormatDescriptor,
    ) {
        let bytes = self.snapshot_region(region, format);
        let id = self.next_command_id;
        self.next_command_id += 1;
        self.pending.push(PendingCopy {
            id,
            buffer: buffer.0,
            bytes,
            ready_at: Instant::now() + self.transfer_latency,
        });
    }

    fn create_fence(&mut self) -> FenceHandle {
        let id = self.next_fence_id;
        self.next_fence_id += 1;
        // The fence covers every command submitted before it.
        self.fences.insert(id, self.next_command_id);
        self.counters.fences.fetch_add(1, Ordering::SeqCst);
        FenceHandle(id)
    }

    fn wait_fence(&mut self, fence: &FenceHandle, timeout: Duration) -> FenceStatus {
        let Some(&watermark) = self.fences.get(&fence.0) else {
            return FenceStatus::Signaled;
        };
        if self.stalled.load(Ordering::SeqCst) {
            return FenceStatus::TimedOut;
        }

        let now = Instant::now();
        let ready_at = self
            .pending
            .iter()
            .filter(|cmd| cmd.id < watermark)
            .map(|cmd| cmd.ready_at)
            .max();

        match ready_at {
            None => FenceStatus::Signaled,
            Some(ready) => {
                if ready > now + timeout {
                    return FenceStatus::TimedOut;
                }
                if ready > now {
                    std::thread::sleep(ready - now);
                }
                self.retire_commands(watermark);
                FenceStatus::Signaled
            }
        }
    }

    fn destroy_fence(&mut self, fence: FenceHandle) {
        if self.fences.remove(&fence.0).is_some() {
            self.counters.fences.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn unmap_and_destroy_buffer(&mut self, buffer: BufferHandle) {
        self.pending.retain(|cmd| cmd.buffer != buffer.0);
        if self.buffers.remove(&buffer.0).is_some() {
            self.counters.buffers.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{ComponentType, FormatDescriptor, PixelLayout};

    const RGBA8: FormatDescriptor = FormatDescriptor::new(PixelLayout::Rgba, ComponentType::U8);

    #[test]
    fn test_buffer_lifecycle_counts() {
        let mut ctx = SoftwareContext::new(4, 4);
        let counters = ctx.resource_counters();

        let (buf, ptr) = ctx.create_and_map_persistent_buffer(64).unwrap();
        assert!(!ptr.is_null());
        assert_eq!(counters.live_buffers(), 1);

        ctx.unmap_and_destroy_buffer(buf);
        assert_eq!(counters.live_buffers(), 0);
    }

    #[test]
    fn test_copy_lands_after_fence_wait() {
        let mut ctx = SoftwareContext::new(2, 2);
        let frame = ctx.frame_handle();
        frame.write_frame(&[1u8; 2 * 2 * 4]);

        let (buf, ptr) = ctx.create_and_map_persistent_buffer(16).unwrap();
        ctx.copy_render_target_region(&buf, Region::new(0, 0, 2, 2), RGBA8);
        let fence = ctx.create_fence();

        // Not executed until the fence wait retires the command.
        let before = unsafe { std::slice::from_raw_parts(ptr, 16) };
        assert!(before.iter().all(|&b| b == 0));

        assert_eq!(
            ctx.wait_fence(&fence, Duration::from_secs(1)),
            FenceStatus::Signaled
        );
        let after = unsafe { std::slice::from_raw_parts(ptr, 16) };
        assert!(after.iter().all(|&b| b == 1));

        ctx.destroy_fence(fence);
        ctx.unmap_and_destroy_buffer(buf);
    }

    #[test]
    fn test_stall_times_out() {
        let mut ctx = SoftwareContext::new(2, 2);
        let stall = ctx.stall_handle();
        let (buf, _ptr) = ctx.create_and_map_persistent_buffer(16).unwrap();
        ctx.copy_render_target_region(&buf, Region::new(0, 0, 2, 2), RGBA8);
        let fence = ctx.create_fence();

        stall.set(true);
        assert_eq!(
            ctx.wait_fence(&fence, Duration::from_millis(1)),
            FenceStatus::TimedOut
        );

        // Recovery: clearing the stall lets the same fence signal.
        stall.set(false);
        assert_eq!(
            ctx.wait_fence(&fence, Duration::from_secs(1)),
            FenceStatus::Signaled
        );
        ctx.destroy_fence(fence);
        ctx.unmap_and_destroy_buffer(buf);
    }

    #[test]
    fn test_allocation_budget() {
        let mut ctx = SoftwareContext::new(2, 2).fail_allocations_after(1);
        assert!(ctx.create_and_map_persistent_buffer(16).is_ok());
        assert!(matches!(
            ctx.create_and_map_persistent_buffer(16),
            Err(Error::AllocationError(_))
        ));
    }

    #[test]
    fn test_snapshot_subregion() {
        let mut ctx = SoftwareContext::new(4, 2);
        let frame = ctx.frame_handle();
        // 4x2 single-channel u8 image: rows 0..8 and 8..16.
        let gray = FormatDescriptor::new(PixelLayout::Luminance, ComponentType::U8);
        frame.write_frame(&[0, 1, 2, 3, 4, 5, 6, 7]);

        let (buf, ptr) = ctx.create_and_map_persistent_buffer(4).unwrap();
        ctx.copy_render_target_region(&buf, Region::new(1, 1, 2, 1), gray);
        let fence = ctx.create_fence();
        ctx.wait_fence(&fence, Duration::from_secs(1));

        let out = unsafe { std::slice::from_raw_parts(ptr, 2) };
        assert_eq!(out, &[5, 6]);
        ctx.destroy_fence(fence);
        ctx.unmap_and_destroy_buffer(buf);
    }
}
