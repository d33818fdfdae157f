//! The readback scheduler.
//!
//! [`PixelReader`] drives the whole engine from a single thread: each
//! [`request_cycle`](PixelReader::request_cycle) issues a new transfer
//! of the current frame into the ring's write slot and harvests the
//! transfer issued `read_lag` cycles earlier. The lag gives the device
//! roughly half a ring of slack to finish a transfer before the host
//! reads it, so in steady state the fence wait returns immediately —
//! the wait is a correctness backstop, not the common case.

use crate::error::{Error, Result};
use crate::fence::{FenceTracker, WaitStatus};
use crate::format::{ComponentType, FormatDescriptor, PixelLayout};
use crate::gpu::{GraphicsContext, Region};
use crate::observability;
use crate::pixel::PixelBuffer;
use crate::queue::{QueueStats, ResultQueue};
use crate::ring::TransferRing;
use smallvec::SmallVec;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Index of the slot harvested while the write cursor is at `cursor`.
///
/// Computed as `(cursor - lag) mod ring_size` without a signed
/// intermediate, so the wrap-below-zero case cannot yield a negative
/// remainder.
fn lagged_index(cursor: usize, ring_size: usize, lag: usize) -> usize {
    (cursor + ring_size - lag) % ring_size
}

/// Configuration for a [`PixelReader`].
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Left edge of the captured region, in pixels.
    pub x0: u32,
    /// Bottom edge of the captured region, in pixels.
    pub y0: u32,
    /// Capture width in pixels. Must be greater than 0.
    pub width: u32,
    /// Capture height in pixels. Must be greater than 0.
    pub height: u32,
    /// Channel layout to sample.
    pub layout: PixelLayout,
    /// Host component representation.
    pub component: ComponentType,
    /// Number of ring slots. Must be at least 1.
    pub ring_size: usize,
    /// Distance, in slots, between the write cursor and the slot
    /// harvested in the same cycle. Defaults to `ring_size / 2`; a
    /// larger lag gives the device more time to finish before harvest
    /// at the cost of added result latency. Must be less than
    /// `ring_size`.
    pub read_lag: Option<usize>,
    /// Upper bound on a single harvest wait.
    pub fence_timeout: Duration,
}

impl ReaderConfig {
    /// Default ring size: double buffering.
    pub const DEFAULT_RING_SIZE: usize = 2;

    /// Default harvest wait budget (the classic one-second client wait).
    pub const DEFAULT_FENCE_TIMEOUT: Duration = Duration::from_secs(1);

    /// Configuration capturing a full `width` × `height` region at the
    /// origin, with default ring size and fence timeout.
    pub fn new(width: u32, height: u32, layout: PixelLayout, component: ComponentType) -> Self {
        Self {
            x0: 0,
            y0: 0,
            width,
            height,
            layout,
            component,
            ring_size: Self::DEFAULT_RING_SIZE,
            read_lag: None,
            fence_timeout: Self::DEFAULT_FENCE_TIMEOUT,
        }
    }

    /// Set the capture origin.
    pub fn with_origin(mut self, x0: u32, y0: u32) -> Self {
        self.x0 = x0;
        self.y0 = y0;
        self
    }

    /// Set the number of ring slots.
    pub fn with_ring_size(mut self, ring_size: usize) -> Self {
        self.ring_size = ring_size;
        self
    }

    /// Override the read lag (default `ring_size / 2`). A lag of 0
    /// harvests the transfer issued in the same cycle, making every
    /// cycle fully synchronous.
    pub fn with_read_lag(mut self, read_lag: usize) -> Self {
        self.read_lag = Some(read_lag);
        self
    }

    /// Set the harvest wait budget.
    pub fn with_fence_timeout(mut self, timeout: Duration) -> Self {
        self.fence_timeout = timeout;
        self
    }

    fn effective_read_lag(&self) -> usize {
        self.read_lag.unwrap_or(self.ring_size / 2)
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 {
            return Err(Error::InvalidArgument {
                field: "width",
                reason: "must be greater than 0".into(),
            });
        }
        if self.height == 0 {
            return Err(Error::InvalidArgument {
                field: "height",
                reason: "must be greater than 0".into(),
            });
        }
        if self.ring_size == 0 {
            return Err(Error::InvalidArgument {
                field: "ring_size",
                reason: "must be at least 1".into(),
            });
        }
        if let Some(lag) = self.read_lag {
            if lag >= self.ring_size {
                return Err(Error::InvalidArgument {
                    field: "read_lag",
                    reason: format!("must be less than ring_size ({})", self.ring_size),
                });
            }
        }
        Ok(())
    }
}

/// Outcome of a successful [`PixelReader::request_cycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A completed transfer was copied out and queued.
    Harvested,
    /// Ring warm-up: the lagged slot had no transfer in flight, so the
    /// cycle produced no result. Expected for the first `read_lag`
    /// cycles after construction (and after a flush).
    WarmUp,
}

/// Pipelined asynchronous pixel readback engine.
///
/// Owns a ring of persistently mapped transfer buffers and schedules
/// one device→host transfer per cycle while harvesting the transfer
/// issued `read_lag` cycles earlier. Harvested frames queue up in
/// issue order and are drained with [`pull`](Self::pull).
///
/// The engine is single-threaded and synchronous: all methods are
/// ordinary blocking calls made from the thread that owns the device
/// context. The only suspension point is the fence wait inside a
/// harvest.
///
/// After a harvest timeout the affected slot stays pending and is
/// drained when the write cursor next reaches it; a frame recovered
/// that way may enter the queue after frames issued later, which is
/// why every [`PixelBuffer`] carries its issue sequence number.
///
/// # Example
///
/// ```rust
/// use framegrab::gpu::SoftwareContext;
/// use framegrab::{ComponentType, PixelLayout, PixelReader, ReaderConfig};
///
/// let ctx = SoftwareContext::new(64, 64);
/// let frames = ctx.frame_handle();
/// let config = ReaderConfig::new(64, 64, PixelLayout::Rgba, ComponentType::U8)
///     .with_ring_size(4);
/// let mut reader = PixelReader::new(Box::new(ctx), config).unwrap();
///
/// for _ in 0..8 {
///     frames.write_frame(&[0u8; 64 * 64 * 4]);
///     reader.request_cycle().unwrap();
/// }
/// reader.flush().unwrap();
/// while let Some(frame) = reader.pull() {
///     assert_eq!(frame.len(), 64 * 64 * 4);
/// }
/// reader.shutdown().unwrap();
/// ```
pub struct PixelReader {
    ctx: Box<dyn GraphicsContext>,
    ring: TransferRing,
    fences: FenceTracker,
    queue: ResultQueue,
    /// Sequence number each slot's in-flight transfer was issued with.
    issue_seq: SmallVec<[u64; 4]>,
    cursor: usize,
    ring_size: usize,
    read_lag: usize,
    fence_timeout: Duration,
    descriptor: FormatDescriptor,
    width: u32,
    height: u32,
    next_sequence: u64,
    shut_down: bool,
}

impl PixelReader {
    /// Construct a reader over the given graphics context.
    ///
    /// Allocates and persistently maps `ring_size` transfer buffers of
    /// `bytes_per_component × channels × width × height` bytes each.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if a config constraint is violated
    /// (naming the field), or [`Error::AllocationError`] if the device
    /// cannot provide the buffers — in which case every buffer created
    /// before the failure has been released.
    pub fn new(mut ctx: Box<dyn GraphicsContext>, config: ReaderConfig) -> Result<Self> {
        config.validate()?;

        let descriptor = FormatDescriptor::new(config.layout, config.component);
        let region = Region::new(config.x0, config.y0, config.width, config.height);
        let ring = TransferRing::new(ctx.as_mut(), region, descriptor, config.ring_size)?;
        let read_lag = config.effective_read_lag();

        debug!(
            ring_size = config.ring_size,
            read_lag,
            slot_bytes = ring.slot_size(),
            format = %descriptor,
            "pixel reader constructed"
        );

        let mut issue_seq = SmallVec::with_capacity(config.ring_size);
        issue_seq.resize(config.ring_size, 0);

        Ok(Self {
            ctx,
            ring,
            fences: FenceTracker::new(config.ring_size),
            queue: ResultQueue::new(),
            issue_seq,
            cursor: 0,
            ring_size: config.ring_size,
            read_lag,
            fence_timeout: config.fence_timeout,
            descriptor,
            width: config.width,
            height: config.height,
            next_sequence: 0,
            shut_down: false,
        })
    }

    /// Issue a transfer of the current frame and harvest the transfer
    /// issued `read_lag` cycles earlier.
    ///
    /// Returns [`CycleOutcome::WarmUp`] while the ring is still filling
    /// (no result yet — expected quiescence, not a stall) and
    /// [`CycleOutcome::Harvested`] once each cycle yields a frame.
    ///
    /// # Errors
    ///
    /// [`Error::ReadbackTimeout`] if the harvest wait exceeded its
    /// budget. Recoverable: no result is fabricated, scheduler state is
    /// intact, and the slot is drained when the ring next reaches it.
    /// [`Error::InvalidState`] after [`shutdown`](Self::shutdown).
    pub fn request_cycle(&mut self) -> Result<CycleOutcome> {
        self.ensure_live("request_cycle")?;
        let write_index = self.cursor;

        // A prior timeout leaves its slot pending; it must be drained
        // before the buffer is reused. This is that slot's retry. On
        // another timeout nothing has been issued and the cursor has
        // not moved, so the next call repeats the same retry.
        if self.fences.is_armed(write_index) {
            self.harvest(write_index)?;
        }

        self.ring.issue_transfer(self.ctx.as_mut(), write_index);
        self.fences.arm(self.ctx.as_mut(), write_index)?;
        self.issue_seq[write_index] = self.next_sequence;
        self.next_sequence += 1;
        trace!(slot = write_index, sequence = self.next_sequence - 1, "transfer issued");

        let read_index = lagged_index(self.cursor, self.ring_size, self.read_lag);
        let outcome = self.harvest(read_index);
        self.cursor = (self.cursor + 1) % self.ring_size;
        observability::record_cycle();
        outcome
    }

    /// Remove and return the oldest harvested frame, or `None` if no
    /// result is available at this instant. Non-blocking.
    ///
    /// Remains usable after shutdown to drain already-harvested frames.
    pub fn pull(&mut self) -> Option<PixelBuffer> {
        let frame = self.queue.pull();
        observability::record_queue_depth(self.queue.len());
        frame
    }

    /// Drain all in-flight transfers without issuing new ones.
    ///
    /// Performs `ring_size` harvest passes, then resets the cursor, so
    /// every completed transfer has produced a queue entry and every
    /// slot is idle. Must be called before [`shutdown`](Self::shutdown).
    ///
    /// # Errors
    ///
    /// [`Error::ReadbackTimeout`] if a harvest wait times out; calling
    /// `flush()` again retries the remaining slots.
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_live("flush")?;
        debug!("flushing in-flight transfers");
        for _ in 0..self.ring_size {
            let read_index = lagged_index(self.cursor, self.ring_size, self.read_lag);
            self.harvest(read_index)?;
            self.cursor = (self.cursor + 1) % self.ring_size;
        }
        self.cursor = 0;
        Ok(())
    }

    /// Release every device buffer and mapping.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if any transfer is still in flight
    /// (call [`flush`](Self::flush) first) or if already shut down.
    pub fn shutdown(&mut self) -> Result<()> {
        self.ensure_live("shutdown")?;
        let in_flight = self.fences.armed_count();
        if in_flight > 0 {
            return Err(Error::InvalidState(format!(
                "{in_flight} transfers still in flight; call flush() before shutdown()"
            )));
        }
        self.ring.release(self.ctx.as_mut());
        self.shut_down = true;
        debug!("pixel reader shut down");
        Ok(())
    }

    /// Number of frames currently awaiting [`pull`](Self::pull).
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Cumulative result-queue statistics.
    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Number of ring slots.
    pub fn ring_size(&self) -> usize {
        self.ring_size
    }

    /// Slots by which harvest trails issue.
    pub fn read_lag(&self) -> usize {
        self.read_lag
    }

    /// Byte size of each transfer slot.
    pub fn slot_size(&self) -> usize {
        self.ring.slot_size()
    }

    /// The resolved capture format.
    pub fn descriptor(&self) -> FormatDescriptor {
        self.descriptor
    }

    fn ensure_live(&self, op: &str) -> Result<()> {
        if self.shut_down {
            return Err(Error::InvalidState(format!("{op} called after shutdown")));
        }
        Ok(())
    }

    /// Harvest one slot: wait on its fence, copy its bytes out into a
    /// fresh [`PixelBuffer`], and queue the result.
    fn harvest(&mut self, index: usize) -> Result<CycleOutcome> {
        match self
            .fences
            .wait_and_clear(self.ctx.as_mut(), index, self.fence_timeout)
        {
            WaitStatus::NothingArmed => Ok(CycleOutcome::WarmUp),
            WaitStatus::TimedOut => {
                observability::record_timeout();
                warn!(
                    slot = index,
                    timeout_ms = self.fence_timeout.as_millis() as u64,
                    "harvest wait timed out"
                );
                Err(Error::ReadbackTimeout { slot: index })
            }
            WaitStatus::Signaled => {
                let bytes: Box<[u8]> = self.ring.slot_bytes(index).into();
                let frame = PixelBuffer::new(
                    bytes,
                    self.descriptor,
                    self.width,
                    self.height,
                    self.issue_seq[index],
                );
                trace!(slot = index, sequence = frame.sequence(), "frame harvested");
                observability::record_harvest(frame.len() as u64);
                self.queue.push(frame);
                observability::record_queue_depth(self.queue.len());
                Ok(CycleOutcome::Harvested)
            }
        }
    }
}
