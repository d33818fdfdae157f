//! Per-slot completion fence bookkeeping.

use crate::error::{Error, Result};
use crate::gpu::{FenceHandle, FenceStatus, GraphicsContext};
use smallvec::SmallVec;
use std::time::Duration;
use tracing::trace;

/// Outcome of [`FenceTracker::wait_and_clear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// The fence signaled; it has been destroyed and the slot cleared.
    Signaled,
    /// The wait timed out. The fence stays armed so a later pass can
    /// retry the wait; nothing was destroyed.
    TimedOut,
    /// No fence was armed for the slot: it has never been written, or
    /// was already harvested. Expected during ring warm-up.
    NothingArmed,
}

/// Tracks the optional outstanding fence of every ring slot and owns
/// the arm / wait / release protocol for those tokens.
///
/// The tracker holds the slots' armed state exclusively: a slot's fence
/// is present from issue until harvest and absent otherwise, which is
/// what lets the scheduler guarantee a slot is never read while a
/// device write may still be in flight.
pub struct FenceTracker {
    fences: SmallVec<[Option<FenceHandle>; 4]>,
}

impl FenceTracker {
    /// Create a tracker for `ring_size` slots, all unarmed.
    pub fn new(ring_size: usize) -> Self {
        let mut fences = SmallVec::with_capacity(ring_size);
        fences.resize_with(ring_size, || None);
        Self { fences }
    }

    /// Arm slot `index`: create a fence covering all device commands
    /// submitted so far and store it against the slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the slot already has an armed
    /// fence — a harvest was skipped, which is a scheduler bug, not a
    /// runtime transient.
    pub fn arm(&mut self, ctx: &mut dyn GraphicsContext, index: usize) -> Result<()> {
        if self.fences[index].is_some() {
            return Err(Error::InvalidState(format!(
                "slot {index} already has an armed fence"
            )));
        }
        let fence = ctx.create_fence();
        trace!(slot = index, fence = fence.id(), "fence armed");
        self.fences[index] = Some(fence);
        Ok(())
    }

    /// Wait for slot `index`'s fence and clear it.
    ///
    /// A no-op when nothing is armed. On timeout the fence is left
    /// armed; only a signaled wait destroys the token and clears the
    /// slot.
    pub fn wait_and_clear(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        index: usize,
        timeout: Duration,
    ) -> WaitStatus {
        let Some(fence) = self.fences[index].as_ref() else {
            return WaitStatus::NothingArmed;
        };
        match ctx.wait_fence(fence, timeout) {
            FenceStatus::TimedOut => WaitStatus::TimedOut,
            FenceStatus::Signaled => {
                let fence = self.fences[index].take().expect("fence present");
                trace!(slot = index, fence = fence.id(), "fence signaled");
                ctx.destroy_fence(fence);
                WaitStatus::Signaled
            }
        }
    }

    /// Whether slot `index` currently has an armed fence.
    pub fn is_armed(&self, index: usize) -> bool {
        self.fences[index].is_some()
    }

    /// Number of slots with an armed fence.
    pub fn armed_count(&self) -> usize {
        self.fences.iter().filter(|f| f.is_some()).count()
    }
}
