//! FIFO holding area for harvested frames awaiting consumption.

use crate::pixel::PixelBuffer;
use std::collections::VecDeque;

/// Snapshot of queue activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Frames currently waiting to be pulled.
    pub queued: usize,
    /// Total frames ever pushed by the scheduler.
    pub total_pushed: u64,
    /// Total frames ever pulled by the caller.
    pub total_pulled: u64,
}

/// Ordered, unbounded FIFO of harvested [`PixelBuffer`]s.
///
/// Produced by the scheduler, drained by the caller's pull API. No
/// upper bound is enforced: the caller is responsible for pulling at
/// least as fast as cycles are requested, or memory grows without
/// limit.
#[derive(Default)]
pub struct ResultQueue {
    queue: VecDeque<PixelBuffer>,
    total_pushed: u64,
    total_pulled: u64,
}

impl ResultQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a harvested frame.
    pub fn push(&mut self, buffer: PixelBuffer) {
        self.total_pushed += 1;
        self.queue.push_back(buffer);
    }

    /// Remove and return the oldest frame, or `None` if the queue is
    /// empty at this instant. Non-blocking.
    pub fn pull(&mut self) -> Option<PixelBuffer> {
        let buffer = self.queue.pop_front();
        if buffer.is_some() {
            self.total_pulled += 1;
        }
        buffer
    }

    /// Number of frames currently queued.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no frames are queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Cumulative queue statistics.
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            queued: self.queue.len(),
            total_pushed: self.total_pushed,
            total_pulled: self.total_pulled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{ComponentType, FormatDescriptor, PixelLayout};

    fn frame(sequence: u64) -> PixelBuffer {
        let desc = FormatDescriptor::new(PixelLayout::Luminance, ComponentType::U8);
        PixelBuffer::new(vec![sequence as u8; 4].into_boxed_slice(), desc, 2, 2, sequence)
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = ResultQueue::new();
        for seq in 0..3 {
            queue.push(frame(seq));
        }
        assert_eq!(queue.len(), 3);
        for seq in 0..3 {
            assert_eq!(queue.pull().unwrap().sequence(), seq);
        }
        assert!(queue.pull().is_none());
    }

    #[test]
    fn test_stats() {
        let mut queue = ResultQueue::new();
        queue.push(frame(0));
        queue.push(frame(1));
        queue.pull();

        let stats = queue.stats();
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.total_pushed, 2);
        assert_eq!(stats.total_pulled, 1);
    }

    #[test]
    fn test_pull_empty_is_none() {
        let mut queue = ResultQueue::new();
        assert!(queue.pull().is_none());
        assert_eq!(queue.stats().total_pulled, 0);
    }
}
