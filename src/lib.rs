//! # framegrab
//!
//! Pipelined asynchronous GPU→host pixel readback.
//!
//! framegrab moves rendered pixel data from device memory into host
//! memory without stalling the render loop: a fixed ring of
//! persistently mapped transfer buffers is paired with completion
//! fences, and each request cycle issues a new transfer while
//! harvesting the transfer issued half a ring earlier. Transfer
//! latency overlaps with rendering work instead of blocking it.
//!
//! ## Features
//!
//! - **Persistent mappings**: each transfer buffer is mapped once at
//!   construction and reused for the engine's whole lifetime
//! - **Fence-guarded handoff**: a slot is read only after its fence
//!   signals, and never reissued while a harvest is pending
//! - **Ordered results**: harvested frames queue in issue order, each
//!   tagged with its frame sequence number
//! - **Backend-agnostic**: the engine drives a [`gpu::GraphicsContext`]
//!   trait; a heap-backed [`gpu::SoftwareContext`] ships for testing
//!
//! ## Quick Start
//!
//! ```rust
//! use framegrab::gpu::SoftwareContext;
//! use framegrab::{ComponentType, PixelLayout, PixelReader, ReaderConfig};
//!
//! let ctx = SoftwareContext::new(320, 240);
//! let frames = ctx.frame_handle();
//!
//! let config = ReaderConfig::new(320, 240, PixelLayout::Rgba, ComponentType::U8)
//!     .with_ring_size(4);
//! let mut reader = PixelReader::new(Box::new(ctx), config)?;
//!
//! // Render loop: one cycle per frame, pull results as they appear.
//! for _frame in 0..16 {
//!     frames.write_frame(&[0u8; 320 * 240 * 4]);
//!     reader.request_cycle()?;
//!     while let Some(pixels) = reader.pull() {
//!         assert_eq!(pixels.element_count(), 320 * 240 * 4);
//!     }
//! }
//!
//! reader.flush()?;
//! reader.shutdown()?;
//! # Ok::<(), framegrab::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod error;
pub mod fence;
pub mod format;
pub mod gpu;
pub mod observability;
pub mod pixel;
pub mod queue;
pub mod reader;
pub mod ring;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::format::{ComponentType, FormatDescriptor, PixelLayout};
    pub use crate::gpu::{GraphicsContext, Region};
    pub use crate::pixel::PixelBuffer;
    pub use crate::reader::{CycleOutcome, PixelReader, ReaderConfig};
}

pub use error::{Error, Result};
pub use format::{ComponentType, FormatDescriptor, PixelLayout};
pub use pixel::PixelBuffer;
pub use reader::{CycleOutcome, PixelReader, ReaderConfig};
