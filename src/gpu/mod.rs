//! Graphics-context abstraction for the readback engine.
//!
//! The core never talks to a device API directly; it drives the
//! [`GraphicsContext`] trait, which covers exactly the facilities the
//! engine needs: persistently mapped transfer buffers, an asynchronous
//! render-target copy, and completion fences.
//!
//! ```text
//! ┌──────────────┐   issue / arm    ┌────────────────────┐
//! │ PixelReader  │ ───────────────▶ │  GraphicsContext   │
//! │  (scheduler) │ ◀─────────────── │  (GL / Vulkan /    │
//! └──────────────┘  wait / mapped   │   software, ...)   │
//!                     memory        └────────────────────┘
//! ```
//!
//! The crate ships one implementation, [`SoftwareContext`], a simulated
//! device backed by heap memory. It is intended for tests and benches,
//! but is part of the public API so downstream code can test against it
//! without a GPU.

mod software;
mod traits;

pub use software::{FrameHandle, ResourceCounters, SoftwareContext, StallHandle};
pub use traits::{BufferHandle, FenceHandle, FenceStatus, GraphicsContext, Region};
