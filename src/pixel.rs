//! Owned pixel-data results produced by harvesting a ring slot.

use crate::format::{ComponentType, FormatDescriptor, PixelLayout};
use bytemuck::Pod;

/// One harvested frame: a self-contained copy of the slot's bytes,
/// tagged with its format and a monotonic frame sequence number.
///
/// A `PixelBuffer` is created by copy-out at harvest time, so it is
/// fully independent of the reusable ring slot it came from; ownership
/// transfers to the result queue and then to the caller on pull.
#[derive(Clone)]
pub struct PixelBuffer {
    data: Box<[u8]>,
    descriptor: FormatDescriptor,
    width: u32,
    height: u32,
    sequence: u64,
}

impl PixelBuffer {
    /// Create a pixel buffer from raw frame bytes.
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` does not match the frame size implied by
    /// the descriptor and dimensions.
    pub fn new(
        data: Box<[u8]>,
        descriptor: FormatDescriptor,
        width: u32,
        height: u32,
        sequence: u64,
    ) -> Self {
        assert_eq!(
            data.len(),
            descriptor.frame_size(width, height),
            "pixel data does not match frame geometry"
        );
        Self {
            data,
            descriptor,
            width,
            height,
            sequence,
        }
    }

    /// The raw frame bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Byte length of the frame.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the frame holds no bytes (never true for a harvested frame).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The resolved format this frame was sampled as.
    pub fn descriptor(&self) -> FormatDescriptor {
        self.descriptor
    }

    /// Channel layout.
    pub fn layout(&self) -> PixelLayout {
        self.descriptor.layout
    }

    /// Host component representation.
    pub fn component_type(&self) -> ComponentType {
        self.descriptor.component
    }

    /// Channels per pixel.
    pub fn channels(&self) -> usize {
        self.descriptor.channels()
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Monotonic sequence number of the request cycle that issued this
    /// frame's transfer.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Number of components in the frame: `width × height × channels`.
    pub fn element_count(&self) -> usize {
        self.width as usize * self.height as usize * self.channels()
    }

    /// View the frame as a slice of typed components.
    ///
    /// Returns `None` if `T`'s size does not match the frame's
    /// component size (e.g. asking for `f32` out of a `u8` frame) or
    /// the bytes are not aligned for `T`.
    pub fn as_typed<T: Pod>(&self) -> Option<&[T]> {
        if std::mem::size_of::<T>() != self.descriptor.bytes_per_component() {
            return None;
        }
        bytemuck::try_cast_slice(&self.data).ok()
    }

    /// Consume the buffer, returning the raw bytes.
    pub fn into_bytes(self) -> Box<[u8]> {
        self.data
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("sequence", &self.sequence)
            .field("format", &self.descriptor)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}
