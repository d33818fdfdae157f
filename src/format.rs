//! Pixel layout and component type descriptors.
//!
//! This module is the format resolver: a pure mapping from a requested
//! pixel layout and component type to the numbers the transfer engine
//! needs (bytes per component, channel count, frame byte size).
//!
//! # Design Principles
//!
//! - **Type safety**: Closed enums instead of stringly-typed formats
//! - **Zero-cost**: Small, Copy types, `const fn` accessors
//! - **Total**: Every enum variant resolves; parsing from text is the
//!   only fallible surface

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// Host representation of a single pixel component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ComponentType {
    /// Unsigned 8-bit integer (most common for color).
    #[default]
    U8 = 0,
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 32-bit integer.
    I32,
    /// 32-bit floating point (common for depth).
    F32,
}

impl ComponentType {
    /// Bytes occupied by one component on the host.
    pub const fn bytes(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
        }
    }

    /// Whether the component is floating point.
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "u8",
            Self::I8 => "i8",
            Self::U16 => "u16",
            Self::I16 => "i16",
            Self::U32 => "u32",
            Self::I32 => "i32",
            Self::F32 => "f32",
        };
        f.write_str(name)
    }
}

impl FromStr for ComponentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "u8" => Ok(Self::U8),
            "i8" => Ok(Self::I8),
            "u16" => Ok(Self::U16),
            "i16" => Ok(Self::I16),
            "u32" => Ok(Self::U32),
            "i32" => Ok(Self::I32),
            "f32" => Ok(Self::F32),
            other => Err(Error::UnsupportedFormat(format!(
                "unknown component type `{other}`"
            ))),
        }
    }
}

/// Channel layout of the sampled pixel region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum PixelLayout {
    /// Depth values, one channel.
    DepthComponent = 0,
    /// Red channel only.
    Red,
    /// Green channel only.
    Green,
    /// Blue channel only.
    Blue,
    /// Alpha channel only.
    Alpha,
    /// Single luminance channel.
    Luminance,
    /// Luminance + alpha, two channels.
    LuminanceAlpha,
    /// Red + green, two channels.
    Rg,
    /// Red, green, blue.
    Rgb,
    /// Blue, green, red.
    Bgr,
    /// Red, green, blue, alpha.
    #[default]
    Rgba,
    /// Blue, green, red, alpha.
    Bgra,
}

impl PixelLayout {
    /// Number of channels per pixel for this layout.
    pub const fn channels(self) -> usize {
        match self {
            Self::DepthComponent
            | Self::Red
            | Self::Green
            | Self::Blue
            | Self::Alpha
            | Self::Luminance => 1,
            Self::LuminanceAlpha | Self::Rg => 2,
            Self::Rgb | Self::Bgr => 3,
            Self::Rgba | Self::Bgra => 4,
        }
    }
}

impl fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DepthComponent => "depth",
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Alpha => "alpha",
            Self::Luminance => "luminance",
            Self::LuminanceAlpha => "luminance_alpha",
            Self::Rg => "rg",
            Self::Rgb => "rgb",
            Self::Bgr => "bgr",
            Self::Rgba => "rgba",
            Self::Bgra => "bgra",
        };
        f.write_str(name)
    }
}

impl FromStr for PixelLayout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "depth" => Ok(Self::DepthComponent),
            "red" => Ok(Self::Red),
            "green" => Ok(Self::Green),
            "blue" => Ok(Self::Blue),
            "alpha" => Ok(Self::Alpha),
            "luminance" => Ok(Self::Luminance),
            "luminance_alpha" => Ok(Self::LuminanceAlpha),
            "rg" => Ok(Self::Rg),
            "rgb" => Ok(Self::Rgb),
            "bgr" => Ok(Self::Bgr),
            "rgba" => Ok(Self::Rgba),
            "bgra" => Ok(Self::Bgra),
            other => Err(Error::UnsupportedFormat(format!(
                "unknown pixel layout `{other}`"
            ))),
        }
    }
}

/// Resolved pixel format: layout + component type (2 bytes, Copy).
///
/// Consulted once at construction to size the transfer buffers and once
/// per harvest to tag the output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct FormatDescriptor {
    /// Channel layout.
    pub layout: PixelLayout,
    /// Host component representation.
    pub component: ComponentType,
}

impl FormatDescriptor {
    /// Create a descriptor from a layout and component type.
    pub const fn new(layout: PixelLayout, component: ComponentType) -> Self {
        Self { layout, component }
    }

    /// Bytes per component on the host.
    pub const fn bytes_per_component(&self) -> usize {
        self.component.bytes()
    }

    /// Channels per pixel.
    pub const fn channels(&self) -> usize {
        self.layout.channels()
    }

    /// Bytes per pixel (component size times channel count).
    pub const fn bytes_per_pixel(&self) -> usize {
        self.component.bytes() * self.layout.channels()
    }

    /// Total byte size of one frame of the given dimensions.
    pub const fn frame_size(&self, width: u32, height: u32) -> usize {
        self.bytes_per_pixel() * width as usize * height as usize
    }
}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.layout, self.component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_bytes() {
        assert_eq!(ComponentType::U8.bytes(), 1);
        assert_eq!(ComponentType::I8.bytes(), 1);
        assert_eq!(ComponentType::U16.bytes(), 2);
        assert_eq!(ComponentType::I16.bytes(), 2);
        assert_eq!(ComponentType::U32.bytes(), 4);
        assert_eq!(ComponentType::I32.bytes(), 4);
        assert_eq!(ComponentType::F32.bytes(), 4);
        assert!(ComponentType::F32.is_float());
        assert!(!ComponentType::U32.is_float());
    }

    #[test]
    fn test_layout_channels() {
        assert_eq!(PixelLayout::DepthComponent.channels(), 1);
        assert_eq!(PixelLayout::Luminance.channels(), 1);
        assert_eq!(PixelLayout::LuminanceAlpha.channels(), 2);
        assert_eq!(PixelLayout::Rg.channels(), 2);
        assert_eq!(PixelLayout::Rgb.channels(), 3);
        assert_eq!(PixelLayout::Bgr.channels(), 3);
        assert_eq!(PixelLayout::Rgba.channels(), 4);
        assert_eq!(PixelLayout::Bgra.channels(), 4);
    }

    #[test]
    fn test_frame_size() {
        let desc = FormatDescriptor::new(PixelLayout::Rgba, ComponentType::U8);
        assert_eq!(desc.bytes_per_pixel(), 4);
        assert_eq!(desc.frame_size(640, 480), 640 * 480 * 4);

        let depth = FormatDescriptor::new(PixelLayout::DepthComponent, ComponentType::F32);
        assert_eq!(depth.frame_size(100, 50), 100 * 50 * 4);
    }

    #[test]
    fn test_parse_round_trip() {
        for layout in [
            PixelLayout::DepthComponent,
            PixelLayout::LuminanceAlpha,
            PixelLayout::Bgra,
        ] {
            assert_eq!(layout.to_string().parse::<PixelLayout>().unwrap(), layout);
        }
        assert_eq!("f32".parse::<ComponentType>().unwrap(), ComponentType::F32);
    }

    #[test]
    fn test_parse_unknown_fails() {
        assert!(matches!(
            "cmyk".parse::<PixelLayout>(),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(matches!(
            "f64".parse::<ComponentType>(),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
