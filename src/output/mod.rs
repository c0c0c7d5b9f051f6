mod loopback;

pub use loopback::V4L2Output;

use anyhow::Result;
use image::RgbImage;

/// Trait for display destinations of annotated frames
///
/// Purely a consumer: what happens here never feeds back into detection.
pub trait OutputSink {
    /// Write a frame to the output
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Get the negotiated output resolution
    fn resolution(&self) -> (u32, u32);
}
