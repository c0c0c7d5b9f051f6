mod image_sequence;
mod v4l_capture;

pub use image_sequence::ImageSequence;
pub use v4l_capture::WebcamCapture;

use anyhow::Result;
use image::RgbImage;

/// Trait for frame sources
pub trait CaptureSource {
    /// Read the next frame
    ///
    /// Returns `Ok(None)` at end of stream. Read failures are errors and
    /// must never be mistaken for an empty scene.
    fn capture_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Human readable description for logs
    fn describe(&self) -> String;

    /// Frames left before end of stream, if the source is finite
    fn remaining(&self) -> Option<usize> {
        None
    }
}
