use crate::config::Roi;
use crate::error::FrameError;
use image::{imageops, GrayImage, RgbImage};

/// Gaussian sigma equivalent to a 21x21 kernel with automatic sigma
const BLUR_SIGMA: f32 = 3.5;

/// Normalizes raw colour frames into the blurred luminance images the extractors compare
pub struct Preprocessor {
    target_width: u32,
    target_height: u32,
    roi: Option<Roi>,
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32, roi: Option<Roi>) -> Self {
        Self {
            target_width,
            target_height,
            roi,
        }
    }

    /// Preprocess an RGB frame for foreground extraction
    ///
    /// Steps:
    /// 1. Resize to target dimensions
    /// 2. Crop to the region of interest, if any
    /// 3. Convert to luminance
    /// 4. Blur to suppress sensor noise
    pub fn preprocess(&self, frame: &RgbImage) -> Result<GrayImage, FrameError> {
        let _span = tracing::debug_span!("preprocess").entered();

        validate_frame(frame)?;

        let resized = resize_to(frame, self.target_width, self.target_height);

        let gray = match self.roi {
            Some(roi) => {
                let cropped =
                    imageops::crop_imm(&resized, roi.x, roi.y, roi.width, roi.height).to_image();
                imageops::grayscale(&cropped)
            }
            None => imageops::grayscale(&resized),
        };

        Ok(imageops::blur(&gray, BLUR_SIGMA))
    }

    /// Offset of the processed image inside the resized frame
    pub fn origin(&self) -> (u32, u32) {
        self.roi.map_or((0, 0), |roi| (roi.x, roi.y))
    }
}

/// Resize a frame; frames already at the target size are returned as a copy
pub fn resize_to(frame: &RgbImage, width: u32, height: u32) -> RgbImage {
    if frame.dimensions() != (width, height) {
        imageops::resize(frame, width, height, imageops::FilterType::Triangle)
    } else {
        frame.clone()
    }
}

/// Reject frames no pipeline stage can work with
pub fn validate_frame(frame: &RgbImage) -> Result<(), FrameError> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(FrameError::Empty { width, height });
    }
    Ok(())
}

/// Build a frame from an interleaved pixel buffer handed over by a frame source
///
/// # Arguments
/// * `width`, `height` - Frame dimensions
/// * `channels` - Channels per pixel; only 3 (RGB) is accepted
/// * `data` - Row-major interleaved bytes
pub fn frame_from_raw(
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<u8>,
) -> Result<RgbImage, FrameError> {
    if width == 0 || height == 0 {
        return Err(FrameError::Empty { width, height });
    }
    if channels != 3 {
        return Err(FrameError::ChannelCount(channels));
    }

    let expected = width as usize * height as usize * 3;
    let actual = data.len();
    let mismatch = FrameError::BufferSize {
        width,
        height,
        expected,
        actual,
    };
    if actual != expected {
        return Err(mismatch);
    }
    RgbImage::from_raw(width, height, data).ok_or(mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_preprocess_outputs_single_channel_at_target_size() {
        let preprocessor = Preprocessor::new(320, 240, None);
        let frame = RgbImage::from_pixel(640, 480, Rgb([255, 0, 0]));

        let processed = preprocessor.preprocess(&frame).unwrap();

        assert_eq!(processed.dimensions(), (320, 240));
        // Uniform input stays uniform after blurring
        let first = processed.get_pixel(0, 0)[0];
        assert!(processed.pixels().all(|p| p[0].abs_diff(first) <= 1));
    }

    #[test]
    fn test_preprocess_crops_to_roi() {
        let preprocessor = Preprocessor::new(640, 480, Some(Roi::new(50, 50, 200, 100)));
        let frame = RgbImage::new(640, 480);

        let processed = preprocessor.preprocess(&frame).unwrap();

        assert_eq!(processed.dimensions(), (200, 100));
        assert_eq!(preprocessor.origin(), (50, 50));
    }

    #[test]
    fn test_preprocess_rejects_empty_frame() {
        let preprocessor = Preprocessor::new(640, 480, None);
        let frame = RgbImage::new(0, 480);

        assert_eq!(
            preprocessor.preprocess(&frame),
            Err(FrameError::Empty {
                width: 0,
                height: 480
            })
        );
    }

    #[test]
    fn test_frame_from_raw() {
        let frame = frame_from_raw(4, 2, 3, vec![7; 24]).unwrap();
        assert_eq!(frame.dimensions(), (4, 2));

        assert_eq!(
            frame_from_raw(4, 2, 1, vec![7; 8]),
            Err(FrameError::ChannelCount(1))
        );
        assert_eq!(
            frame_from_raw(0, 2, 3, Vec::new()),
            Err(FrameError::Empty {
                width: 0,
                height: 2
            })
        );
        assert_eq!(
            frame_from_raw(4, 2, 3, vec![7; 23]),
            Err(FrameError::BufferSize {
                width: 4,
                height: 2,
                expected: 24,
                actual: 23
            })
        );
        // Trailing bytes mean the source and the declared size disagree
        assert_eq!(
            frame_from_raw(4, 2, 3, vec![7; 30]),
            Err(FrameError::BufferSize {
                width: 4,
                height: 2,
                expected: 24,
                actual: 30
            })
        );
    }
}
