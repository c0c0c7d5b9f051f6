use super::types::{ForegroundExtractor, BACKGROUND, FOREGROUND};
use image::{GrayImage, Luma};

/// Consecutive-frame differencing
///
/// A pixel is foreground when its intensity moved by more than `threshold`
/// since the previous processed frame. The first frame after start or
/// reset has nothing to compare against and yields an empty mask.
pub struct FrameDifference {
    threshold: u32,
    previous: Option<GrayImage>,
}

impl FrameDifference {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            previous: None,
        }
    }
}

impl ForegroundExtractor for FrameDifference {
    fn extract(&mut self, frame: &GrayImage) -> GrayImage {
        let _span = tracing::debug_span!("frame_difference").entered();

        let (width, height) = frame.dimensions();

        let mask = match &self.previous {
            Some(previous) if previous.dimensions() == frame.dimensions() => {
                GrayImage::from_fn(width, height, |x, y| {
                    let diff = frame.get_pixel(x, y)[0].abs_diff(previous.get_pixel(x, y)[0]);
                    if diff as u32 > self.threshold {
                        Luma([FOREGROUND])
                    } else {
                        Luma([BACKGROUND])
                    }
                })
            }
            _ => {
                tracing::debug!("No previous frame available, storing current frame");
                GrayImage::new(width, height)
            }
        };

        self.previous = Some(frame.clone());
        mask
    }

    fn reset_state(&mut self) {
        tracing::info!("Resetting frame difference state");
        self.previous = None;
    }

    fn name(&self) -> &'static str {
        "frame-difference"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_has_no_foreground() {
        let mut diff = FrameDifference::new(25);
        let frame = GrayImage::from_pixel(8, 8, Luma([200]));

        let mask = diff.extract(&frame);

        assert!(mask.pixels().all(|p| p[0] == BACKGROUND));
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut diff = FrameDifference::new(25);
        diff.extract(&GrayImage::from_pixel(2, 1, Luma([100])));

        let mut next = GrayImage::new(2, 1);
        next.put_pixel(0, 0, Luma([125]));
        next.put_pixel(1, 0, Luma([74]));
        let mask = diff.extract(&next);

        assert_eq!(mask.get_pixel(0, 0)[0], BACKGROUND);
        assert_eq!(mask.get_pixel(1, 0)[0], FOREGROUND);
    }

    #[test]
    fn test_compares_against_previous_frame_only() {
        let mut diff = FrameDifference::new(10);
        let dark = GrayImage::new(4, 4);
        let bright = GrayImage::from_pixel(4, 4, Luma([255]));

        diff.extract(&dark);
        assert!(diff.extract(&bright).pixels().all(|p| p[0] == FOREGROUND));
        assert!(diff.extract(&bright).pixels().all(|p| p[0] == BACKGROUND));
    }

    #[test]
    fn test_reset_drops_previous_frame() {
        let mut diff = FrameDifference::new(10);
        diff.extract(&GrayImage::new(4, 4));
        diff.reset_state();

        let mask = diff.extract(&GrayImage::from_pixel(4, 4, Luma([255])));
        assert!(mask.pixels().all(|p| p[0] == BACKGROUND));
    }
}
