mod contours;
mod difference;
mod mog;
mod preprocess;
pub mod types;

pub use contours::{dilate, external_components, Component, DILATION_ITERATIONS, DILATION_KERNEL};
pub use difference::FrameDifference;
pub use mog::{MixtureBackground, MixtureParams, SHADOW};
pub use preprocess::{frame_from_raw, resize_to, validate_frame, Preprocessor};
pub use types::{ForegroundExtractor, Region, Segmentation, BACKGROUND, FOREGROUND};

use crate::config::{DetectionConfig, SegmentationStrategy};
use crate::error::{ConfigError, FrameError};
use image::{GrayImage, Luma, RgbImage};

/// Mask values strictly above this count as foreground; shadows (127) fall below it
const FOREGROUND_CUT: u8 = 200;

/// Create the foreground extractor selected by the configuration
pub fn create_extractor(config: &DetectionConfig) -> Box<dyn ForegroundExtractor> {
    match config.strategy {
        SegmentationStrategy::Adaptive => Box::new(MixtureBackground::new(
            MixtureParams::with_threshold(config.motion_threshold as f32),
        )),
        SegmentationStrategy::Differencing => {
            Box::new(FrameDifference::new(config.motion_threshold))
        }
    }
}

/// Turns raw colour frames into motion regions
///
/// Owns the background model (or previous frame) for one stream. Each
/// camera stream needs its own segmenter.
pub struct MotionSegmenter {
    config: DetectionConfig,
    preprocessor: Preprocessor,
    extractor: Box<dyn ForegroundExtractor>,
    frame_count: u64,
}

impl MotionSegmenter {
    /// Create a segmenter using the strategy named in the config
    pub fn new(config: DetectionConfig) -> Result<Self, ConfigError> {
        let extractor = create_extractor(&config);
        Self::with_extractor(config, extractor)
    }

    /// Create a segmenter around a caller-supplied extractor
    pub fn with_extractor(
        config: DetectionConfig,
        extractor: Box<dyn ForegroundExtractor>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        tracing::debug!(
            "Motion segmenter: {} at {}x{}, min area {}",
            extractor.name(),
            config.frame_width,
            config.frame_height,
            config.min_contour_area
        );

        let preprocessor = Preprocessor::new(config.frame_width, config.frame_height, config.roi);

        Ok(Self {
            config,
            preprocessor,
            extractor,
            frame_count: 0,
        })
    }

    /// Find the motion regions in one frame
    ///
    /// Regions are in processing-frame coordinates, offset by the region
    /// of interest when one is configured.
    pub fn segment(&mut self, frame: &RgbImage) -> Result<Segmentation, FrameError> {
        let _span = tracing::debug_span!("segment").entered();

        let processed = self.preprocessor.preprocess(frame)?;
        self.frame_count += 1;

        let raw_mask = self.extractor.extract(&processed);
        let mask = threshold(&raw_mask, FOREGROUND_CUT);
        let dilated = dilate(&mask, DILATION_KERNEL, DILATION_ITERATIONS);

        let (origin_x, origin_y) = self.preprocessor.origin();
        let min_area = self.config.min_contour_area as f64;
        let regions: Vec<Region> = external_components(&dilated)
            .into_iter()
            .filter(|component| component.area >= min_area)
            .map(|component| {
                let b = component.bounds;
                Region::new(b.x + origin_x, b.y + origin_y, b.width, b.height)
            })
            .collect();

        if !regions.is_empty() {
            tracing::debug!(
                "Frame {}: {} motion region(s)",
                self.frame_count,
                regions.len()
            );
        }

        Ok(Segmentation {
            motion_detected: !regions.is_empty(),
            regions,
        })
    }

    /// Discard the background model and any retained frame
    pub fn reset(&mut self) {
        self.extractor.reset_state();
        self.frame_count = 0;
    }

    /// Frames segmented since construction or the last reset
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn strategy_name(&self) -> &'static str {
        self.extractor.name()
    }
}

fn threshold(mask: &GrayImage, cut: u8) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get_pixel(x, y)[0] > cut {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Roi;
    use image::Rgb;

    fn config(strategy: SegmentationStrategy) -> DetectionConfig {
        DetectionConfig {
            strategy,
            ..Default::default()
        }
    }

    fn with_square(base: &RgbImage, x: u32, y: u32, size: u32) -> RgbImage {
        let mut frame = base.clone();
        for py in y..y + size {
            for px in x..x + size {
                frame.put_pixel(px, py, Rgb([255, 255, 255]));
            }
        }
        frame
    }

    #[test]
    fn test_rejects_invalid_config() {
        let bad = DetectionConfig {
            sensitivity: 101,
            ..Default::default()
        };
        assert!(matches!(
            MotionSegmenter::new(bad),
            Err(ConfigError::Sensitivity(101))
        ));
    }

    #[test]
    fn test_invalid_frame_is_an_error() {
        let mut segmenter = MotionSegmenter::new(DetectionConfig::default()).unwrap();
        let result = segmenter.segment(&RgbImage::new(640, 0));
        assert!(matches!(result, Err(FrameError::Empty { .. })));
        assert_eq!(segmenter.frame_count(), 0);
    }

    #[test]
    fn test_static_scene_settles_to_no_motion() {
        for strategy in [SegmentationStrategy::Adaptive, SegmentationStrategy::Differencing] {
            let mut segmenter = MotionSegmenter::new(config(strategy)).unwrap();
            let frame = RgbImage::from_pixel(640, 480, Rgb([40, 80, 30]));

            let outcomes: Vec<bool> = (0..15)
                .map(|_| segmenter.segment(&frame).unwrap().motion_detected)
                .collect();

            assert!(outcomes.iter().all(|detected| !detected), "{:?}", strategy);
        }
    }

    #[test]
    fn test_differencing_needs_a_previous_frame() {
        let mut segmenter = MotionSegmenter::new(config(SegmentationStrategy::Differencing)).unwrap();
        let black = RgbImage::new(640, 480);

        let first = segmenter.segment(&with_square(&black, 100, 100, 40)).unwrap();
        assert!(!first.motion_detected);

        let second = segmenter.segment(&black).unwrap();
        assert!(second.motion_detected);
        assert!(second.regions[0].overlaps(&Region::new(100, 100, 40, 40)));
    }

    #[test]
    fn test_small_changes_are_filtered_by_area() {
        for strategy in [SegmentationStrategy::Adaptive, SegmentationStrategy::Differencing] {
            let mut segmenter = MotionSegmenter::new(config(strategy)).unwrap();
            let black = RgbImage::new(640, 480);
            for _ in 0..5 {
                segmenter.segment(&black).unwrap();
            }

            let result = segmenter.segment(&with_square(&black, 300, 200, 4)).unwrap();

            assert!(!result.motion_detected, "{:?}", strategy);
            assert!(result.regions.is_empty());
        }
    }

    #[test]
    fn test_large_change_is_reported_where_it_happened() {
        for strategy in [SegmentationStrategy::Adaptive, SegmentationStrategy::Differencing] {
            let mut segmenter = MotionSegmenter::new(config(strategy)).unwrap();
            let black = RgbImage::new(640, 480);
            for _ in 0..5 {
                segmenter.segment(&black).unwrap();
            }

            let result = segmenter.segment(&with_square(&black, 300, 200, 40)).unwrap();

            assert!(result.motion_detected, "{:?}", strategy);
            assert_eq!(result.regions.len(), 1);
            assert!(result.regions[0].overlaps(&Region::new(300, 200, 40, 40)));
        }
    }

    #[test]
    fn test_roi_regions_are_offset_into_frame_coordinates() {
        let config = DetectionConfig {
            roi: Some(Roi::new(50, 50, 200, 200)),
            strategy: SegmentationStrategy::Differencing,
            ..Default::default()
        };
        let mut segmenter = MotionSegmenter::new(config).unwrap();
        let black = RgbImage::new(640, 480);
        segmenter.segment(&black).unwrap();

        let result = segmenter.segment(&with_square(&black, 120, 130, 40)).unwrap();

        assert_eq!(result.regions.len(), 1);
        let region = result.regions[0];
        assert!(region.overlaps(&Region::new(120, 130, 40, 40)));
        assert!(region.is_within(&Region::new(50, 50, 200, 200)));
    }

    #[test]
    fn test_reset_matches_fresh_instance() {
        let black = RgbImage::new(640, 480);
        let frames = vec![
            black.clone(),
            black.clone(),
            with_square(&black, 100, 100, 30),
            with_square(&black, 110, 100, 30),
            black.clone(),
        ];

        let mut used = MotionSegmenter::new(DetectionConfig::default()).unwrap();
        for frame in &frames {
            used.segment(frame).unwrap();
        }
        used.reset();
        assert_eq!(used.frame_count(), 0);

        let mut fresh = MotionSegmenter::new(DetectionConfig::default()).unwrap();
        for frame in &frames {
            assert_eq!(used.segment(frame).unwrap(), fresh.segment(frame).unwrap());
        }
    }
}
