use crate::error::ConfigError;
use std::time::Duration;

/// Foreground extraction method used by the motion segmenter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentationStrategy {
    /// Per-pixel mixture-of-Gaussians background model
    #[default]
    Adaptive,
    /// Absolute difference against the previous processed frame
    Differencing,
}

/// Sub-rectangle of the processing frame that detection is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Detection parameters, fixed for the lifetime of a segmenter/coordinator
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// Detection sensitivity (0-100)
    pub sensitivity: i32,

    /// Minimum enclosed contour area (pixels²) for a region to count as motion
    pub min_contour_area: u32,

    /// Variance threshold (adaptive) or intensity threshold (differencing)
    pub motion_threshold: u32,

    /// Processing (and annotation) resolution
    pub frame_width: u32,
    pub frame_height: u32,

    /// Minimum seconds between two alerts
    pub alert_cooldown: f64,

    /// Restrict detection to this rectangle; `None` means the full frame
    pub roi: Option<Roi>,

    pub strategy: SegmentationStrategy,

    /// Whether the driving loop should forward annotated frames to a display sink
    pub show_display: bool,

    /// RGB colour of region boxes
    pub box_color: [u8; 3],

    pub box_thickness: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sensitivity: 50,
            min_contour_area: 500,
            motion_threshold: 25,
            frame_width: 640,
            frame_height: 480,
            alert_cooldown: 5.0,
            roi: None,
            strategy: SegmentationStrategy::Adaptive,
            show_display: true,
            box_color: [0, 255, 0],
            box_thickness: 2,
        }
    }
}

impl DetectionConfig {
    /// Check every field against its documented bound.
    ///
    /// Values are never clamped; the first violation is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=100).contains(&self.sensitivity) {
            return Err(ConfigError::Sensitivity(self.sensitivity));
        }
        if self.min_contour_area == 0 {
            return Err(ConfigError::MinContourArea);
        }
        if self.motion_threshold == 0 {
            return Err(ConfigError::MotionThreshold);
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(ConfigError::FrameDimensions {
                width: self.frame_width,
                height: self.frame_height,
            });
        }
        self.cooldown()?;
        if self.box_thickness == 0 {
            return Err(ConfigError::BoxThickness);
        }
        if let Some(roi) = self.roi {
            let fits_x = roi.x.checked_add(roi.width).is_some_and(|r| r <= self.frame_width);
            let fits_y = roi.y.checked_add(roi.height).is_some_and(|b| b <= self.frame_height);
            if roi.width == 0 || roi.height == 0 || !fits_x || !fits_y {
                return Err(ConfigError::RegionOfInterest {
                    x: roi.x,
                    y: roi.y,
                    width: roi.width,
                    height: roi.height,
                    frame_width: self.frame_width,
                    frame_height: self.frame_height,
                });
            }
        }
        Ok(())
    }

    /// Alert cooldown as a `Duration`
    ///
    /// Negative, non-finite and out-of-range values are rejected.
    pub fn cooldown(&self) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f64(self.alert_cooldown)
            .map_err(|_| ConfigError::AlertCooldown(self.alert_cooldown))
    }
}
