use image::GrayImage;

/// Mask value for foreground pixels
pub const FOREGROUND: u8 = 255;

/// Mask value for background pixels
pub const BACKGROUND: u8 = 0;

/// Axis-aligned bounding box of one connected motion blob, in processing-frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether two boxes share at least one pixel
    pub fn overlaps(&self, other: &Region) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// Whether this box lies entirely inside `other`
    pub fn is_within(&self, other: &Region) -> bool {
        self.x >= other.x
            && self.y >= other.y
            && self.x + self.width <= other.x + other.width
            && self.y + self.height <= other.y + other.height
    }
}

/// Result of segmenting one frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmentation {
    pub motion_detected: bool,
    /// Regions in discovery order; callers must treat the order as meaningless
    pub regions: Vec<Region>,
}

/// Trait for foreground extraction strategies
/// Allows swapping between the adaptive background model and frame differencing
pub trait ForegroundExtractor {
    /// Classify one preprocessed (grayscale, blurred) frame
    ///
    /// # Returns
    /// * Binary mask of the same size, `FOREGROUND` where motion was found
    fn extract(&mut self, frame: &GrayImage) -> GrayImage;

    /// Drop all temporal state (background model, previous frame)
    ///
    /// Call this when:
    /// - Switching cameras
    /// - The scene changed on purpose (camera moved, lights switched)
    fn reset_state(&mut self);

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_overlap() {
        let a = Region::new(100, 100, 30, 30);
        assert!(a.overlaps(&Region::new(120, 120, 30, 30)));
        assert!(!a.overlaps(&Region::new(130, 100, 10, 10)));
        assert!(!a.overlaps(&Region::new(0, 0, 100, 100)));
    }

    #[test]
    fn test_region_within() {
        let roi = Region::new(50, 50, 200, 200);
        assert!(Region::new(60, 60, 10, 10).is_within(&roi));
        assert!(Region::new(50, 50, 200, 200).is_within(&roi));
        assert!(!Region::new(240, 60, 20, 10).is_within(&roi));
    }
}
