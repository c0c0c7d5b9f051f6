use thiserror::Error;

/// Rejected configuration values. Raised before any frame is processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sensitivity must be between 0 and 100, got {0}")]
    Sensitivity(i32),

    #[error("minimum contour area must be positive")]
    MinContourArea,

    #[error("motion threshold must be positive")]
    MotionThreshold,

    #[error("frame dimensions must be positive, got {width}x{height}")]
    FrameDimensions { width: u32, height: u32 },

    #[error("alert cooldown must be a finite, non-negative number of seconds, got {0}")]
    AlertCooldown(f64),

    #[error("box thickness must be positive")]
    BoxThickness,

    #[error("region of interest {x},{y} {width}x{height} does not fit inside a {frame_width}x{frame_height} frame")]
    RegionOfInterest {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    },
}

/// Malformed input frames. Never to be read as "no motion".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame has zero size ({width}x{height})")]
    Empty { width: u32, height: u32 },

    #[error("expected 3 colour channels, got {0}")]
    ChannelCount(usize),

    #[error("buffer of {actual} bytes does not match {width}x{height}x3 = {expected}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Errors surfaced by the intrusion coordinator.
#[derive(Debug, Error)]
pub enum IntrusionError {
    #[error("invalid detection config: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid frame: {0}")]
    Frame(#[from] FrameError),

    #[error("coordinator has been stopped")]
    Stopped,

    /// Failure returned by the alert sink. Passed through untouched.
    #[error(transparent)]
    Alert(#[from] anyhow::Error),
}
