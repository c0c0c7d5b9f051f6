//! Motion segmentation and alert gating for unattended perimeter monitoring.
//!
//! [`segmentation::MotionSegmenter`] turns colour frames into motion regions
//! using an adaptive background model or frame differencing.
//! [`intrusion::IntrusionCoordinator`] drives it per frame, annotates the
//! output and rate-limits alerts.

pub mod config;
pub mod error;
pub mod intrusion;
pub mod segmentation;

pub use config::{DetectionConfig, Roi, SegmentationStrategy};
pub use error::{ConfigError, FrameError, IntrusionError};
pub use intrusion::{AlertSink, FrameReport, IntrusionCoordinator, LogAlertSink};
pub use segmentation::{MotionSegmenter, Region, Segmentation};
