mod alert;
pub mod annotate;
mod gate;

pub use alert::{AlertSink, LogAlertSink};
pub use gate::AlertGate;

use crate::config::DetectionConfig;
use crate::error::IntrusionError;
use crate::segmentation::{resize_to, validate_frame, MotionSegmenter, Region};
use annotate::{CAPTION, CAPTION_COLOR, STATUS_BAR_HEIGHT, TIMESTAMP_COLOR};
use image::{Rgb, RgbImage};
use std::time::Instant;

const CAPTION_SCALE: u32 = 3;
const TIMESTAMP_SCALE: u32 = 2;
const TEXT_MARGIN: u32 = 10;

/// Lifecycle of a coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Constructed, no frame seen yet
    Idle,
    Monitoring,
    /// Terminal
    Stopped,
}

/// Outcome of processing one frame
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// Segmentation truth, independent of whether an alert went out
    pub detected: bool,
    /// Frame resized to the processing resolution, with boxes, caption and timestamp
    pub annotated: RgbImage,
    pub regions: Vec<Region>,
    /// Whether this frame fired an alert
    pub alerted: bool,
}

/// Drives the segmenter frame by frame, annotates output and gates alerts
pub struct IntrusionCoordinator {
    config: DetectionConfig,
    segmenter: MotionSegmenter,
    gate: AlertGate,
    sink: Option<Box<dyn AlertSink>>,
    state: CoordinatorState,
}

impl IntrusionCoordinator {
    /// Create a coordinator, rejecting invalid configuration before any frame is seen
    pub fn new(
        config: DetectionConfig,
        sink: Option<Box<dyn AlertSink>>,
    ) -> Result<Self, IntrusionError> {
        let segmenter = MotionSegmenter::new(config)?;
        Self::with_segmenter(segmenter, sink)
    }

    /// Create a coordinator around an already built segmenter, sharing its configuration
    pub fn with_segmenter(
        segmenter: MotionSegmenter,
        sink: Option<Box<dyn AlertSink>>,
    ) -> Result<Self, IntrusionError> {
        let config = segmenter.config().clone();
        let gate = AlertGate::new(config.cooldown()?);

        tracing::info!(
            "Intrusion coordinator ready: {} segmentation, cooldown {:.1}s",
            segmenter.strategy_name(),
            config.alert_cooldown
        );
        Ok(Self {
            gate,
            config,
            segmenter,
            sink,
            state: CoordinatorState::Idle,
        })
    }

    /// Process one frame at the current instant
    pub fn process(&mut self, frame: &RgbImage) -> Result<FrameReport, IntrusionError> {
        self.process_at(frame, Instant::now())
    }

    /// Process one frame, evaluating the alert gate at `now`
    ///
    /// Steps:
    /// 1. Segment the raw frame
    /// 2. Resize the raw frame to the processing resolution for annotation
    /// 3. On detections: draw boxes and caption, evaluate the alert gate
    /// 4. Stamp the wall-clock time
    pub fn process_at(
        &mut self,
        frame: &RgbImage,
        now: Instant,
    ) -> Result<FrameReport, IntrusionError> {
        let _span = tracing::debug_span!("process").entered();

        if self.state == CoordinatorState::Stopped {
            return Err(IntrusionError::Stopped);
        }
        validate_frame(frame)?;
        if self.state == CoordinatorState::Idle {
            tracing::info!("Monitoring started");
            self.state = CoordinatorState::Monitoring;
        }

        let segmentation = self.segmenter.segment(frame)?;
        let regions = segmentation.regions;

        let mut annotated = resize_to(frame, self.config.frame_width, self.config.frame_height);

        let mut alerted = false;
        if segmentation.motion_detected {
            let color = Rgb(self.config.box_color);
            for region in &regions {
                annotate::draw_region(&mut annotated, region, color, self.config.box_thickness);
            }
            annotate::draw_text(
                &mut annotated,
                CAPTION,
                TEXT_MARGIN,
                STATUS_BAR_HEIGHT + TEXT_MARGIN,
                CAPTION_SCALE,
                CAPTION_COLOR,
            );

            alerted = self.maybe_alert(&regions, now)?;
        }

        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let timestamp_y = annotated
            .height()
            .saturating_sub(TEXT_MARGIN + annotate::text_height(TIMESTAMP_SCALE));
        annotate::draw_text(
            &mut annotated,
            &timestamp,
            TEXT_MARGIN,
            timestamp_y,
            TIMESTAMP_SCALE,
            TIMESTAMP_COLOR,
        );

        Ok(FrameReport {
            detected: segmentation.motion_detected,
            annotated,
            regions,
            alerted,
        })
    }

    /// Fire an alert for `regions` unless the cooldown is still running
    ///
    /// The gate records the alert before the sink runs, so a failing sink
    /// cannot cause an alert storm. Sink errors are returned as-is.
    pub fn maybe_alert(&mut self, regions: &[Region], now: Instant) -> Result<bool, IntrusionError> {
        if !self.gate.try_fire(now) {
            tracing::debug!("Alert suppressed by cooldown ({} region(s))", regions.len());
            return Ok(false);
        }

        tracing::warn!(
            "Intrusion detected! {} region(s) identified (alert #{})",
            regions.len(),
            self.gate.fired()
        );

        if let Some(sink) = self.sink.as_mut() {
            sink.on_alert(regions)?;
        }
        Ok(true)
    }

    /// Discard the background model; alert history is kept
    pub fn reset(&mut self) {
        tracing::info!("Resetting motion segmenter");
        self.segmenter.reset();
    }

    /// Stop monitoring. Further frames are rejected.
    pub fn stop(&mut self) {
        if self.state != CoordinatorState::Stopped {
            tracing::info!(
                "Intrusion detection stopped after {} alert(s)",
                self.gate.fired()
            );
            self.state = CoordinatorState::Stopped;
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Alerts fired since construction
    pub fn alerts_fired(&self) -> u64 {
        self.gate.fired()
    }

    pub fn last_alert(&self) -> Option<Instant> {
        self.gate.last_alert()
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }
}
