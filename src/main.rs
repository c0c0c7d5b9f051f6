mod capture;
mod output;

use anyhow::{Context, Result};
use capture::{CaptureSource, ImageSequence, WebcamCapture};
use clap::{Parser, ValueEnum};
use output::{OutputSink, V4L2Output};
use perimeter_watch::intrusion::annotate;
use perimeter_watch::{
    DetectionConfig, IntrusionCoordinator, LogAlertSink, Roi, SegmentationStrategy,
};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about = "Perimeter intrusion detection", long_about = None)]
struct Args {
    /// Video source: camera index (0, 1, ...) or a directory of frame images
    #[arg(short, long, default_value = "0")]
    source: String,

    /// Detection sensitivity (0-100)
    #[arg(long, default_value_t = 50, allow_negative_numbers = true)]
    sensitivity: i32,

    /// Minimum contour area for detection (pixels²)
    #[arg(long, default_value_t = 500)]
    min_area: u32,

    /// Background variance threshold, or intensity threshold when differencing
    #[arg(long, default_value_t = 25)]
    motion_threshold: u32,

    /// Processing frame width
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Processing frame height
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Alert cooldown in seconds
    #[arg(long, default_value_t = 5.0, allow_negative_numbers = true)]
    cooldown: f64,

    /// Region of interest as x,y,width,height in processing coordinates
    #[arg(long, value_parser = parse_roi)]
    roi: Option<Roi>,

    /// Foreground extraction method
    #[arg(long, value_enum, default_value_t = Strategy::Adaptive)]
    strategy: Strategy,

    /// v4l2loopback device receiving annotated frames
    #[arg(short, long)]
    output_device: Option<String>,

    /// Disable the annotated display output
    #[arg(long)]
    no_display: bool,

    /// Target frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Strategy {
    /// Adaptive mixture-of-Gaussians background model
    Adaptive,
    /// Difference against the previous frame
    Differencing,
}

impl From<Strategy> for SegmentationStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Adaptive => SegmentationStrategy::Adaptive,
            Strategy::Differencing => SegmentationStrategy::Differencing,
        }
    }
}

fn parse_roi(value: &str) -> Result<Roi, String> {
    let parts: Vec<u32> = value
        .split(',')
        .map(|part| part.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|err| format!("invalid region of interest {:?}: {}", value, err))?;

    match parts.as_slice() {
        [x, y, width, height] => Ok(Roi::new(*x, *y, *width, *height)),
        _ => Err(format!(
            "region of interest needs 4 values x,y,width,height, got {}",
            parts.len()
        )),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = DetectionConfig {
        sensitivity: args.sensitivity,
        min_contour_area: args.min_area,
        motion_threshold: args.motion_threshold,
        frame_width: args.width,
        frame_height: args.height,
        alert_cooldown: args.cooldown,
        roi: args.roi,
        strategy: args.strategy.into(),
        show_display: !args.no_display && args.output_device.is_some(),
        ..Default::default()
    };

    tracing::info!("Perimeter watch starting");
    tracing::info!("Processing: {}x{}", config.frame_width, config.frame_height);
    tracing::info!(
        "Min area: {}, cooldown: {}s",
        config.min_contour_area,
        config.alert_cooldown
    );

    // Validates the configuration before any source is opened
    let mut coordinator = IntrusionCoordinator::new(config.clone(), Some(Box::new(LogAlertSink)))
        .context("Invalid detection configuration")?;

    let mut source: Box<dyn CaptureSource> = match args.source.parse::<u32>() {
        Ok(index) => Box::new(
            WebcamCapture::new(index, config.frame_width, config.frame_height, args.fps)
                .context("Failed to initialize camera capture")?,
        ),
        Err(_) => Box::new(
            ImageSequence::open(&args.source).context("Failed to open frame directory")?,
        ),
    };

    let mut display: Option<Box<dyn OutputSink>> = match (&args.output_device, config.show_display) {
        (Some(path), true) => {
            let output = V4L2Output::new(path, config.frame_width, config.frame_height)
                .context("Failed to initialize display output")?;
            let (width, height) = output.resolution();
            if (width, height) != (config.frame_width, config.frame_height) {
                anyhow::bail!(
                    "Display negotiated {}x{}, expected {}x{}",
                    width,
                    height,
                    config.frame_width,
                    config.frame_height
                );
            }
            tracing::info!("Display: {} at {}x{}", path, width, height);
            Some(Box::new(output))
        }
        _ => {
            tracing::info!("Running without display");
            None
        }
    };

    let result = run_pipeline(source.as_mut(), &mut display, &mut coordinator, args.fps);
    coordinator.stop();
    result
}

/// Instantaneous frame rate from one loop iteration; zero before the first one completes
fn fps_from_interval(elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        1.0 / secs
    } else {
        0.0
    }
}

fn run_pipeline(
    source: &mut dyn CaptureSource,
    display: &mut Option<Box<dyn OutputSink>>,
    coordinator: &mut IntrusionCoordinator,
    target_fps: u32,
) -> Result<()> {
    let frame_duration = Duration::from_secs_f32(1.0 / target_fps.max(1) as f32);
    let mut frame_count = 0u64;
    let mut detections = 0u64;
    let mut total_capture_time = Duration::ZERO;
    let mut total_process_time = Duration::ZERO;
    let mut total_output_time = Duration::ZERO;
    let mut current_fps = 0.0;

    tracing::info!("Monitoring {}", source.describe());
    tracing::info!("Press Ctrl+C to stop");

    loop {
        let loop_start = Instant::now();

        // Capture frame
        let capture_start = Instant::now();
        let Some(frame) = source
            .capture_frame()
            .context("Failed to read frame from source")?
        else {
            tracing::info!("End of stream after {} frames", frame_count);
            break;
        };
        total_capture_time += capture_start.elapsed();

        // Detection
        let process_start = Instant::now();
        let report = coordinator
            .process(&frame)
            .context("Failed to process frame")?;
        total_process_time += process_start.elapsed();
        if report.detected {
            detections += 1;
        }

        // Display
        let output_start = Instant::now();
        if let Some(display) = display.as_mut() {
            let mut annotated = report.annotated;
            let status = if report.detected { "Intrusion" } else { "Monitoring" };
            annotate::draw_status_bar(&mut annotated, status, current_fps, report.regions.len());
            display
                .write_frame(&annotated)
                .context("Failed to write frame")?;
        }
        total_output_time += output_start.elapsed();

        frame_count += 1;

        // Log stats every 30 frames
        if frame_count % 30 == 0 {
            let avg_capture_ms = total_capture_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let avg_process_ms = total_process_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let avg_output_ms = total_output_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let total_ms = avg_capture_ms + avg_process_ms + avg_output_ms;

            tracing::info!(
                "Frame {}: capture={:.1}ms, process={:.1}ms, output={:.1}ms, total={:.1}ms, motion frames={}, alerts={}",
                frame_count,
                avg_capture_ms,
                avg_process_ms,
                avg_output_ms,
                total_ms,
                detections,
                coordinator.alerts_fired()
            );
            if let Some(remaining) = source.remaining() {
                tracing::info!("{} frames left in source", remaining);
            }
        }

        // Frame rate limiting
        let elapsed = loop_start.elapsed();
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
        current_fps = fps_from_interval(loop_start.elapsed());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roi() {
        assert_eq!(parse_roi("50,50,200,200"), Ok(Roi::new(50, 50, 200, 200)));
        assert_eq!(parse_roi(" 1, 2 ,3,4"), Ok(Roi::new(1, 2, 3, 4)));
        assert!(parse_roi("1,2,3").is_err());
        assert!(parse_roi("a,b,c,d").is_err());
        assert!(parse_roi("-1,0,10,10").is_err());
    }

    #[test]
    fn test_fps_from_interval() {
        assert_eq!(fps_from_interval(Duration::from_millis(250)), 4.0);
        assert_eq!(fps_from_interval(Duration::ZERO), 0.0);
    }

    #[test]
    fn test_args_defaults_match_detection_defaults() {
        let args = Args::parse_from(["perimeter-watch"]);
        let defaults = DetectionConfig::default();

        assert_eq!(args.sensitivity, defaults.sensitivity);
        assert_eq!(args.min_area, defaults.min_contour_area);
        assert_eq!(args.motion_threshold, defaults.motion_threshold);
        assert_eq!(args.width, defaults.frame_width);
        assert_eq!(args.height, defaults.frame_height);
        assert_eq!(args.cooldown, defaults.alert_cooldown);
        assert!(args.roi.is_none());
    }

    #[test]
    fn test_args_accept_strategy_and_roi() {
        let args = Args::parse_from([
            "perimeter-watch",
            "--strategy",
            "differencing",
            "--roi",
            "50,50,200,200",
            "--sensitivity",
            "-1",
        ]);

        assert!(matches!(args.strategy, Strategy::Differencing));
        assert_eq!(args.roi, Some(Roi::new(50, 50, 200, 200)));
        // Range checks belong to DetectionConfig::validate, not the parser
        assert_eq!(args.sensitivity, -1);
    }
}
