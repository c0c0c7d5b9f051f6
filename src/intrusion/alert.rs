use crate::segmentation::Region;
use anyhow::Result;

/// Receives the regions of an intrusion once the alert gate lets it through
///
/// Called synchronously from the coordinator. Errors are handed straight
/// back to the caller of `process`; they are neither retried nor swallowed.
pub trait AlertSink {
    fn on_alert(&mut self, regions: &[Region]) -> Result<()>;
}

impl<F> AlertSink for F
where
    F: FnMut(&[Region]) -> Result<()>,
{
    fn on_alert(&mut self, regions: &[Region]) -> Result<()> {
        self(regions)
    }
}

/// Reports every alert through the log
#[derive(Debug, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn on_alert(&mut self, regions: &[Region]) -> Result<()> {
        tracing::warn!("ALERT: intrusion detected in {} region(s)", regions.len());
        for (i, region) in regions.iter().enumerate() {
            tracing::warn!(
                "  Region {}: x={}, y={}, width={}, height={}",
                i + 1,
                region.x,
                region.y,
                region.width,
                region.height
            );
        }
        Ok(())
    }
}
