use super::OutputSink;
use anyhow::{Context, Result};
use image::RgbImage;
use perimeter_watch::segmentation::resize_to;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use v4l::video::Output;
use v4l::{Device, Format, FourCC};

/// Publishes annotated frames on a v4l2loopback device as YUYV video
pub struct V4L2Output {
    file: File,
    width: u32,
    height: u32,
}

impl V4L2Output {
    pub fn new<P: AsRef<Path>>(device_path: P, width: u32, height: u32) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening display device {} ({}x{})",
            path.display(),
            width,
            height
        );

        let device = Device::with_path(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;
        let requested = Format::new(width, height, FourCC::new(b"YUYV"));
        let negotiated = Output::set_format(&device, &requested)
            .context("Failed to set YUYV output format")?;
        if (negotiated.width, negotiated.height) != (width, height) {
            tracing::warn!(
                "Display device accepted {}x{} instead of {}x{}",
                negotiated.width,
                negotiated.height,
                width,
                height
            );
        }

        // Frames are pushed with plain writes on a separate handle
        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open {} for writing", path.display()))?;

        Ok(Self {
            file,
            width: negotiated.width,
            height: negotiated.height,
        })
    }
}

/// Pack RGB pixels into YUYV 4:2:2, averaging chroma over each horizontal pair
fn pack_yuyv(frame: &RgbImage) -> Vec<u8> {
    let (width, height) = frame.dimensions();
    let mut packed = Vec::with_capacity((width.div_ceil(2) * 2 * height * 2) as usize);

    for row in frame.rows() {
        let pixels: Vec<[u8; 3]> = row.map(|p| p.0).collect();
        for pair in pixels.chunks(2) {
            let left = pair[0];
            let right = pair.get(1).copied().unwrap_or(left);
            let (y0, u0, v0) = bt601(left);
            let (y1, u1, v1) = bt601(right);
            packed.extend_from_slice(&[
                y0,
                ((u0 as u16 + u1 as u16) / 2) as u8,
                y1,
                ((v0 as u16 + v1 as u16) / 2) as u8,
            ]);
        }
    }

    packed
}

/// Studio-swing BT.601 conversion in fixed point
fn bt601([r, g, b]: [u8; 3]) -> (u8, u8, u8) {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let y = ((66 * r + 129 * g + 25 * b + 128) >> 8) + 16;
    let u = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
    let v = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;
    (
        y.clamp(0, 255) as u8,
        u.clamp(0, 255) as u8,
        v.clamp(0, 255) as u8,
    )
}

impl OutputSink for V4L2Output {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let frame = resize_to(frame, self.width, self.height);

        self.file
            .write_all(&pack_yuyv(&frame))
            .context("Failed to write frame to display device")?;

        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_bt601_reference_colours() {
        assert_eq!(bt601([0, 0, 0]), (16, 128, 128));
        assert_eq!(bt601([255, 255, 255]), (235, 128, 128));
    }

    #[test]
    fn test_pack_yuyv_layout() {
        let mut frame = RgbImage::new(3, 1);
        frame.put_pixel(0, 0, Rgb([255, 255, 255]));

        let packed = pack_yuyv(&frame);

        // Odd widths repeat the last pixel to complete the pair
        assert_eq!(packed.len(), 8);
        assert_eq!(packed[0], 235);
        assert_eq!(packed[2], 16);
        assert_eq!(packed[4], 16);
        assert_eq!(packed[6], 16);
    }
}
