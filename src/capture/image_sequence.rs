use super::CaptureSource;
use anyhow::{Context, Result};
use image::RgbImage;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

const EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Replays a directory of still images, in file-name order, as a video stream
pub struct ImageSequence {
    dir: PathBuf,
    pending: VecDeque<PathBuf>,
}

impl ImageSequence {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();

        let mut frames: Vec<PathBuf> = std::fs::read_dir(&dir)
            .with_context(|| format!("Could not open frame directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            })
            .collect();
        frames.sort();

        if frames.is_empty() {
            anyhow::bail!("No image frames found in {}", dir.display());
        }

        tracing::info!("Replaying {} frames from {}", frames.len(), dir.display());

        Ok(Self {
            dir,
            pending: frames.into(),
        })
    }
}

impl CaptureSource for ImageSequence {
    fn capture_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };

        let frame = image::open(&path)
            .with_context(|| format!("Failed to decode frame {}", path.display()))?
            .to_rgb8();

        Ok(Some(frame))
    }

    fn describe(&self) -> String {
        format!("frames in {}", self.dir.display())
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.pending.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("perimeter-watch-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_replays_frames_in_name_order_then_ends() {
        let dir = scratch_dir("order");
        RgbImage::from_pixel(8, 4, Rgb([200, 0, 0])).save(dir.join("frame_002.png")).unwrap();
        RgbImage::from_pixel(8, 4, Rgb([0, 200, 0])).save(dir.join("frame_001.png")).unwrap();
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();

        let mut source = ImageSequence::open(&dir).unwrap();
        assert_eq!(source.remaining(), Some(2));

        let first = source.capture_frame().unwrap().unwrap();
        assert_eq!(*first.get_pixel(0, 0), Rgb([0, 200, 0]));
        let second = source.capture_frame().unwrap().unwrap();
        assert_eq!(*second.get_pixel(0, 0), Rgb([200, 0, 0]));
        assert_eq!(source.remaining(), Some(0));
        assert!(source.capture_frame().unwrap().is_none());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = scratch_dir("empty");
        assert!(ImageSequence::open(&dir).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_corrupt_frame_is_an_error_not_end_of_stream() {
        let dir = scratch_dir("corrupt");
        std::fs::write(dir.join("frame.png"), b"garbage").unwrap();

        let mut source = ImageSequence::open(&dir).unwrap();
        assert!(source.capture_frame().is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
