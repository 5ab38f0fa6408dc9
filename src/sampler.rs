use image::GrayImage;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::config::SamplingConfig;
use crate::error::{Error, Result};

/// One sampled video frame: source frame index plus the reduced grayscale
/// raster. Ephemeral; consumed by the encoder, never persisted.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u32,
    pub image: GrayImage,
}

/// Extracts every `stride`-th frame of a video, scaled down and converted
/// to grayscale, using the system `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    stride: u32,
    scale: f64,
    batch_size: usize,
}

impl FrameSampler {
    pub fn new(config: &SamplingConfig) -> Self {
        Self {
            stride: config.stride.max(1),
            scale: config.scale,
            batch_size: config.batch_size.max(1),
        }
    }

    /// Decode `video_path` and return the sampled frames as a lazy batch
    /// iterator. Frame files are extracted up front into a temp directory;
    /// pixel data is only loaded when a batch is requested, so memory stays
    /// bounded by `batch_size` regardless of video length.
    pub async fn sample(&self, video_path: &Path) -> Result<FrameBatches> {
        let extract_dir = TempDir::new()?;
        let output_pattern = extract_dir
            .path()
            .join("frame_%06d.jpg")
            .to_string_lossy()
            .to_string();

        let filter = format!(
            "select=not(mod(n\\,{})),scale=iw*{}:ih*{},format=gray",
            self.stride, self.scale, self.scale
        );

        debug!("Running ffmpeg frame extraction with filter: {}", filter);

        let input = video_path.to_string_lossy();
        let output = tokio::process::Command::new("ffmpeg")
            .args([
                "-i",
                input.as_ref(),
                "-vf",
                filter.as_str(),
                "-vsync",
                "vfr",
                "-q:v",
                "2",
                "-y",
                output_pattern.as_str(),
            ])
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .last()
                .unwrap_or("ffmpeg exited with non-zero status")
                .to_string();
            return Err(Error::Decode {
                path: video_path.to_path_buf(),
                reason,
            });
        }

        let mut frame_paths = Vec::new();
        let mut read_dir = tokio::fs::read_dir(extract_dir.path()).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("jpg") {
                frame_paths.push(path);
            }
        }
        frame_paths.sort();

        if frame_paths.is_empty() {
            return Err(Error::Decode {
                path: video_path.to_path_buf(),
                reason: "no frames could be extracted".to_string(),
            });
        }

        info!(
            "🎞️ Sampled {} frames from {} (stride {}, scale {:.2})",
            frame_paths.len(),
            video_path.display(),
            self.stride,
            self.scale
        );

        Ok(FrameBatches::new(
            Some(extract_dir),
            frame_paths,
            self.stride,
            self.batch_size,
        ))
    }
}

/// Lazy iterator over sampled frames in bounded batches.
///
/// Consumers observe one logical ordered frame sequence; batching only caps
/// how many decoded images are alive at once. Holds the extraction temp
/// directory for its own lifetime.
pub struct FrameBatches {
    paths: Vec<PathBuf>,
    cursor: usize,
    stride: u32,
    batch_size: usize,
    _extract_dir: Option<TempDir>,
}

impl FrameBatches {
    fn new(
        extract_dir: Option<TempDir>,
        paths: Vec<PathBuf>,
        stride: u32,
        batch_size: usize,
    ) -> Self {
        Self {
            paths,
            cursor: 0,
            stride,
            batch_size,
            _extract_dir: extract_dir,
        }
    }

    /// Total number of sampled frames.
    pub fn frame_count(&self) -> usize {
        self.paths.len()
    }
}

impl Iterator for FrameBatches {
    type Item = Result<Vec<Frame>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.paths.len() {
            return None;
        }

        let end = (self.cursor + self.batch_size).min(self.paths.len());
        let mut batch = Vec::with_capacity(end - self.cursor);

        for ordinal in self.cursor..end {
            let path = &self.paths[ordinal];
            let image = match image::open(path) {
                Ok(image) => image.to_luma8(),
                Err(e) => {
                    return Some(Err(Error::Decode {
                        path: path.clone(),
                        reason: e.to_string(),
                    }))
                }
            };
            batch.push(Frame {
                // Extracted file k corresponds to source frame k * stride.
                index: ordinal as u32 * self.stride,
                image,
            });
        }

        self.cursor = end;
        Some(Ok(batch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn write_frames(dir: &Path, count: usize) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for i in 0..count {
            let path = dir.join(format!("frame_{:06}.jpg", i + 1));
            let image = GrayImage::from_pixel(8, 8, Luma([(i * 20) as u8]));
            image.save(&path).unwrap();
            paths.push(path);
        }
        paths
    }

    #[test]
    fn test_indices_follow_stride() {
        let dir = TempDir::new().unwrap();
        let paths = write_frames(dir.path(), 5);

        let batches = FrameBatches::new(None, paths, 3, 100);
        let frames: Vec<Frame> = batches.map(|b| b.unwrap()).flatten().collect();

        let indices: Vec<u32> = frames.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 3, 6, 9, 12]);
    }

    #[test]
    fn test_batches_are_bounded_and_complete() {
        let dir = TempDir::new().unwrap();
        let paths = write_frames(dir.path(), 5);

        let batches: Vec<Vec<Frame>> = FrameBatches::new(None, paths, 1, 2)
            .map(|b| b.unwrap())
            .collect();

        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);

        let indices: Vec<u32> = batches.iter().flatten().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_unreadable_frame_is_a_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frame_000001.jpg");
        std::fs::write(&path, b"not an image").unwrap();

        let mut batches = FrameBatches::new(None, vec![path], 1, 10);
        assert!(matches!(
            batches.next(),
            Some(Err(Error::Decode { .. }))
        ));
    }

    #[test]
    fn test_frame_count() {
        let dir = TempDir::new().unwrap();
        let paths = write_frames(dir.path(), 4);
        let batches = FrameBatches::new(None, paths, 2, 2);
        assert_eq!(batches.frame_count(), 4);
    }
}
