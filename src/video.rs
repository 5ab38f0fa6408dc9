use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::{Error, Result};

/// Video information extracted from file
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VideoInfo {
    pub path: PathBuf,
    pub filename: String,
    pub duration: Duration,
    pub fps: f64,
    pub format: String,
}

/// Reference video library: discovery, name resolution, and metadata
/// probing via ffprobe.
#[derive(Debug, Clone)]
pub struct VideoLibrary {
    /// Supported video extensions (lowercase, no dot)
    supported_extensions: Vec<String>,
}

impl VideoLibrary {
    pub fn new(supported_extensions: &[String]) -> Self {
        Self {
            supported_extensions: supported_extensions
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
        }
    }

    /// Discover all video files in a directory recursively
    pub async fn discover(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        use std::future::Future;
        use std::pin::Pin;

        fn discover_recursive<'a>(
            supported_extensions: &'a [String],
            dir: &'a Path,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<PathBuf>>> + Send + 'a>> {
            Box::pin(async move {
                let mut videos = Vec::new();

                let mut entries = tokio::fs::read_dir(dir).await?;

                while let Some(entry) = entries.next_entry().await? {
                    let path = entry.path();

                    if path.is_dir() {
                        let mut sub_videos =
                            discover_recursive(supported_extensions, &path).await?;
                        videos.append(&mut sub_videos);
                    } else if let Some(extension) = path.extension() {
                        if let Some(ext_str) = extension.to_str() {
                            if supported_extensions.contains(&ext_str.to_lowercase()) {
                                videos.push(path);
                            }
                        }
                    }
                }

                Ok(videos)
            })
        }

        let mut videos = discover_recursive(&self.supported_extensions, dir).await?;
        videos.sort();
        Ok(videos)
    }

    /// Resolve a stored reference name back to a video file under `root`.
    /// Returns None when the file is no longer present on disk.
    pub fn resolve(&self, root: &Path, video_name: &str) -> Option<PathBuf> {
        let path = root.join(video_name);
        if path.is_file() {
            Some(path)
        } else {
            None
        }
    }

    /// Extract video information using the ffprobe command line tool
    pub async fn probe(&self, video_path: &Path) -> Result<VideoInfo> {
        let input = video_path.to_string_lossy();
        let output = tokio::process::Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                input.as_ref(),
            ])
            .output()
            .await?;

        if !output.status.success() {
            return Err(Error::Decode {
                path: video_path.to_path_buf(),
                reason: "ffprobe failed".to_string(),
            });
        }

        let json_str = String::from_utf8_lossy(&output.stdout);
        let ffprobe_data: serde_json::Value =
            serde_json::from_str(&json_str).map_err(|e| Error::Decode {
                path: video_path.to_path_buf(),
                reason: format!("unreadable ffprobe output: {}", e),
            })?;

        let format = &ffprobe_data["format"];
        let streams = ffprobe_data["streams"].as_array().cloned().unwrap_or_default();

        let video_stream = streams
            .iter()
            .find(|s| s["codec_type"] == "video")
            .ok_or_else(|| Error::Decode {
                path: video_path.to_path_buf(),
                reason: "no video stream found".to_string(),
            })?;

        let duration_seconds: f64 = format["duration"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);

        let video_info = VideoInfo {
            path: video_path.to_path_buf(),
            filename: video_path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
            duration: Duration::from_secs_f64(duration_seconds),
            fps: video_stream["r_frame_rate"]
                .as_str()
                .and_then(|s| {
                    let parts: Vec<&str> = s.split('/').collect();
                    if parts.len() == 2 {
                        let num: f64 = parts[0].parse().ok()?;
                        let den: f64 = parts[1].parse().ok()?;
                        if den == 0.0 {
                            None
                        } else {
                            Some(num / den)
                        }
                    } else {
                        s.parse().ok()
                    }
                })
                .unwrap_or(0.0),
            format: format["format_name"]
                .as_str()
                .unwrap_or("unknown")
                .to_string(),
        };

        info!(
            "📹 Probed video: {} ({:.1}fps, {:.1}s)",
            video_info.filename,
            video_info.fps,
            video_info.duration.as_secs_f64()
        );

        Ok(video_info)
    }
}
