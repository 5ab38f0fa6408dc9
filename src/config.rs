use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the clipseek pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Frame sampling settings
    pub sampling: SamplingConfig,

    /// Sequence matching tolerances
    pub matching: MatchingConfig,

    /// Fingerprint store settings
    pub store: StoreConfig,

    /// Reference library settings
    pub library: LibraryConfig,

    /// Output and reporting settings
    pub output: OutputConfig,

    /// Performance and resource settings
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Keep every `stride`-th frame (1 = every frame)
    pub stride: u32,

    /// Spatial scale factor applied to each kept frame, in (0, 1]
    pub scale: f64,

    /// Maximum frames held in memory per batch
    pub batch_size: usize,
}

/// Tolerance contract for the sliding-window matcher.
///
/// A query frame matches a reference frame iff their fingerprints differ in
/// fewer than `distance_threshold` bits; a window matches iff at least
/// `min_match_ratio` of the query frames individually match. The defaults
/// are empirical and tied to the encoder's 64-bit hash width.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Maximum Hamming distance (exclusive) for a per-frame match, in bits
    pub distance_threshold: u32,

    /// Minimum fraction of query frames that must match within a window
    pub min_match_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file holding the fingerprint records
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Directory of reference videos to index
    pub reference_dir: PathBuf,

    /// Directory where uploaded query videos are saved
    pub upload_dir: PathBuf,

    /// Video file extensions considered for ingestion
    pub supported_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for comparison reports
    pub report_dir: PathBuf,

    /// Save a JSON report after each comparison run
    pub save_reports: bool,

    /// Log level
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Maximum number of videos ingested concurrently
    pub max_workers: usize,
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        // Try to load from various locations
        let config_paths = [
            "clipseek.toml",
            "config/clipseek.toml",
            "~/.config/clipseek/config.toml",
            "/etc/clipseek/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        // Try environment variables
        if let Ok(config) = Self::from_env() {
            return Ok(config);
        }

        Err(anyhow!("No configuration file found"))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(stride) = std::env::var("CLIPSEEK_STRIDE") {
            config.sampling.stride = stride.parse().unwrap_or(3);
        }

        if let Ok(threshold) = std::env::var("CLIPSEEK_DISTANCE_THRESHOLD") {
            config.matching.distance_threshold = threshold.parse().unwrap_or(3);
        }

        if let Ok(ratio) = std::env::var("CLIPSEEK_MIN_MATCH_RATIO") {
            config.matching.min_match_ratio = ratio.parse().unwrap_or(0.5);
        }

        if let Ok(db_path) = std::env::var("CLIPSEEK_DB_PATH") {
            config.store.db_path = PathBuf::from(db_path);
        }

        if let Ok(reference_dir) = std::env::var("CLIPSEEK_REFERENCE_DIR") {
            config.library.reference_dir = PathBuf::from(reference_dir);
        }

        if let Ok(workers) = std::env::var("CLIPSEEK_WORKERS") {
            config.performance.max_workers = workers.parse().unwrap_or(4);
        }

        if let Ok(log_level) = std::env::var("CLIPSEEK_LOG_LEVEL") {
            config.output.log_level = log_level;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.sampling.stride == 0 {
            return Err(anyhow!("sampling.stride must be at least 1"));
        }

        if self.sampling.scale <= 0.0 || self.sampling.scale > 1.0 {
            return Err(anyhow!("sampling.scale must be in (0, 1]"));
        }

        if self.sampling.batch_size == 0 {
            return Err(anyhow!("sampling.batch_size must be greater than 0"));
        }

        if !(0.0..=1.0).contains(&self.matching.min_match_ratio) {
            return Err(anyhow!("matching.min_match_ratio must be in [0, 1]"));
        }

        if self.performance.max_workers == 0 {
            return Err(anyhow!("performance.max_workers must be greater than 0"));
        }

        if self.library.supported_extensions.is_empty() {
            return Err(anyhow!("library.supported_extensions must not be empty"));
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Clipseek Configuration:\n\
            - Stride: {} (scale {:.2}, batch {})\n\
            - Distance Threshold: {} bits\n\
            - Min Match Ratio: {:.2}\n\
            - Database: {}\n\
            - Reference Directory: {}\n\
            - Workers: {}",
            self.sampling.stride,
            self.sampling.scale,
            self.sampling.batch_size,
            self.matching.distance_threshold,
            self.matching.min_match_ratio,
            self.store.db_path.display(),
            self.library.reference_dir.display(),
            self.performance.max_workers
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sampling: SamplingConfig {
                stride: 3,
                scale: 0.5,
                batch_size: 1000,
            },
            matching: MatchingConfig::default(),
            store: StoreConfig {
                db_path: PathBuf::from("video_frames.db"),
            },
            library: LibraryConfig {
                reference_dir: PathBuf::from("./reference_videos"),
                upload_dir: PathBuf::from("./uploaded_videos"),
                supported_extensions: vec![
                    "mp4".to_string(),
                    "webm".to_string(),
                    "avi".to_string(),
                    "mov".to_string(),
                    "mkv".to_string(),
                    "flv".to_string(),
                    "wmv".to_string(),
                    "m4v".to_string(),
                    "mpg".to_string(),
                    "mpeg".to_string(),
                    "vob".to_string(),
                    "3gp".to_string(),
                    "ogv".to_string(),
                    "ts".to_string(),
                    "m2ts".to_string(),
                    "mts".to_string(),
                    "divx".to_string(),
                    "rmvb".to_string(),
                    "f4v".to_string(),
                    "mxf".to_string(),
                    "qt".to_string(),
                ],
            },
            output: OutputConfig {
                report_dir: PathBuf::from("./output"),
                save_reports: true,
                log_level: "info".to_string(),
            },
            performance: PerformanceConfig {
                max_workers: num_cpus::get().min(8),
            },
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 3,
            min_match_ratio: 0.5,
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_stride(mut self, stride: u32) -> Self {
        self.config.sampling.stride = stride;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.config.sampling.scale = scale;
        self
    }

    pub fn with_distance_threshold(mut self, threshold: u32) -> Self {
        self.config.matching.distance_threshold = threshold;
        self
    }

    pub fn with_min_match_ratio(mut self, ratio: f64) -> Self {
        self.config.matching.min_match_ratio = ratio;
        self
    }

    pub fn with_db_path(mut self, path: PathBuf) -> Self {
        self.config.store.db_path = path;
        self
    }

    pub fn with_reference_dir(mut self, dir: PathBuf) -> Self {
        self.config.library.reference_dir = dir;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.performance.max_workers = workers;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sampling.stride, 3);
        assert_eq!(config.matching.distance_threshold, 3);
        assert_eq!(config.matching.min_match_ratio, 0.5);
        assert!(config
            .library
            .supported_extensions
            .contains(&"mp4".to_string()));
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_stride(5)
            .with_distance_threshold(8)
            .with_min_match_ratio(0.7)
            .with_workers(2)
            .build();

        assert_eq!(config.sampling.stride, 5);
        assert_eq!(config.matching.distance_threshold, 8);
        assert_eq!(config.matching.min_match_ratio, 0.7);
        assert_eq!(config.performance.max_workers, 2);
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        let bad = ConfigBuilder::new().with_stride(0).build();
        assert!(bad.validate().is_err());

        let bad = ConfigBuilder::new().with_scale(1.5).build();
        assert!(bad.validate().is_err());

        let bad = ConfigBuilder::new().with_min_match_ratio(1.5).build();
        assert!(bad.validate().is_err());
    }
}
