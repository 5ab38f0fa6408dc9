use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::encoder::{Fingerprint, FingerprintEncoder};
use crate::error::{Error, Result};
use crate::matcher::find_all_matches;
use crate::sampler::FrameSampler;
use crate::store::FingerprintStore;
use crate::timecode::{normalize_fps, to_time_range, TimeRange};
use crate::video::VideoLibrary;

/// Outcome of one reference-directory ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReport {
    pub total: usize,
    pub ingested: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// One matched window inside a reference video. Derived, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub video_name: String,
    pub start_frame_index: u32,
    pub end_frame_index: u32,
    pub time_range: TimeRange,
}

impl MatchResult {
    /// Human-readable result line, e.g. `clip.mp4 at 01:23 - 01:31`.
    pub fn describe(&self) -> String {
        format!("{} at {}", self.video_name, self.time_range)
    }
}

/// JSON report persisted after a comparison run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub query: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub matches: Vec<MatchResult>,
}

enum IngestOutcome {
    Ingested,
    Skipped,
    Failed,
}

/// Ties the sampler, encoder, store, matcher and translator together into
/// the two user-facing flows: reference ingestion and query comparison.
pub struct Pipeline {
    config: Config,
    library: VideoLibrary,
    sampler: FrameSampler,
    store: Arc<FingerprintStore>,
}

impl Pipeline {
    pub fn new(config: Config, store: Arc<FingerprintStore>) -> Self {
        let library = VideoLibrary::new(&config.library.supported_extensions);
        let sampler = FrameSampler::new(&config.sampling);
        Self {
            config,
            library,
            sampler,
            store,
        }
    }

    /// Fingerprint and store every not-yet-indexed video under `dir`.
    ///
    /// Videos are processed concurrently up to `performance.max_workers`;
    /// a failure on one video never aborts the others.
    pub async fn ingest_directory(&self, dir: &Path) -> Result<IngestReport> {
        info!("🔍 Discovering reference videos in {}", dir.display());
        let video_paths = self.library.discover(dir).await?;

        if video_paths.is_empty() {
            warn!("No videos found in {}", dir.display());
            return Ok(IngestReport::default());
        }

        info!("📹 Found {} candidate videos", video_paths.len());

        let semaphore = Arc::new(Semaphore::new(self.config.performance.max_workers));
        let (tx, mut rx) = mpsc::channel(self.config.performance.max_workers.max(1));
        let total = video_paths.len();

        for (index, video_path) in video_paths.into_iter().enumerate() {
            let sampler = self.sampler.clone();
            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();

            tokio::spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };

                let outcome = ingest_single(&sampler, &store, &video_path, index + 1, total).await;

                if tx.send(outcome).await.is_err() {
                    error!("Failed to report ingest outcome for a video");
                }
            });
        }
        drop(tx);

        let mut report = IngestReport {
            total,
            ..Default::default()
        };
        while let Some(outcome) = rx.recv().await {
            match outcome {
                IngestOutcome::Ingested => report.ingested += 1,
                IngestOutcome::Skipped => report.skipped += 1,
                IngestOutcome::Failed => report.failed += 1,
            }
        }

        info!(
            "🎉 Ingestion finished: {} ingested, {} skipped, {} failed",
            report.ingested, report.skipped, report.failed
        );
        Ok(report)
    }

    /// Compare a query video against every stored reference sequence.
    ///
    /// Decode or store failures on the query itself are fatal for the
    /// request; a bad reference video is logged and skipped so the search
    /// continues against the rest.
    pub async fn compare(&self, query_path: &Path) -> Result<Vec<MatchResult>> {
        let query = self.fingerprint_query(query_path).await?;
        info!(
            "🔎 Query fingerprint ready: {} frames from {}",
            query.len(),
            query_path.display()
        );

        let references = self.store.load_all()?;
        if references.is_empty() {
            warn!("No videos in the store yet, nothing to compare against");
            return Ok(Vec::new());
        }

        let mut results = Vec::new();

        for (video_name, records) in &references {
            let Some(reference_path) = self
                .library
                .resolve(&self.config.library.reference_dir, video_name)
            else {
                let missing = self.config.library.reference_dir.join(video_name);
                warn!("⚠️ {}, skipping", Error::MissingReferenceFile(missing));
                continue;
            };

            let fps = match self.library.probe(&reference_path).await {
                Ok(video_info) => normalize_fps(video_info.fps),
                Err(e) => {
                    warn!("⚠️ Could not probe '{}': {}, skipping", video_name, e);
                    continue;
                }
            };

            let reference: Vec<Fingerprint> = records
                .iter()
                .map(|record| record.fingerprint.clone())
                .collect();

            let offsets = find_all_matches(&reference, &query, &self.config.matching)?;

            for offset in offsets {
                let end_record = (offset + query.len()).min(records.len()) - 1;
                results.push(MatchResult {
                    video_name: video_name.clone(),
                    start_frame_index: records[offset].frame_index,
                    end_frame_index: records[end_record].frame_index,
                    time_range: to_time_range(offset, query.len(), fps),
                });
            }
        }

        if results.is_empty() {
            info!("No matches found for {}", query_path.display());
        } else {
            info!("✅ Found {} matching windows", results.len());
        }

        Ok(results)
    }

    /// Compare and render the human-readable result lines.
    pub async fn compare_described(&self, query_path: &Path) -> Result<Vec<String>> {
        let results = self.compare(query_path).await?;
        Ok(results.iter().map(MatchResult::describe).collect())
    }

    /// Persist a JSON report of a comparison run.
    pub async fn write_report(
        &self,
        query_path: &Path,
        matches: &[MatchResult],
    ) -> Result<PathBuf> {
        let report = ComparisonReport {
            query: query_path.to_path_buf(),
            generated_at: Utc::now(),
            matches: matches.to_vec(),
        };

        tokio::fs::create_dir_all(&self.config.output.report_dir).await?;
        let report_path = self.config.output.report_dir.join("comparison_results.json");
        let json_data = serde_json::to_string_pretty(&report)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        tokio::fs::write(&report_path, json_data).await?;

        info!("💾 Report saved to: {}", report_path.display());
        Ok(report_path)
    }

    /// Sample and encode the query video into an ephemeral fingerprint
    /// sequence.
    async fn fingerprint_query(&self, query_path: &Path) -> Result<Vec<Fingerprint>> {
        let batches = self.sampler.sample(query_path).await?;
        let encoder = FingerprintEncoder::new();

        let mut query = Vec::with_capacity(batches.frame_count());
        for batch in batches {
            for frame in batch? {
                query.push(encoder.encode(&frame.image));
            }
        }
        Ok(query)
    }
}

async fn ingest_single(
    sampler: &FrameSampler,
    store: &FingerprintStore,
    video_path: &Path,
    position: usize,
    total: usize,
) -> IngestOutcome {
    let video_name = video_path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    match store.exists(&video_name) {
        Ok(true) => {
            info!(
                "📋 [{}/{}] '{}' already stored, skipping",
                position, total, video_name
            );
            return IngestOutcome::Skipped;
        }
        Ok(false) => {}
        Err(e) => {
            error!("Store lookup failed for '{}': {}", video_name, e);
            return IngestOutcome::Failed;
        }
    }

    info!("📹 [{}/{}] Ingesting '{}'", position, total, video_name);

    let batches = match sampler.sample(video_path).await {
        Ok(batches) => batches,
        Err(e) => {
            error!("Failed to decode '{}': {}", video_name, e);
            return IngestOutcome::Failed;
        }
    };

    let encoder = FingerprintEncoder::new();
    match store.ingest(&video_name, batches, &encoder) {
        Ok(0) => IngestOutcome::Skipped,
        Ok(_) => IngestOutcome::Ingested,
        Err(e) => {
            error!("Failed to ingest '{}': {}", video_name, e);
            IngestOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use tempfile::TempDir;

    #[test]
    fn test_describe_format() {
        let result = MatchResult {
            video_name: "reference.mp4".to_string(),
            start_frame_index: 90,
            end_frame_index: 180,
            time_range: to_time_range(90, 30, 30.0),
        };
        assert_eq!(result.describe(), "reference.mp4 at 00:03 - 00:04");
    }

    #[tokio::test]
    async fn test_ingest_empty_directory() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FingerprintStore::open_in_memory().unwrap());
        let pipeline = Pipeline::new(ConfigBuilder::new().build(), store);

        let report = pipeline.ingest_directory(dir.path()).await.unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(report.ingested, 0);
        assert_eq!(report.failed, 0);
    }
}
