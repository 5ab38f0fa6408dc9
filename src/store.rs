use rusqlite::{params, Connection};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

use crate::encoder::{Fingerprint, FingerprintEncoder};
use crate::error::Result;
use crate::sampler::Frame;

/// One persisted fingerprint, keyed by video name in the store.
#[derive(Debug, Clone)]
pub struct FingerprintRecord {
    pub frame_index: u32,
    pub fingerprint: Fingerprint,
}

/// Durable store of per-video fingerprint sequences, backed by SQLite.
///
/// The store is the only writer of fingerprint data. Ingestion is
/// at-most-once per video name; records are immutable once written.
pub struct FingerprintStore {
    conn: Mutex<Connection>,
    /// Names with an ingestion currently in flight. Guards against a second
    /// ingest for the same name racing past the exists() check.
    in_flight: Mutex<HashSet<String>>,
}

impl FingerprintStore {
    /// Open the database at `db_path`, provisioning the schema if absent.
    pub fn open(db_path: &Path) -> Result<Self> {
        let existed = db_path.exists();
        let conn = Connection::open(db_path)?;
        Self::init_schema(&conn)?;

        if existed {
            info!("🗄️ Opened fingerprint store: {}", db_path.display());
        } else {
            info!("🗄️ Created fingerprint store: {}", db_path.display());
        }

        Ok(Self {
            conn: Mutex::new(conn),
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS video_frames (
                video_name  TEXT    NOT NULL,
                frame_index INTEGER NOT NULL,
                fingerprint TEXT    NOT NULL,
                PRIMARY KEY (video_name, frame_index)
            );",
        )?;
        Ok(())
    }

    /// True iff at least one record is persisted for `video_name`.
    pub fn exists(&self, video_name: &str) -> Result<bool> {
        let conn = self.lock_conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM video_frames WHERE video_name = ?1",
            params![video_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Encode and persist the fingerprint sequence for one video.
    ///
    /// At-most-once per name: if the video is already stored, or another
    /// ingestion for the same name is in flight, this is an idempotent skip
    /// returning 0. All records are written in a single transaction, so a
    /// crash mid-ingest leaves no records and `exists` stays false.
    ///
    /// Returns the number of records written.
    pub fn ingest<I>(
        &self,
        video_name: &str,
        frames: I,
        encoder: &FingerprintEncoder,
    ) -> Result<usize>
    where
        I: IntoIterator<Item = Result<Vec<Frame>>>,
    {
        let Some(_claim) = self.claim(video_name) else {
            info!(
                "Ingestion already in flight for '{}', skipping",
                video_name
            );
            return Ok(0);
        };

        if self.exists(video_name)? {
            info!("'{}' is already in the store, skipping", video_name);
            return Ok(0);
        }

        // Hash outside the connection lock; readers and other ingestions
        // proceed while this video is being encoded.
        let mut records: Vec<(u32, String)> = Vec::new();
        for batch in frames {
            for frame in batch? {
                let fingerprint = encoder.encode(&frame.image);
                records.push((frame.index, fingerprint.to_text().to_string()));
            }
        }

        let mut conn = self.lock_conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO video_frames (video_name, frame_index, fingerprint)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (frame_index, fingerprint) in &records {
                stmt.execute(params![video_name, frame_index, fingerprint])?;
            }
        }
        tx.commit()?;

        info!(
            "💾 Stored {} fingerprints for '{}'",
            records.len(),
            video_name
        );
        Ok(records.len())
    }

    /// Load every stored sequence, ordered by frame index ascending.
    ///
    /// A record whose fingerprint text fails to parse is loaded as an
    /// invalid fingerprint (maximal distance) with a warning; it degrades
    /// that single frame pair instead of failing the load.
    pub fn load_all(&self) -> Result<BTreeMap<String, Vec<FingerprintRecord>>> {
        let conn = self.lock_conn();
        let mut stmt = conn.prepare(
            "SELECT video_name, frame_index, fingerprint FROM video_frames
             ORDER BY video_name, frame_index ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut sequences: BTreeMap<String, Vec<FingerprintRecord>> = BTreeMap::new();
        for row in rows {
            let (video_name, frame_index, text) = row?;
            let fingerprint = match Fingerprint::try_parse(&text) {
                Ok(fingerprint) => fingerprint,
                Err(e) => {
                    warn!(
                        "Unreadable fingerprint for '{}' frame {}: {} (treating as non-matching)",
                        video_name, frame_index, e
                    );
                    Fingerprint::invalid(text)
                }
            };
            sequences
                .entry(video_name)
                .or_default()
                .push(FingerprintRecord {
                    frame_index: frame_index as u32,
                    fingerprint,
                });
        }

        Ok(sequences)
    }

    fn lock_conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn claim(&self, video_name: &str) -> Option<IngestClaim<'_>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(video_name.to_string()) {
            return None;
        }
        Some(IngestClaim {
            store: self,
            video_name: video_name.to_string(),
        })
    }
}

/// Releases the per-name ingestion claim on drop.
struct IngestClaim<'a> {
    store: &'a FingerprintStore,
    video_name: String,
}

impl Drop for IngestClaim<'_> {
    fn drop(&mut self) {
        self.store
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.video_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use rusqlite::params;

    fn frame(index: u32, level: u8) -> Frame {
        Frame {
            index,
            image: GrayImage::from_pixel(16, 16, Luma([level])),
        }
    }

    fn batches(frames: Vec<Frame>) -> Vec<Result<Vec<Frame>>> {
        vec![Ok(frames)]
    }

    #[test]
    fn test_ingest_and_load_ordered() {
        let store = FingerprintStore::open_in_memory().unwrap();
        let encoder = FingerprintEncoder::new();

        let written = store
            .ingest(
                "clip.mp4",
                batches(vec![frame(0, 10), frame(3, 40), frame(6, 80)]),
                &encoder,
            )
            .unwrap();
        assert_eq!(written, 3);
        assert!(store.exists("clip.mp4").unwrap());
        assert!(!store.exists("other.mp4").unwrap());

        let sequences = store.load_all().unwrap();
        let records = &sequences["clip.mp4"];
        let indices: Vec<u32> = records.iter().map(|r| r.frame_index).collect();
        assert_eq!(indices, vec![0, 3, 6]);
        assert!(records.iter().all(|r| r.fingerprint.is_valid()));
    }

    #[test]
    fn test_ingest_is_idempotent() {
        let store = FingerprintStore::open_in_memory().unwrap();
        let encoder = FingerprintEncoder::new();

        let first = store
            .ingest("clip.mp4", batches(vec![frame(0, 1), frame(3, 2)]), &encoder)
            .unwrap();
        assert_eq!(first, 2);

        let second = store
            .ingest("clip.mp4", batches(vec![frame(0, 1), frame(3, 2)]), &encoder)
            .unwrap();
        assert_eq!(second, 0);

        let sequences = store.load_all().unwrap();
        assert_eq!(sequences["clip.mp4"].len(), 2);
    }

    #[test]
    fn test_failed_ingest_leaves_no_records() {
        let store = FingerprintStore::open_in_memory().unwrap();
        let encoder = FingerprintEncoder::new();

        let failing: Vec<Result<Vec<Frame>>> = vec![
            Ok(vec![frame(0, 1)]),
            Err(crate::error::Error::Decode {
                path: "clip.mp4".into(),
                reason: "truncated".to_string(),
            }),
        ];
        assert!(store.ingest("clip.mp4", failing, &encoder).is_err());

        // Nothing committed, so a later ingest starts clean.
        assert!(!store.exists("clip.mp4").unwrap());
        let written = store
            .ingest("clip.mp4", batches(vec![frame(0, 1)]), &encoder)
            .unwrap();
        assert_eq!(written, 1);
    }

    #[test]
    fn test_corrupt_fingerprint_loads_as_invalid() {
        let store = FingerprintStore::open_in_memory().unwrap();
        {
            let conn = store.lock_conn();
            conn.execute(
                "INSERT INTO video_frames (video_name, frame_index, fingerprint)
                 VALUES (?1, ?2, ?3)",
                params!["clip.mp4", 0, "garbage!!"],
            )
            .unwrap();
        }

        let sequences = store.load_all().unwrap();
        let records = &sequences["clip.mp4"];
        assert_eq!(records.len(), 1);
        assert!(!records[0].fingerprint.is_valid());
    }
}
