use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{EtaError, Result};
use crate::store::dataset::{Dataset, Sample};
use crate::store::text_format::{
    decode_counts, decode_timestamps, encode_lines, format_count, format_timestamp,
};

/// Where the two sample files live.
#[derive(Clone, Debug)]
pub struct StorePaths {
    pub uploads: PathBuf,
    pub timestamps: PathBuf,
}

impl From<&Config> for StorePaths {
    fn from(config: &Config) -> Self {
        Self {
            uploads: config.uploads_path.clone(),
            timestamps: config.timestamps_path.clone(),
        }
    }
}

/// Sample dataset backed by two flat text files: remaining-file counts and
/// their timestamps, one value per line. Every append rewrites both files.
pub struct SampleStore {
    paths: StorePaths,
    total_files: u64,
    dataset: Dataset,
}

impl SampleStore {
    /// Open the store, loading whatever is already persisted.
    pub fn open(paths: StorePaths, total_files: u64) -> Result<Self> {
        let dataset = load(&paths)?;
        debug!(samples = dataset.len(), "loaded sample store");
        Ok(Self {
            paths,
            total_files,
            dataset,
        })
    }

    /// Start an empty session without reading the files. Nothing is written
    /// until the first `record` or an explicit `save`.
    pub fn fresh(paths: StorePaths, total_files: u64) -> Self {
        Self {
            paths,
            total_files,
            dataset: Dataset::new(),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn total_files(&self) -> u64 {
        self.total_files
    }

    /// Record that file `current_index` is being uploaded now.
    pub fn record(&mut self, current_index: u64) -> Result<&Dataset> {
        self.record_at(current_index, Local::now().naive_local())
    }

    /// Append `(timestamp, total - current_index)` and rewrite both files.
    ///
    /// On a write failure the sample stays in memory; the files may be left
    /// with one updated and the other not.
    pub fn record_at(&mut self, current_index: u64, timestamp: NaiveDateTime) -> Result<&Dataset> {
        if current_index > self.total_files {
            return Err(EtaError::IndexOutOfRange {
                index: current_index,
                total: self.total_files,
            });
        }
        let remaining = (self.total_files - current_index) as f64;

        if let Some(prev) = self.dataset.last() {
            if timestamp < prev.timestamp {
                warn!(%timestamp, previous = %prev.timestamp, "sample recorded out of chronological order");
            }
            if remaining > prev.remaining {
                warn!(remaining, previous = prev.remaining, "remaining file count went up");
            }
        }

        self.dataset.push(Sample {
            timestamp,
            remaining,
        });
        self.save()?;
        Ok(&self.dataset)
    }

    /// Rewrite both files from the in-memory dataset.
    pub fn save(&self) -> Result<()> {
        let counts = encode_lines(self.dataset.remaining(), |c| format_count(*c));
        write_replacing(&self.paths.uploads, &counts)?;
        let stamps = encode_lines(self.dataset.times(), format_timestamp);
        write_replacing(&self.paths.timestamps, &stamps)?;
        debug!(samples = self.dataset.len(), "saved sample store");
        Ok(())
    }

    /// Drop every sample and truncate both files.
    pub fn reset(&mut self) -> Result<()> {
        self.dataset.clear();
        self.save()
    }
}

/// Read both files. An absent file reads as an empty sequence; the two
/// sequences must then agree in length.
pub fn load(paths: &StorePaths) -> Result<Dataset> {
    let counts = match read_optional(&paths.uploads)? {
        Some(content) => decode_counts(&paths.uploads, &content)?,
        None => Vec::new(),
    };
    let times = match read_optional(&paths.timestamps)? {
        Some(content) => decode_timestamps(&paths.timestamps, &content)?,
        None => Vec::new(),
    };

    let (n_times, n_counts) = (times.len(), counts.len());
    let dataset = Dataset::from_parts(times, counts).ok_or(EtaError::LengthMismatch {
        timestamps: n_times,
        counts: n_counts,
    })?;

    let violations = dataset.ordering_violations();
    if !violations.is_empty() {
        warn!(?violations, "persisted samples are not monotonic");
    }
    Ok(dataset)
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(EtaError::persistence(path, e)),
    }
}

/// Write to a sibling `.tmp` file, then rename it over `path`.
fn write_replacing(path: &Path, content: &str) -> Result<()> {
    let write = || -> io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    };
    write().map_err(|e| EtaError::persistence(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use tempfile::TempDir;

    fn make_test_store(total: u64) -> (TempDir, SampleStore) {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(&dir);
        let store = SampleStore::open(paths, total).unwrap();
        (dir, store)
    }

    fn test_paths(dir: &TempDir) -> StorePaths {
        StorePaths {
            uploads: dir.path().join("data").join("uploads.txt"),
            timestamps: dir.path().join("data").join("timestamps.txt"),
        }
    }

    fn base_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2016, 5, 4)
            .unwrap()
            .and_hms_micro_opt(13, 0, 0, 123_456)
            .unwrap()
    }

    #[test]
    fn test_open_without_files_is_empty() {
        let (_dir, store) = make_test_store(100);
        assert!(store.dataset().is_empty());
    }

    #[test]
    fn test_record_appends_and_persists() {
        let (dir, mut store) = make_test_store(100);
        let indices = [10, 20, 28, 37, 47];
        for (k, &idx) in indices.iter().enumerate() {
            let ts = base_time() + Duration::minutes(k as i64 * 5);
            store.record_at(idx, ts).unwrap();
        }

        let data = store.dataset();
        assert_eq!(data.len(), indices.len());
        for (i, &idx) in indices.iter().enumerate() {
            assert_eq!(data.remaining()[i], (100 - idx) as f64);
        }

        let uploads = fs::read_to_string(dir.path().join("data/uploads.txt")).unwrap();
        assert_eq!(uploads, "90\n80\n72\n63\n53\n");
        let stamps = fs::read_to_string(dir.path().join("data/timestamps.txt")).unwrap();
        assert_eq!(stamps.lines().next(), Some("2016-05-04 13:00:00.123456"));
    }

    #[test]
    fn test_round_trip_through_files() {
        let (dir, mut store) = make_test_store(500);
        for k in 0..12u64 {
            let ts = base_time() + Duration::microseconds(k as i64 * 61_234_567);
            store.record_at(k * 7, ts).unwrap();
        }

        let reopened = SampleStore::open(test_paths(&dir), 500).unwrap();
        assert_eq!(reopened.dataset(), store.dataset());
    }

    #[test]
    fn test_index_past_total_is_rejected() {
        let (_dir, mut store) = make_test_store(10);
        let err = store.record_at(11, base_time()).unwrap_err();
        assert!(matches!(err, EtaError::IndexOutOfRange { index: 11, total: 10 }));
        assert!(store.dataset().is_empty());

        store.record_at(10, base_time()).unwrap();
        assert_eq!(store.dataset().remaining(), &[0.0]);
    }

    #[test]
    fn test_length_mismatch_fails_loudly() {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(&dir);
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(&paths.uploads, "90\n80\n").unwrap();
        fs::write(&paths.timestamps, "2016-05-04 13:00:00.000000\n").unwrap();

        match SampleStore::open(paths, 100) {
            Err(EtaError::LengthMismatch { timestamps, counts }) => {
                assert_eq!(timestamps, 1);
                assert_eq!(counts, 2);
            }
            other => panic!("expected length mismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_one_missing_file_is_a_mismatch() {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(&dir);
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(&paths.uploads, "90\n").unwrap();

        assert!(matches!(
            load(&paths),
            Err(EtaError::LengthMismatch {
                timestamps: 0,
                counts: 1
            })
        ));
    }

    #[test]
    fn test_bad_timestamp_is_parse_failure() {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(&dir);
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(&paths.uploads, "90\n80\n").unwrap();
        fs::write(
            &paths.timestamps,
            "2016-05-04 13:00:00.000000\n2016-05-04 13:05\n",
        )
        .unwrap();

        assert!(matches!(
            load(&paths),
            Err(EtaError::ParseFailure { line: 2, .. })
        ));
    }

    #[test]
    fn test_fresh_ignores_persisted_samples() {
        let (dir, mut store) = make_test_store(100);
        store.record_at(5, base_time()).unwrap();

        let mut fresh = SampleStore::fresh(test_paths(&dir), 100);
        assert!(fresh.dataset().is_empty());
        fresh
            .record_at(50, base_time() + Duration::minutes(1))
            .unwrap();

        let reopened = SampleStore::open(test_paths(&dir), 100).unwrap();
        assert_eq!(reopened.dataset().remaining(), &[50.0]);
    }

    #[test]
    fn test_reset_truncates_both_files() {
        let (dir, mut store) = make_test_store(100);
        store.record_at(5, base_time()).unwrap();
        store.reset().unwrap();

        assert!(store.dataset().is_empty());
        let uploads = fs::read_to_string(dir.path().join("data/uploads.txt")).unwrap();
        assert!(uploads.is_empty());
        let reopened = SampleStore::open(test_paths(&dir), 100).unwrap();
        assert!(reopened.dataset().is_empty());
    }

    #[test]
    fn test_unwritable_path_is_persistence_failure() {
        let dir = TempDir::new().unwrap();
        // A regular file where the data directory should be.
        let blocker = dir.path().join("data");
        fs::write(&blocker, "not a directory").unwrap();
        let paths = StorePaths {
            uploads: blocker.join("uploads.txt"),
            timestamps: blocker.join("timestamps.txt"),
        };
        let mut store = SampleStore::fresh(paths, 100);

        let err = store.record_at(1, base_time()).unwrap_err();
        assert!(matches!(err, EtaError::PersistenceFailure { .. }));
        assert_eq!(store.dataset().len(), 1);
    }
}
