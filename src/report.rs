//! Run artifacts: the cleaned mask, the annotated image and `details.json`.
//!
//! `details.json` accumulates one [`RunRecord`] per source image. Updates are
//! read-merge-write under a lock file, and the merged document replaces the
//! old one by rename, so a crash mid-write never leaves a truncated store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use time::{Date, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::config::CountConfig;
use crate::error::{PlantError, Result};
use crate::models::CountOutcome;

pub const MASK_FILE: &str = "masked_image.png";
pub const RESULT_FILE: &str = "result.png";
pub const DETAILS_FILE: &str = "details.json";

/// What was done to one source image and what it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub date: String,
    pub operations: Vec<String>,
    pub plants_number: usize,
    /// Fields written by other tools are carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RunRecord {
    pub fn new(config: &CountConfig, plants_number: usize, date: Date) -> Result<Self> {
        let date = date
            .format(time::macros::format_description!("[year]-[month]-[day]"))
            .map_err(|e| PlantError::RecordStore {
                path: PathBuf::from(DETAILS_FILE),
                reason: format!("cannot format date: {e}"),
            })?;
        Ok(Self {
            date,
            operations: config.operations(),
            plants_number,
            extra: Map::new(),
        })
    }
}

/// Contents of `details.json`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordStore {
    /// Source image of the most recent run
    pub source: String,
    pub images: BTreeMap<String, RunRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RecordStore {
    /// Read the store at `path`. A missing file is an empty store; anything
    /// unparseable is an error, never an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text).map_err(|e| PlantError::RecordStore {
            path: path.to_path_buf(),
            reason: format!("corrupt record store, refusing to overwrite: {e}"),
        })
    }

    /// Insert or replace the record for `source` and mark it as the latest run.
    pub fn merge(&mut self, source: &str, record: RunRecord) -> Option<RunRecord> {
        self.source = source.to_string();
        self.images.insert(source.to_string(), record)
    }

    /// Write the store to `path` via a temp file in the same directory.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, self).map_err(|e| PlantError::RecordStore {
            path: path.to_path_buf(),
            reason: format!("cannot serialize: {e}"),
        })?;
        tmp.write_all(b"\n")?;
        tmp.persist(path).map_err(|e| PlantError::Io(e.error))?;
        Ok(())
    }
}

/// Exclusive hold on a record store for the duration of one update.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    pub fn acquire(store_path: &Path) -> Result<Self> {
        Self::acquire_with(store_path, |file| writeln!(file, "{}", std::process::id()))
    }

    fn lock_path(store_path: &Path) -> PathBuf {
        let mut lock_name = store_path.as_os_str().to_owned();
        lock_name.push(".lock");
        PathBuf::from(lock_name)
    }

    fn acquire_with(
        store_path: &Path,
        stamp: impl FnOnce(&mut File) -> std::io::Result<()>,
    ) -> Result<Self> {
        let path = Self::lock_path(store_path);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                // The guard owns the file from here, so a failed stamp removes it.
                let lock = Self { path };
                stamp(&mut file)?;
                Ok(lock)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(PlantError::RecordStore {
                path: store_path.to_path_buf(),
                reason: format!(
                    "locked by another run (remove {} if no run is active)",
                    path.display()
                ),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release store lock");
        }
    }
}

/// Where a report put its files.
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub mask: PathBuf,
    pub annotated: PathBuf,
    pub details: PathBuf,
}

/// Writes run artifacts into one destination directory.
#[derive(Debug, Clone)]
pub struct ResultReporter {
    dest_dir: PathBuf,
}

impl ResultReporter {
    pub fn new(dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            dest_dir: dest_dir.into(),
        }
    }

    pub fn details_path(&self) -> PathBuf {
        self.dest_dir.join(DETAILS_FILE)
    }

    /// Report a run dated today (UTC).
    pub fn report(
        &self,
        source_path: &Path,
        config: &CountConfig,
        outcome: &CountOutcome,
    ) -> Result<ReportPaths> {
        self.report_on(source_path, config, outcome, OffsetDateTime::now_utc().date())
    }

    /// Write the mask, the annotated image and merge a record into `details.json`.
    pub fn report_on(
        &self,
        source_path: &Path,
        config: &CountConfig,
        outcome: &CountOutcome,
        date: Date,
    ) -> Result<ReportPaths> {
        let source_name = source_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                PlantError::InvalidInput(format!(
                    "source path has no file name: {}",
                    source_path.display()
                ))
            })?
            .to_string();

        std::fs::create_dir_all(&self.dest_dir)?;
        let details = self.details_path();

        let _lock = StoreLock::acquire(&details)?;
        // Load before writing anything so a corrupt store fails the run untouched.
        let mut store = RecordStore::load(&details)?;
        debug!(entries = store.images.len(), path = %details.display(), "record store loaded");

        let mask = self.dest_dir.join(MASK_FILE);
        outcome.mask.save(&mask).map_err(|source| PlantError::ImageEncode {
            path: mask.clone(),
            source,
        })?;

        let annotated = self.dest_dir.join(RESULT_FILE);
        outcome
            .annotated
            .save(&annotated)
            .map_err(|source| PlantError::ImageEncode {
                path: annotated.clone(),
                source,
            })?;

        let record = RunRecord::new(config, outcome.plant_count(), date)?;
        if store.merge(&source_name, record).is_some() {
            warn!(source = %source_name, "replaced existing record");
        }
        store.save(&details)?;

        info!(dir = %self.dest_dir.display(), source = %source_name, "results written");

        Ok(ReportPaths {
            mask,
            annotated,
            details,
        })
    }
}
