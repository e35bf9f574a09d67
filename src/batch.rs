//! # Batch Output
//!
//! Renders one finished image per selected record and hands each to the
//! print collaborator, sequentially, with a fixed politeness delay between
//! submissions so the OS print spooler is never flooded. A failed
//! submission is logged and recorded; the batch continues. A cooperative
//! cancel flag is checked between records.

use crate::compose::Composer;
use crate::dataset::DataTable;
use crate::error::PlacardError;
use crate::store::{ConfigSink, ConfigStore};
use image::RgbaImage;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Receives one finished raster per record and forwards it to the OS print
/// mechanism. The surrounding application implements the real hand-off;
/// [`DirectorySpooler`] materializes the per-record job files.
pub trait PrintSpooler {
    fn submit(&mut self, record: usize, image: &RgbaImage) -> Result<(), PlacardError>;
}

/// Writes each job as `job_{record}.png` into an output directory.
#[derive(Debug, Clone)]
pub struct DirectorySpooler {
    dir: PathBuf,
}

impl DirectorySpooler {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, PlacardError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn job_path(&self, record: usize) -> PathBuf {
        self.dir.join(format!("job_{record}.png"))
    }
}

impl PrintSpooler for DirectorySpooler {
    fn submit(&mut self, record: usize, image: &RgbaImage) -> Result<(), PlacardError> {
        image
            .save(self.job_path(record))
            .map_err(|e| PlacardError::Print(format!("job {record}: {e}")))
    }
}

/// Batch pacing knobs.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Delay between consecutive submissions.
    pub delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1500),
        }
    }
}

/// What happened to each selected record.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Records successfully handed to the spooler, in submission order.
    pub submitted: Vec<usize>,
    /// Records whose submission failed, with the failure message.
    pub failed: Vec<(usize, String)>,
    /// True when the cancel flag stopped the batch early.
    pub cancelled: bool,
}

/// Render and submit every selected record, sequentially.
///
/// The cancel flag is checked before each record; records already submitted
/// stay submitted. Per-record failures do not abort the rest of the batch.
pub fn run_batch<S: ConfigSink>(
    composer: &Composer<'_>,
    store: &ConfigStore<S>,
    table: &dyn DataTable,
    selection: &[usize],
    spooler: &mut dyn PrintSpooler,
    options: &BatchOptions,
    cancel: &AtomicBool,
) -> BatchReport {
    let mut report = BatchReport::default();

    for (i, &idx) in selection.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            report.cancelled = true;
            break;
        }

        let config = store.resolve(idx);
        let image = composer.render_final(table, idx, &config);
        match spooler.submit(idx, &image) {
            Ok(()) => report.submitted.push(idx),
            Err(err) => {
                log::warn!("print submission failed for record {idx}: {err}");
                report.failed.push((idx, err.to_string()));
            }
        }

        if i + 1 < selection.len() && !options.delay.is_zero() {
            thread::sleep(options.delay);
        }
    }

    report
}
