// ============================================================
// Layer 4 — CSV Window Loader
// ============================================================
// Reads motion recordings laid out one folder per activity:
//
//   <dir>/
//     ├── walking/
//     │     ├── rec_001.csv
//     │     └── rec_002.csv
//     └── sitting/
//           └── rec_003.csv
//
// Every CSV has a header row. The channels listed in
// SENSOR_CHANNELS are picked out by column name, so extra
// columns (timestamps, device ids, ...) are ignored and column
// order in the file does not matter.
//
// Each recording is cut into consecutive, non-overlapping
// windows of `window_len` rows. A trailing remainder shorter
// than a window is dropped; windows are never padded.
//
// Folders and files are visited in sorted order so the same
// directory always produces the same window order.

use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::traits::WindowSource;
use crate::domain::window::{SENSOR_CHANNELS, WINDOW_LEN};

/// Loads labelled windows from `<dir>/<label>/*.csv`.
/// Implements the WindowSource trait from Layer 3.
pub struct CsvWindowLoader {
    dir:        PathBuf,
    window_len: usize,
    channels:   Vec<String>,
}

impl CsvWindowLoader {
    /// Loader for the standard 19 channels and 150-step windows.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir:        dir.into(),
            window_len: WINDOW_LEN,
            channels:   SENSOR_CHANNELS.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn with_window_len(mut self, window_len: usize) -> Self {
        self.window_len = window_len;
        self
    }

    /// Replace the channel list (column names, in model order).
    pub fn with_channels(mut self, channels: Vec<String>) -> Self {
        self.channels = channels;
        self
    }

    fn load_file(&self, path: &Path) -> Result<Vec<Vec<f32>>> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Cannot open '{}'", path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("Cannot read header of '{}'", path.display()))?
            .clone();

        // Column index of every requested channel
        let mut columns = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            match headers.iter().position(|h| h.trim() == channel) {
                Some(idx) => columns.push(idx),
                None => bail!("'{}' has no column '{}'", path.display(), channel),
            }
        }

        let feat_dim = columns.len();
        let mut rows: Vec<f32> = Vec::new();
        let mut n_rows = 0usize;

        for (line, record) in reader.records().enumerate() {
            let record = record
                .with_context(|| format!("Malformed row {} in '{}'", line + 2, path.display()))?;

            for (&col, channel) in columns.iter().zip(&self.channels) {
                let raw = record.get(col).unwrap_or("").trim();
                let value: f32 = raw.parse().with_context(|| {
                    format!(
                        "'{}' row {}: cannot parse '{}' in column '{}'",
                        path.display(),
                        line + 2,
                        raw,
                        channel
                    )
                })?;
                rows.push(value);
            }
            n_rows += 1;
        }

        let step = self.window_len * feat_dim;
        let windows: Vec<Vec<f32>> = rows.chunks_exact(step).map(<[f32]>::to_vec).collect();

        tracing::debug!(
            "{}: {} rows → {} windows ({} rows dropped)",
            path.display(),
            n_rows,
            windows.len(),
            n_rows % self.window_len.max(1),
        );

        Ok(windows)
    }
}

impl WindowSource for CsvWindowLoader {
    fn load_all(&self) -> Result<Vec<(String, Vec<f32>)>> {
        if self.window_len == 0 {
            bail!("window length must be positive");
        }

        // A missing directory yields no windows instead of an error;
        // the caller decides whether an empty set is acceptable.
        if !self.dir.exists() {
            tracing::warn!(
                "Data directory '{}' does not exist, returning no windows",
                self.dir.display()
            );
            return Ok(Vec::new());
        }

        let mut samples = Vec::new();

        for label_dir in sorted_entries(&self.dir)? {
            if !label_dir.is_dir() {
                continue;
            }
            let label = match label_dir.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };

            let mut count = 0usize;
            for file in sorted_entries(&label_dir)? {
                if file.extension().and_then(|e| e.to_str()) != Some("csv") {
                    continue;
                }
                for window in self.load_file(&file)? {
                    samples.push((label.clone(), window));
                    count += 1;
                }
            }
            tracing::debug!("Label '{}': {} windows", label, count);
        }

        tracing::info!(
            "Loaded {} windows from '{}'",
            samples.len(),
            self.dir.display()
        );
        Ok(samples)
    }

    fn window_len(&self) -> usize {
        self.window_len
    }

    fn feat_dim(&self) -> usize {
        self.channels.len()
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
    {
        paths.push(entry?.path());
    }
    paths.sort();
    Ok(paths)
}
