// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Seams between the layers:
//   - WindowSource:     anything that yields labelled windows
//   - WindowClassifier: anything that maps windows to classes
//
// The training loop and the use cases only see these traits,
// so a different loader (e.g. a binary recording format) can
// be dropped in without touching them.

use anyhow::Result;

use crate::domain::window::SensorWindow;

// ─── WindowSource ─────────────────────────────────────────────────────────────
/// A source of labelled sensor windows.
///
/// Implementations:
///   - CsvWindowLoader → `<dir>/<label>/*.csv` recordings
pub trait WindowSource {
    /// Load every window together with its raw label string.
    fn load_all(&self) -> Result<Vec<(String, Vec<f32>)>>;

    /// Time steps per window produced by this source.
    fn window_len(&self) -> usize;

    /// Channels per time step produced by this source.
    fn feat_dim(&self) -> usize;
}

// ─── WindowClassifier ─────────────────────────────────────────────────────────
/// Anything that can predict a class index per window.
///
/// Implementations:
///   - Inferencer → runs the trained transformer
pub trait WindowClassifier {
    /// Predicted class index for each window, in input order.
    fn classify(&self, windows: &[SensorWindow]) -> Result<Vec<usize>>;
}
