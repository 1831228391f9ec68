use burn::data::dataset::Dataset;

use crate::domain::window::SensorWindow;

/// In-memory collection of encoded windows.
pub struct WindowDataset {
    windows: Vec<SensorWindow>,
}

impl WindowDataset {
    pub fn new(windows: Vec<SensorWindow>) -> Self { Self { windows } }

    pub fn sample_count(&self) -> usize { self.windows.len() }

    /// Number of windows per class index, up to `n_classes`.
    pub fn class_counts(&self, n_classes: usize) -> Vec<usize> {
        let mut counts = vec![0; n_classes];
        for w in &self.windows {
            if let Some(c) = counts.get_mut(w.label) {
                *c += 1;
            }
        }
        counts
    }

    /// Optimiser steps needed for one pass at `batch_size`.
    pub fn steps_per_epoch(&self, batch_size: usize) -> usize {
        self.windows.len().div_ceil(batch_size.max(1))
    }
}

impl Dataset<SensorWindow> for WindowDataset {
    fn get(&self, index: usize) -> Option<SensorWindow> {
        self.windows.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_per_epoch_rounds_up() {
        let ds = WindowDataset::new((0..10).map(|i| SensorWindow::zeros(2, 3, i % 2)).collect());
        assert_eq!(ds.steps_per_epoch(4), 3);
        assert_eq!(ds.steps_per_epoch(10), 1);
        assert_eq!(ds.class_counts(3), vec![5, 5, 0]);
    }
}
