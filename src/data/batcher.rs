// ============================================================
// Layer 4 — Window Batcher
// ============================================================
// Implements Burn's Batcher trait: a Vec of SensorWindows is
// stacked into one rank-3 float tensor and one label tensor.
//
//   Input:  N windows, each (seq_len × feat_dim) row-major
//   Output: sequences [N, seq_len, feat_dim], labels [N]
//
// All windows are the same length by construction, so the
// flat values are concatenated and reshaped. No padding.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::window::SensorWindow;

// ─── WindowBatch ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct WindowBatch<B: Backend> {
    /// [batch_size, seq_len, feat_dim]
    pub sequences: Tensor<B, 3>,

    /// [batch_size] class indices
    pub labels: Tensor<B, 1, Int>,
}

// ─── WindowBatcher ────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct WindowBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> WindowBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SensorWindow, WindowBatch<B>> for WindowBatcher<B> {
    fn batch(&self, items: Vec<SensorWindow>) -> WindowBatch<B> {
        let batch_size = items.len();
        let (seq_len, feat_dim) = items.first().map(|w| w.shape()).unwrap_or((0, 0));

        let flat: Vec<f32> = items
            .iter()
            .flat_map(|w| w.values.iter().copied())
            .collect();

        let labels: Vec<i32> = items.iter().map(|w| w.label as i32).collect();

        let sequences = Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len, feat_dim]);

        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        WindowBatch { sequences, labels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_stacks_windows_in_order() {
        let device = Default::default();
        let batcher = WindowBatcher::<TestBackend>::new(device);

        let a = SensorWindow::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3, 4).unwrap();
        let b = SensorWindow::new(vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0], 2, 3, 1).unwrap();
        let batch = batcher.batch(vec![a, b]);

        assert_eq!(batch.sequences.dims(), [2, 2, 3]);
        assert_eq!(batch.labels.dims(), [2]);

        let values: Vec<f32> = batch.sequences.into_data().to_vec().unwrap();
        assert_eq!(values[3], 4.0);
        assert_eq!(values[6], 7.0);

        let labels: Vec<i64> = batch.labels.into_data().iter::<i64>().collect();
        assert_eq!(labels, vec![4, 1]);
    }
}
