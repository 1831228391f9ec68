// ============================================================
// Layer 3 — SensorWindow Domain Type
// ============================================================
// One classification instance: a fixed-length slice of motion
// sensor readings plus its integer class label.
//
// Layout of `values` is row-major over (time, channel):
//   [t0_c0, t0_c1, ..., t0_c18, t1_c0, ..., t149_c18]
//
// Channel order is fixed and documented by SENSOR_CHANNELS.
// The loader selects CSV columns by these names, so the order
// here is the order the model sees.

use serde::{Deserialize, Serialize};

/// Default number of time steps per window.
pub const WINDOW_LEN: usize = 150;

/// Sensor channels in the order they appear in every window.
pub const SENSOR_CHANNELS: [&str; 19] = [
    "accelerometerAccelerationX(G)",
    "accelerometerAccelerationY(G)",
    "accelerometerAccelerationZ(G)",
    "motionYaw(rad)",
    "motionRoll(rad)",
    "motionPitch(rad)",
    "motionRotationRateX(rad/s)",
    "motionRotationRateY(rad/s)",
    "motionRotationRateZ(rad/s)",
    "motionUserAccelerationX(G)",
    "motionUserAccelerationY(G)",
    "motionUserAccelerationZ(G)",
    "motionQuaternionX(R)",
    "motionQuaternionY(R)",
    "motionQuaternionZ(R)",
    "motionQuaternionW(R)",
    "motionGravityX(G)",
    "motionGravityY(G)",
    "motionGravityZ(G)",
];

/// Number of feature channels per time step.
pub const FEATURE_DIM: usize = SENSOR_CHANNELS.len();

/// A labelled, fixed-length window of sensor readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorWindow {
    /// Row-major (seq_len × feat_dim) readings
    pub values: Vec<f32>,

    /// Number of time steps
    pub seq_len: usize,

    /// Number of channels per time step
    pub feat_dim: usize,

    /// Encoded class index (see data::label_encoder)
    pub label: usize,
}

impl SensorWindow {
    /// Build a window from flat row-major values.
    /// Returns None when `values.len() != seq_len * feat_dim`.
    pub fn new(values: Vec<f32>, seq_len: usize, feat_dim: usize, label: usize) -> Option<Self> {
        if values.len() != seq_len * feat_dim {
            return None;
        }
        Some(Self { values, seq_len, feat_dim, label })
    }

    /// All-zero window, handy for smoke tests of the forward pass.
    pub fn zeros(seq_len: usize, feat_dim: usize, label: usize) -> Self {
        Self {
            values: vec![0.0; seq_len * feat_dim],
            seq_len,
            feat_dim,
            label,
        }
    }

    /// Shape as (seq_len, feat_dim).
    pub fn shape(&self) -> (usize, usize) {
        (self.seq_len, self.feat_dim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_length() {
        assert!(SensorWindow::new(vec![0.0; 10], 3, 4, 0).is_none());
        assert!(SensorWindow::new(vec![0.0; 12], 3, 4, 0).is_some());
    }

    #[test]
    fn test_shape_reports_time_then_channels() {
        let values: Vec<f32> = (0..6).map(|v| v as f32).collect();
        let w = SensorWindow::new(values, 2, 3, 1).unwrap();
        assert_eq!(w.shape(), (2, 3));
    }

    #[test]
    fn test_channel_count_matches_feature_dim() {
        assert_eq!(FEATURE_DIM, 19);
        assert_eq!(SENSOR_CHANNELS[15], "motionQuaternionW(R)");
    }
}
