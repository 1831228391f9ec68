// ============================================================
// Layer 4 — Label Encoder
// ============================================================
// Maps activity label strings to class indices and back.
// Indices follow the sorted order of the distinct labels, so
// the same label set always yields the same mapping.
//
// The label list is stored in the snapshot config; evaluation
// rebuilds the encoder from it with `from_labels`.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    labels: Vec<String>,
}

impl LabelEncoder {
    /// Collect the distinct labels, sorted.
    pub fn fit<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut labels: Vec<String> = labels.into_iter().map(str::to_string).collect();
        labels.sort();
        labels.dedup();
        Self { labels }
    }

    /// Rebuild from an already ordered label list (index = position).
    pub fn from_labels(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn encode(&self, label: &str) -> Result<usize> {
        match self.labels.iter().position(|l| l == label) {
            Some(idx) => Ok(idx),
            None => bail!(
                "Unknown label '{}'; known labels: [{}]",
                label,
                self.labels.join(", ")
            ),
        }
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }
}
