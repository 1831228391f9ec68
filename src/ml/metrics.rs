// ============================================================
// Layer 5 — Classification Metrics
// ============================================================
// Epoch-level accuracy and F1 built from a confusion matrix.
//
// Input convention: every metric here consumes predicted class
// INDICES (argmax of the logits) and target indices. Softmax
// probabilities never enter these computations.
//
//   precision_c = TP_c / (TP_c + FP_c)
//   recall_c    = TP_c / (TP_c + FN_c)
//   F1_c        = 2 · P · R / (P + R)          (0 when P + R = 0)
//   macro F1    = mean of F1_c over classes seen in targets or
//                 predictions this epoch
//   micro F1    = F1 of the pooled TP / FP / FN counts
//                 (equals accuracy for single-label data)

use burn::prelude::*;

/// Square confusion matrix: rows = target, columns = prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfusionMatrix {
    n_classes: usize,
    counts:    Vec<usize>,
}

impl ConfusionMatrix {
    pub fn new(n_classes: usize) -> Self {
        Self { n_classes, counts: vec![0; n_classes * n_classes] }
    }

    /// Add one batch of (prediction, target) pairs.
    /// Indices outside 0..n_classes are skipped.
    pub fn update(&mut self, predictions: &[usize], targets: &[usize]) {
        for (&pred, &target) in predictions.iter().zip(targets) {
            if pred < self.n_classes && target < self.n_classes {
                self.counts[target * self.n_classes + pred] += 1;
            }
        }
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn count(&self, target: usize, pred: usize) -> usize {
        self.counts[target * self.n_classes + pred]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    fn true_positives(&self, class: usize) -> usize {
        self.count(class, class)
    }

    fn predicted(&self, class: usize) -> usize {
        (0..self.n_classes).map(|t| self.count(t, class)).sum()
    }

    fn actual(&self, class: usize) -> usize {
        (0..self.n_classes).map(|p| self.count(class, p)).sum()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..self.n_classes).map(|c| self.true_positives(c)).sum();
        correct as f64 / total as f64
    }

    pub fn f1(&self, class: usize) -> f64 {
        let tp = self.true_positives(class) as f64;
        let predicted = self.predicted(class) as f64;
        let actual = self.actual(class) as f64;
        if predicted == 0.0 || actual == 0.0 {
            return 0.0;
        }
        let precision = tp / predicted;
        let recall = tp / actual;
        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    }

    /// Mean per-class F1 over classes present in targets or predictions.
    pub fn macro_f1(&self) -> f64 {
        let present: Vec<usize> = (0..self.n_classes)
            .filter(|&c| self.actual(c) + self.predicted(c) > 0)
            .collect();
        if present.is_empty() {
            return 0.0;
        }
        present.iter().map(|&c| self.f1(c)).sum::<f64>() / present.len() as f64
    }

    pub fn micro_f1(&self) -> f64 {
        let tp: usize = (0..self.n_classes).map(|c| self.true_positives(c)).sum();
        let total = self.total();
        // Σ FP = Σ FN = total − TP when every sample has one label
        let errors = total - tp;
        let denom = 2 * tp + 2 * errors;
        if denom == 0 {
            0.0
        } else {
            (2 * tp) as f64 / denom as f64
        }
    }

    pub fn per_class_f1(&self) -> Vec<f64> {
        (0..self.n_classes).map(|c| self.f1(c)).collect()
    }
}

/// Summary reported at the end of an epoch or evaluation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochSummary {
    pub loss:     f64,
    pub accuracy: f64,
    pub macro_f1: f64,
    pub micro_f1: f64,
    pub samples:  usize,
}

/// Running loss and confusion matrix over one pass of a dataset.
#[derive(Debug, Clone)]
pub struct MetricsAccumulator {
    loss_sum:   f64,
    samples:    usize,
    confusion:  ConfusionMatrix,
}

impl MetricsAccumulator {
    pub fn new(n_classes: usize) -> Self {
        Self { loss_sum: 0.0, samples: 0, confusion: ConfusionMatrix::new(n_classes) }
    }

    /// Record a batch: mean loss over the batch plus class indices.
    pub fn update(&mut self, batch_loss: f64, predictions: &[usize], targets: &[usize]) {
        let n = targets.len();
        self.loss_sum += batch_loss * n as f64;
        self.samples  += n;
        self.confusion.update(predictions, targets);
    }

    /// Record a batch straight from logits [batch, C] and labels [batch].
    pub fn update_from_logits<B: Backend>(
        &mut self,
        batch_loss: f64,
        logits:     Tensor<B, 2>,
        labels:     Tensor<B, 1, Int>,
    ) {
        let predictions = argmax_indices(logits);
        let targets = int_indices(labels);
        self.update(batch_loss, &predictions, &targets);
    }

    pub fn confusion(&self) -> &ConfusionMatrix {
        &self.confusion
    }

    /// Sample-weighted mean loss (NaN when nothing was recorded).
    pub fn avg_loss(&self) -> f64 {
        if self.samples == 0 {
            return f64::NAN;
        }
        self.loss_sum / self.samples as f64
    }

    pub fn summary(&self) -> EpochSummary {
        EpochSummary {
            loss:     self.avg_loss(),
            accuracy: self.confusion.accuracy(),
            macro_f1: self.confusion.macro_f1(),
            micro_f1: self.confusion.micro_f1(),
            samples:  self.samples,
        }
    }
}

/// Predicted class per row of logits [batch, C].
pub fn argmax_indices<B: Backend>(logits: Tensor<B, 2>) -> Vec<usize> {
    // argmax(1) returns [batch, 1]; flatten before reading back
    int_indices(logits.argmax(1).flatten::<1>(0, 1))
}

/// Read an Int tensor back to host indices.
pub fn int_indices<B: Backend>(values: Tensor<B, 1, Int>) -> Vec<usize> {
    values
        .into_data()
        .iter::<i64>()
        .map(|v| v.max(0) as usize)
        .collect()
}
