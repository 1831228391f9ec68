// ============================================================
// Layer 5 — Warmup + Cosine Learning-Rate Schedule
// ============================================================
// Per optimiser step t (the first step is t = 1):
//
//   decay(t)  = 0.5 · (1 + cos(π · min(t, T) / T))
//   warmup(t) = 1                 if w = 0
//             = min(1, t / w)     otherwise
//   lr(t)     = base_lr · decay(t) · warmup(t)
//
// T (total optimiser steps) is handed in by the caller, usually
// max_epochs × steps_per_epoch. Steps past T are clamped so the
// rate settles at 0 instead of climbing back up the cosine.
//
// The schedule is a pure function of the step counter; the
// struct only owns that counter.

use std::f64::consts::PI;

use crate::domain::error::{ModelError, ModelResult};

/// Multiplier applied to the base learning rate at step `t`.
pub fn lr_multiplier(t: usize, warmup: usize, total_steps: usize) -> f64 {
    if total_steps == 0 {
        return 0.0;
    }
    let t = t.min(total_steps) as f64;
    let decay = 0.5 * (1.0 + (PI * t / total_steps as f64).cos());
    let ramp = if warmup == 0 { 1.0 } else { (t / warmup as f64).min(1.0) };
    decay * ramp
}

/// Step counter plus the constants of the schedule.
#[derive(Debug, Clone)]
pub struct WarmupCosineSchedule {
    base_lr:     f64,
    warmup:      usize,
    total_steps: usize,
    /// Optimiser updates applied so far
    completed:   usize,
}

impl WarmupCosineSchedule {
    pub fn new(base_lr: f64, warmup: usize, total_steps: usize) -> ModelResult<Self> {
        if total_steps == 0 {
            return Err(ModelError::InvalidConfig(
                "scheduler needs total_steps > 0 (empty training set?)".into(),
            ));
        }
        if !(base_lr.is_finite() && base_lr > 0.0) {
            return Err(ModelError::InvalidConfig(format!(
                "base learning rate must be positive, got {base_lr}"
            )));
        }
        if warmup > total_steps {
            tracing::warn!(
                "warmup ({}) exceeds total steps ({}); peak rate is never reached",
                warmup, total_steps
            );
        }
        Ok(Self { base_lr, warmup, total_steps, completed: 0 })
    }

    /// Step index the next optimiser update will use (1-based).
    pub fn current_step(&self) -> usize {
        self.completed + 1
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn multiplier(&self) -> f64 {
        lr_multiplier(self.current_step(), self.warmup, self.total_steps)
    }

    /// Learning rate for the next optimiser update.
    pub fn current_lr(&self) -> f64 {
        self.base_lr * self.multiplier()
    }

    /// Record one applied optimiser update.
    pub fn advance(&mut self) {
        self.completed += 1;
    }
}
