#![recursion_limit = "256"]

//! Transformer classifier for fixed-length motion-sensor windows.
//!
//! Layers, outermost first:
//!   1. `cli`         — clap commands
//!   2. `application` — train / evaluate workflows
//!   3. `domain`      — windows, errors, traits
//!   4. `data`        — CSV loading, labels, datasets, batching
//!   5. `ml`          — encoder, pooling, head, training, inference
//!   6. `infra`       — checkpoints and metrics logging

pub mod application;
pub mod cli;
pub mod data;
pub mod domain;
pub mod infra;
pub mod ml;
