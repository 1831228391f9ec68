// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits that define what the system is
// about: sensor windows, model errors and the seams between
// layers.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only structs, enums and traits

/// A labelled fixed-length sensor window and the channel order
pub mod window;

/// Typed errors raised by the model core
pub mod error;

/// Abstractions implemented by other layers
pub mod traits;
