// THEORY:
// This file is the entry point for the `canvas_spotlight` library crate. The
// crate watches a large, slowly evolving grid of 4-bit canvas colours and
// repeatedly picks the most interesting 64x64 window to put on a small LED
// matrix display, rotating between regions so the same spot is not shown
// twice in a row.
//
// The high-level interface lives in `pipeline` (`Spotlight`, its config and
// the exported `Frame`). The engine internals — the grid state, the dual
// sequential/parallel window scorer and the rotation-aware selector — live in
// `core_modules` and are exported for callers that want to drive the pieces
// directly.

pub mod console;
pub mod core_modules;
pub mod error;
pub mod pipeline;

pub use error::{Error, Result};
pub use pipeline::{Frame, Spotlight, SpotlightConfig};
