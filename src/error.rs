// THEORY:
// Every fallible operation in the engine fails fast with a typed error rather
// than clamping, retrying, or silently degrading. The variants mirror the three
// failure families of the core: bad geometry (crop rectangles and update
// coordinates outside the grid), a non-monotonic wall clock between update
// batches, and the parallel scoring backend coming back with a degenerate
// result. The last one is deliberately loud: an overloaded backend that would
// otherwise hand back an all-zero score grid must surface as a recoverable
// error so the caller (or the scorer itself) can fall back to the sequential
// path instead of displaying a garbage segment.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A crop rectangle extends past the edge of the grid.
    #[error("crop of {w}x{h} at ({x}, {y}) exceeds the {width}x{height} grid")]
    OutOfBounds {
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        width: u32,
        height: u32,
    },

    /// An incremental pixel change targets a cell outside the grid.
    #[error("pixel change at ({x}, {y}) is outside the {width}x{height} grid")]
    ChangeOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    /// The colour sequence handed to the constructor does not match the
    /// declared grid dimensions.
    #[error("expected {expected} colours for a {width}x{height} grid, got {actual}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// The wall clock moved backwards (or not at all) since the last update
    /// batch. The caller may retry on the next tick.
    #[error("clock went backwards: {elapsed_ms}ms elapsed since the last update")]
    NonMonotonicClock { elapsed_ms: i64 },

    /// The grid has no valid 64x64 window position.
    #[error("grid of {width}x{height} is smaller than a 64x64 window")]
    GridTooSmall { width: u32, height: u32 },

    /// Candidate window stride must be at least 1.
    #[error("window stride must be at least 1")]
    ZeroStride,

    /// The parallel backend produced an all-zero score grid, which a valid
    /// pass can never do (the activity score floor is 1 at aligned positions).
    #[error("parallel scoring backend produced a degenerate all-zero score grid")]
    BackendExhausted,

    /// The parallel backend could not build its worker pool.
    #[error("could not build scoring thread pool: {0}")]
    ThreadPool(String),

    /// A snapshot-dependent operation was called before any snapshot loaded.
    #[error("no canvas snapshot has been loaded yet")]
    NoSnapshot,
}
