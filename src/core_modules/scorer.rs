// THEORY:
// The `WindowScorer` turns a canvas snapshot into two same-shaped score grids,
// one value per valid 64x64 window position. The entropy score is a parabola
// peaking at 2.5 bits of window entropy, penalizing windows that are too flat
// or too noisy symmetrically; the activity score is `log2(2 + sum)` over the
// window's activity estimates, a diminishing-returns reward for recent change
// with a floor of exactly 1. Only stride-aligned positions are real
// candidates; everything else scores a hard 0 in both grids.
//
// Key architectural principles:
// 1.  **Explicit backend strategy**: Execution mode is a `ScoreBackend` trait
//     object owned by the scorer, never a process-wide kernel registry. Two
//     scorers with different backends coexist without touching each other.
// 2.  **One kernel, two drivers**: Both backends run the exact same per-row
//     kernel, so their outputs are bit-identical. The parallel backend only
//     changes who iterates the rows; output rows are disjoint and the input
//     grid is read-only, so no synchronization is involved.
// 3.  **No silent zeros**: A valid pass always scores position (0, 0), which
//     is aligned for every stride, and its activity score is at least 1. An
//     all-zero activity grid from the parallel backend therefore means the
//     pass was never actually computed, and it is surfaced as the recoverable
//     `BackendExhausted` error instead of being returned as a score.

use crate::core_modules::palette::PALETTE_SIZE;
use crate::core_modules::pixel_grid::{PixelGrid, shannon_entropy};
use crate::error::{Error, Result};
use rayon::prelude::*;

/// Side length of the fixed square window every score describes.
pub const WINDOW_SIZE: u32 = 64;

/// Window entropy (in bits) that maximizes the entropy score.
const IDEAL_ENTROPY_BITS: f64 = 2.5;

const WINDOW_CELLS: u32 = WINDOW_SIZE * WINDOW_SIZE;

/// A dense (W-63)x(H-63) grid of non-negative scores, one per valid window
/// top-left position. Regenerated on every scoring pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreGrid {
    width: u32,
    height: u32,
    values: Vec<f64>,
}

impl ScoreGrid {
    fn zeroed(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            values: vec![0.0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Score at window top-left (`x`, `y`).
    pub fn get(&self, x: u32, y: u32) -> f64 {
        self.values[(y * self.width + x) as usize]
    }

    /// Row-major score values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Validates the grid and stride and returns the score-grid dimensions.
fn output_dims(grid: &PixelGrid, stride: u32) -> Result<(u32, u32)> {
    if stride == 0 {
        return Err(Error::ZeroStride);
    }
    if grid.width() < WINDOW_SIZE || grid.height() < WINDOW_SIZE {
        return Err(Error::GridTooSmall {
            width: grid.width(),
            height: grid.height(),
        });
    }
    Ok((
        grid.width() - (WINDOW_SIZE - 1),
        grid.height() - (WINDOW_SIZE - 1),
    ))
}

/// Maps window entropy in bits onto the interest parabola. Peaks at 6.25 for
/// 2.5 bits and falls off symmetrically towards 0 and 4 bits.
pub(crate) fn entropy_score_from_bits(bits: f64) -> f64 {
    let closeness = IDEAL_ENTROPY_BITS - (bits - IDEAL_ENTROPY_BITS).abs();
    closeness * closeness
}

fn entropy_score_at(colours: &[u8], grid_width: usize, x: usize, y: usize) -> f64 {
    let mut freq = [0u32; PALETTE_SIZE];
    for row in 0..WINDOW_SIZE as usize {
        let start = (y + row) * grid_width + x;
        for &id in &colours[start..start + WINDOW_SIZE as usize] {
            freq[(id & 0x0f) as usize] += 1;
        }
    }
    entropy_score_from_bits(shannon_entropy(&freq, WINDOW_CELLS))
}

fn activity_score_at(activity: &[f64], grid_width: usize, x: usize, y: usize) -> f64 {
    let mut total = 0.0;
    for row in 0..WINDOW_SIZE as usize {
        let start = (y + row) * grid_width + x;
        for &value in &activity[start..start + WINDOW_SIZE as usize] {
            total += value;
        }
    }
    // Base score 2 keeps the multiplier at least 1 when nothing changed.
    (2.0 + total).log2()
}

/// Scores one output row. Shared verbatim by both backends so their results
/// are identical. Rows and columns off the stride keep their zero.
fn score_row(
    grid: &PixelGrid,
    stride: u32,
    y: u32,
    entropy_row: &mut [f64],
    activity_row: &mut [f64],
) {
    if y % stride != 0 {
        return;
    }
    let grid_width = grid.width() as usize;
    let colours = grid.colours();
    let activity = grid.activity();
    for x in 0..entropy_row.len() {
        if x as u32 % stride != 0 {
            continue;
        }
        entropy_row[x] = entropy_score_at(colours, grid_width, x, y as usize);
        activity_row[x] = activity_score_at(activity, grid_width, x, y as usize);
    }
}

/// An execution strategy for one scoring pass: entropy scores and activity
/// scores over every valid window position.
pub trait ScoreBackend: Send + Sync {
    fn score(&self, grid: &PixelGrid, stride: u32) -> Result<(ScoreGrid, ScoreGrid)>;
}

/// Straightforward single-threaded scoring.
pub struct SequentialBackend;

impl ScoreBackend for SequentialBackend {
    fn score(&self, grid: &PixelGrid, stride: u32) -> Result<(ScoreGrid, ScoreGrid)> {
        let (out_w, out_h) = output_dims(grid, stride)?;
        let mut entropy = ScoreGrid::zeroed(out_w, out_h);
        let mut activity = ScoreGrid::zeroed(out_w, out_h);

        for (y, (entropy_row, activity_row)) in entropy
            .values
            .chunks_mut(out_w as usize)
            .zip(activity.values.chunks_mut(out_w as usize))
            .enumerate()
        {
            score_row(grid, stride, y as u32, entropy_row, activity_row);
        }

        Ok((entropy, activity))
    }
}

/// Data-parallel scoring over disjoint output rows. Owns its worker pool so
/// multiple scorers never share implicit global state.
pub struct ParallelBackend {
    pool: rayon::ThreadPool,
}

impl ParallelBackend {
    pub fn new() -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_cpus::get())
            .thread_name(|i| format!("scorer-{i}"))
            .build()
            .map_err(|e| Error::ThreadPool(e.to_string()))?;
        Ok(Self { pool })
    }
}

impl ScoreBackend for ParallelBackend {
    fn score(&self, grid: &PixelGrid, stride: u32) -> Result<(ScoreGrid, ScoreGrid)> {
        let (out_w, out_h) = output_dims(grid, stride)?;
        let mut entropy = ScoreGrid::zeroed(out_w, out_h);
        let mut activity = ScoreGrid::zeroed(out_w, out_h);

        self.pool.install(|| {
            entropy
                .values
                .par_chunks_mut(out_w as usize)
                .zip(activity.values.par_chunks_mut(out_w as usize))
                .enumerate()
                .for_each(|(y, (entropy_row, activity_row))| {
                    score_row(grid, stride, y as u32, entropy_row, activity_row);
                });
        });

        // Position (0, 0) is aligned for every stride and its activity score
        // has a floor of 1, so a valid pass can never be all zeros.
        if activity.values.iter().all(|&v| v == 0.0) {
            return Err(Error::BackendExhausted);
        }

        Ok((entropy, activity))
    }
}

/// Execution mode selected at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringMode {
    Sequential,
    Parallel,
}

impl ScoringMode {
    /// Builds the backend strategy for this mode.
    pub fn backend(self) -> Result<Box<dyn ScoreBackend>> {
        match self {
            ScoringMode::Sequential => Ok(Box::new(SequentialBackend)),
            ScoringMode::Parallel => Ok(Box::new(ParallelBackend::new()?)),
        }
    }
}

/// Scores every valid window position of a grid with a fixed stride and a
/// fixed backend strategy.
pub struct WindowScorer {
    backend: Box<dyn ScoreBackend>,
    stride: u32,
}

impl WindowScorer {
    pub fn new(backend: Box<dyn ScoreBackend>, stride: u32) -> Result<Self> {
        if stride == 0 {
            return Err(Error::ZeroStride);
        }
        Ok(Self { backend, stride })
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Runs one scoring pass. An exhausted parallel backend is retried on the
    /// sequential path rather than letting a degenerate grid through.
    pub fn score(&self, grid: &PixelGrid) -> Result<(ScoreGrid, ScoreGrid)> {
        match self.backend.score(grid, self.stride) {
            Err(Error::BackendExhausted) => {
                log::warn!(
                    "parallel scoring backend exhausted on {}x{} grid, retrying sequentially",
                    grid.width(),
                    grid.height()
                );
                SequentialBackend.score(grid, self.stride)
            }
            other => other,
        }
    }

    /// Elementwise product of the entropy and activity scores, the final
    /// interest measure used for selection.
    pub fn combined(&self, grid: &PixelGrid) -> Result<ScoreGrid> {
        let (entropy, activity) = self.score(grid)?;
        let values = entropy
            .values
            .iter()
            .zip(&activity.values)
            .map(|(e, a)| e * a)
            .collect();
        Ok(ScoreGrid {
            width: entropy.width,
            height: entropy.height,
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel_grid::PixelChange;

    const DAY: u64 = 86_400_000;

    fn patterned_grid(width: u32, height: u32) -> PixelGrid {
        let colours: Vec<u8> = (0..height)
            .flat_map(|y| (0..width).map(move |x| ((x * 7 + y * 13 + x * y % 5) % 16) as u8))
            .collect();
        PixelGrid::new(width, height, colours).unwrap()
    }

    #[test]
    fn entropy_parabola_peaks_at_two_and_a_half_bits() {
        assert_eq!(entropy_score_from_bits(2.5), 6.25);
        assert_eq!(entropy_score_from_bits(4.0), 1.0);
        assert_eq!(entropy_score_from_bits(1.0), 1.0);
        assert_eq!(entropy_score_from_bits(1.5), 2.25);
        assert_eq!(entropy_score_from_bits(0.0), 0.0);

        // Strictly decreasing as entropy moves away from the peak, both ways.
        let samples = [2.5, 2.75, 3.0, 3.5, 4.0];
        for pair in samples.windows(2) {
            assert!(entropy_score_from_bits(pair[0]) > entropy_score_from_bits(pair[1]));
            let mirrored_hi = 5.0 - pair[0];
            let mirrored_lo = 5.0 - pair[1];
            assert!(entropy_score_from_bits(mirrored_hi) > entropy_score_from_bits(mirrored_lo));
        }
    }

    #[test]
    fn uniform_window_scores_zero_entropy_and_unit_activity() {
        let grid = PixelGrid::new(64, 64, vec![6; 64 * 64]).unwrap();
        let (entropy, activity) = SequentialBackend.score(&grid, 1).unwrap();
        assert_eq!(entropy.values(), &[0.0]);
        assert_eq!(activity.values(), &[1.0]);

        let scorer = WindowScorer::new(Box::new(SequentialBackend), 1).unwrap();
        assert_eq!(scorer.stride(), 1);
        assert_eq!(scorer.combined(&grid).unwrap().values(), &[0.0]);
    }

    #[test]
    fn balanced_window_scores_one() {
        let colours: Vec<u8> = (0..64u32 * 64).map(|i| (i % 16) as u8).collect();
        let grid = PixelGrid::new(64, 64, colours).unwrap();
        let (entropy, _) = SequentialBackend.score(&grid, 1).unwrap();
        // 4 bits of entropy sits 1.5 away from the peak: (2.5 - 1.5)^2 = 1.
        assert_eq!(entropy.get(0, 0), 1.0);
    }

    #[test]
    fn activity_score_strictly_increases_with_activity() {
        let mut grid = PixelGrid::new(64, 64, vec![0; 64 * 64]).unwrap();
        let (_, baseline) = SequentialBackend.score(&grid, 1).unwrap();
        assert_eq!(baseline.get(0, 0), 1.0);

        let now = grid.last_update_ms() + 1_000;
        grid.apply_updates_at(&[PixelChange { x: 10, y: 10, colour: 0 }], now)
            .unwrap();
        let (_, bumped) = SequentialBackend.score(&grid, 1).unwrap();
        assert!(bumped.get(0, 0) > 1.0);
        // log2(2 + 1) with a single touched cell.
        assert_eq!(bumped.get(0, 0), 3.0f64.log2());
    }

    #[test]
    fn off_stride_positions_score_exactly_zero() {
        let grid = patterned_grid(70, 70);
        let (entropy, activity) = SequentialBackend.score(&grid, 5).unwrap();
        assert_eq!(entropy.width(), 7);
        assert_eq!(entropy.height(), 7);
        for y in 0..7 {
            for x in 0..7 {
                if x % 5 == 0 && y % 5 == 0 {
                    assert!(activity.get(x, y) >= 1.0);
                } else {
                    assert_eq!(entropy.get(x, y), 0.0);
                    assert_eq!(activity.get(x, y), 0.0);
                }
            }
        }
    }

    #[test]
    fn sequential_and_parallel_backends_agree_exactly() {
        let mut grid = patterned_grid(96, 96);
        let changes: Vec<PixelChange> = (0..96)
            .map(|i| PixelChange { x: i, y: i, colour: (i % 16) as u8 })
            .collect();
        let now = grid.last_update_ms() + DAY / 2;
        grid.apply_updates_at(&changes, now).unwrap();

        let (seq_entropy, seq_activity) = SequentialBackend.score(&grid, 2).unwrap();
        let parallel = ParallelBackend::new().unwrap();
        let (par_entropy, par_activity) = parallel.score(&grid, 2).unwrap();

        assert_eq!(seq_entropy.values(), par_entropy.values());
        assert_eq!(seq_activity.values(), par_activity.values());
    }

    #[test]
    fn scorer_falls_back_when_parallel_backend_is_exhausted() {
        struct ExhaustedBackend;
        impl ScoreBackend for ExhaustedBackend {
            fn score(&self, _: &PixelGrid, _: u32) -> Result<(ScoreGrid, ScoreGrid)> {
                Err(Error::BackendExhausted)
            }
        }

        let grid = patterned_grid(70, 70);
        let scorer = WindowScorer::new(Box::new(ExhaustedBackend), 1).unwrap();
        let (entropy, activity) = scorer.score(&grid).unwrap();

        let (seq_entropy, seq_activity) = SequentialBackend.score(&grid, 1).unwrap();
        assert_eq!(entropy.values(), seq_entropy.values());
        assert_eq!(activity.values(), seq_activity.values());
    }

    #[test]
    fn scoring_rejects_undersized_grids_and_zero_stride() {
        let small = PixelGrid::new(64, 32, vec![0; 64 * 32]).unwrap();
        assert!(matches!(
            SequentialBackend.score(&small, 1),
            Err(Error::GridTooSmall { .. })
        ));

        assert!(matches!(
            WindowScorer::new(Box::new(SequentialBackend), 0),
            Err(Error::ZeroStride)
        ));
    }
}
