// THEORY:
// The `PixelGrid` is the single owner of canvas state. It holds two dense,
// row-major sequences of equal length: the current colour id of every cell and
// a per-cell "activity" value estimating how often that cell has recently
// changed, expressed as an approximate updates-per-24-hours rate.
//
// Key architectural principles:
// 1.  **Exclusive ownership**: Nothing else holds a mutable reference to the
//     colour or activity arrays. Mutation happens only through `apply_updates`,
//     and `crop` hands out an independent copy, never a view.
// 2.  **Variable-step decay**: Activity is a variable-step exponential
//     estimator. Each update batch computes how many elapsed intervals fit in
//     24 hours (`n`) and folds every cell through
//     `activity' = indicator - activity/n + activity`, where the indicator is
//     1 for cells touched in this batch and 0 otherwise. The step is applied
//     to every cell per call, not just the changed ones; long gaps decay hard,
//     rapid-fire batches barely decay at all.
// 3.  **Fail fast**: Out-of-range coordinates and a non-monotonic clock are
//     reported as errors before any state changes. There is no clamping and
//     no partial application of an update batch.

use crate::core_modules::palette::{self, PALETTE_SIZE};
use crate::error::{Error, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds in the 24-hour window the activity estimator is scaled to.
const DAY_MS: f64 = 86_400_000.0;

/// Current wall-clock time in Unix milliseconds. A clock before the epoch
/// collapses to 0 and is caught by the non-monotonic elapsed check.
pub(crate) fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Shannon entropy in bits of a colour-id frequency table, zero frequencies
/// omitted. For 16 symbols the result lies in [0, 4].
pub(crate) fn shannon_entropy(freq: &[u32; PALETTE_SIZE], total: u32) -> f64 {
    let total = total as f64;
    freq.iter()
        .filter(|&&f| f != 0)
        .map(|&f| {
            let p = f as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// One incremental pixel change delivered by the canvas source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelChange {
    pub x: u32,
    pub y: u32,
    pub colour: u8,
}

/// A dense grid of canvas colours with a parallel per-cell activity estimate.
pub struct PixelGrid {
    width: u32,
    height: u32,
    /// Row-major colour ids, exactly `width * height` entries.
    colours: Vec<u8>,
    /// Row-major activity values, same shape as `colours`. Always >= 0.
    activity: Vec<f64>,
    /// Unix-millisecond timestamp of the last mutation.
    last_update_ms: u64,
}

impl PixelGrid {
    /// Constructs a grid from an explicit colour sequence. Activity starts at
    /// zero everywhere and the mutation timestamp at the current time.
    pub fn new(width: u32, height: u32, colours: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if colours.len() != expected {
            return Err(Error::DimensionMismatch {
                width,
                height,
                expected,
                actual: colours.len(),
            });
        }
        Ok(Self {
            width,
            height,
            activity: vec![0.0; colours.len()],
            colours,
            last_update_ms: now_unix_ms(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells.
    pub fn size(&self) -> usize {
        self.colours.len()
    }

    /// Row-major colour ids.
    pub fn colours(&self) -> &[u8] {
        &self.colours
    }

    /// Row-major per-cell activity estimates.
    pub fn activity(&self) -> &[f64] {
        &self.activity
    }

    /// Unix-millisecond timestamp of the last mutation.
    pub fn last_update_ms(&self) -> u64 {
        self.last_update_ms
    }

    /// Applies a batch of pixel changes stamped with the current wall clock.
    pub fn apply_updates(&mut self, changes: &[PixelChange]) -> Result<()> {
        self.apply_updates_at(changes, now_unix_ms())
    }

    /// Applies a batch of pixel changes stamped with an explicit clock, for
    /// callers that own their own time source.
    ///
    /// Overwrites the colour of every changed cell, then folds one decay step
    /// of the activity estimator over the whole grid. Fails before touching
    /// any state if a change is out of range or the clock did not advance.
    pub fn apply_updates_at(&mut self, changes: &[PixelChange], now_ms: u64) -> Result<()> {
        for change in changes {
            if change.x >= self.width || change.y >= self.height {
                return Err(Error::ChangeOutOfBounds {
                    x: change.x,
                    y: change.y,
                    width: self.width,
                    height: self.height,
                });
            }
        }

        let elapsed_ms = now_ms as i64 - self.last_update_ms as i64;
        if elapsed_ms <= 0 {
            return Err(Error::NonMonotonicClock { elapsed_ms });
        }

        let mut touched = vec![false; self.colours.len()];
        for change in changes {
            let offset = (change.y * self.width + change.x) as usize;
            self.colours[offset] = change.colour;
            touched[offset] = true;
        }

        // Number of elapsed intervals that fit in 24 hours. The estimator
        // converges on the per-24h update rate of each cell.
        let n = DAY_MS / elapsed_ms as f64;
        for (value, was_touched) in self.activity.iter_mut().zip(&touched) {
            let indicator = if *was_touched { 1.0 } else { 0.0 };
            *value = indicator - *value / n + *value;
        }

        self.last_update_ms = now_ms;
        Ok(())
    }

    /// Returns an independent copy of the `w`x`h` sub-rectangle at (`x`, `y`).
    /// Activity history is intentionally not carried into the copy; the crop
    /// starts with zero activity and a fresh mutation timestamp.
    pub fn crop(&self, x: u32, y: u32, w: u32, h: u32) -> Result<PixelGrid> {
        if x as u64 + w as u64 > self.width as u64 || y as u64 + h as u64 > self.height as u64 {
            return Err(Error::OutOfBounds {
                x,
                y,
                w,
                h,
                width: self.width,
                height: self.height,
            });
        }

        let mut colours = Vec::with_capacity(w as usize * h as usize);
        for row in 0..h {
            let start = ((y + row) * self.width + x) as usize;
            colours.extend_from_slice(&self.colours[start..start + w as usize]);
        }

        Ok(PixelGrid {
            width: w,
            height: h,
            activity: vec![0.0; colours.len()],
            colours,
            last_update_ms: now_unix_ms(),
        })
    }

    /// Serializes the grid to a flat row-major RGB buffer, three bytes per
    /// cell in palette order.
    pub fn to_rgb_buffer(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.colours.len() * 3);
        for &id in &self.colours {
            let entry = palette::rgb(id);
            rgb.extend_from_slice(&[entry.red, entry.green, entry.blue]);
        }
        rgb
    }

    /// Shannon entropy in bits of the colour distribution over the whole grid.
    pub fn entropy(&self) -> f64 {
        let mut freq = [0u32; PALETTE_SIZE];
        for &id in &self.colours {
            freq[(id & 0x0f) as usize] += 1;
        }
        shannon_entropy(&freq, self.colours.len() as u32)
    }
}
