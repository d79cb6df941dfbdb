// THEORY:
// The `pipeline` module is the top-level API for the engine. It encapsulates
// the full cycle — ingest a snapshot or an update batch, score the canvas,
// select a segment, export it — behind a single `Spotlight` struct. One cycle
// runs to completion before the next begins; there is no internal queueing
// and no overlap between cycles. If updates arrive faster than a cycle
// completes, pacing them is the caller's concern.

use crate::core_modules::pixel_grid::PixelGrid;
use crate::core_modules::scorer::{ScoringMode, WindowScorer};
use crate::core_modules::selector::SegmentSelector;
use crate::error::{Error, Result};
use std::time::Instant;

// Re-export the types callers need to drive the pipeline.
pub use crate::core_modules::pixel_grid::PixelChange;
pub use crate::core_modules::selector::Coord;

/// Tunable behavior of the engine, fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct SpotlightConfig {
    /// Spacing between candidate window positions; positions off the stride
    /// are never scored. Must be at least 1.
    pub stride: u32,
    /// How many recent selections are excluded from re-selection.
    pub rotation_count: usize,
    /// Scoring execution strategy.
    pub mode: ScoringMode,
}

impl Default for SpotlightConfig {
    fn default() -> Self {
        Self {
            stride: 5,
            rotation_count: 10,
            // Sequential is the reliable default; parallel pays off on large
            // canvases with small strides.
            mode: ScoringMode::Sequential,
        }
    }
}

/// The exported result of one selection cycle.
pub struct Frame {
    /// Top-left coordinate of the selected 64x64 window.
    pub origin: Coord,
    /// 64x64x3 row-major RGB buffer of the selected segment.
    pub rgb: Vec<u8>,
    /// Shannon entropy of the segment in bits, for diagnostics.
    pub entropy_bits: f64,
}

/// Owns the canvas state and rotates a 64x64 spotlight across its most
/// interesting regions.
pub struct Spotlight {
    config: SpotlightConfig,
    grid: Option<PixelGrid>,
    selector: SegmentSelector,
}

impl Spotlight {
    pub fn new(config: SpotlightConfig) -> Result<Self> {
        let scorer = WindowScorer::new(config.mode.backend()?, config.stride)?;
        Ok(Self {
            config,
            grid: None,
            selector: SegmentSelector::new(scorer),
        })
    }

    /// Replaces the canvas with a full snapshot.
    pub fn load_snapshot(&mut self, width: u32, height: u32, colours: Vec<u8>) -> Result<()> {
        let grid = PixelGrid::new(width, height, colours)?;
        log::info!("loaded {width}x{height} canvas snapshot");
        self.grid = Some(grid);
        Ok(())
    }

    /// Applies one incremental update batch to the canvas.
    pub fn apply_updates(&mut self, changes: &[PixelChange]) -> Result<()> {
        let grid = self.grid.as_mut().ok_or(Error::NoSnapshot)?;
        grid.apply_updates(changes)?;
        log::debug!("applied update batch of {} pixels", changes.len());
        Ok(())
    }

    /// The canvas as last ingested, if any.
    pub fn grid(&self) -> Option<&PixelGrid> {
        self.grid.as_ref()
    }

    /// Runs one full selection cycle and exports the winning segment.
    pub fn next_frame(&mut self) -> Result<Frame> {
        let grid = self.grid.as_ref().ok_or(Error::NoSnapshot)?;
        let started = Instant::now();
        let selection = self.selector.select(grid, self.config.rotation_count)?;
        let entropy_bits = selection.segment.entropy();
        let rgb = selection.segment.to_rgb_buffer();
        log::info!(
            "selected segment ({}, {}), entropy {:.4} bits, took {}ms",
            selection.origin.x,
            selection.origin.y,
            entropy_bits,
            started.elapsed().as_millis()
        );
        Ok(Frame {
            origin: selection.origin,
            rgb,
            entropy_bits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_before_snapshot_are_rejected() {
        let mut spotlight = Spotlight::new(SpotlightConfig::default()).unwrap();
        assert!(spotlight.grid().is_none());
        assert!(matches!(
            spotlight.apply_updates(&[]),
            Err(Error::NoSnapshot)
        ));
        assert!(matches!(spotlight.next_frame(), Err(Error::NoSnapshot)));
    }

    #[test]
    fn next_frame_exports_a_64x64_rgb_buffer() {
        let mut spotlight = Spotlight::new(SpotlightConfig::default()).unwrap();
        let colours: Vec<u8> = (0..128u32 * 128).map(|i| ((i / 3) % 16) as u8).collect();
        spotlight.load_snapshot(128, 128, colours).unwrap();
        let grid = spotlight.grid().expect("snapshot was loaded");
        assert_eq!((grid.width(), grid.height()), (128, 128));

        let frame = spotlight.next_frame().unwrap();
        assert_eq!(frame.rgb.len(), 64 * 64 * 3);
        assert!(frame.origin.x <= 64 && frame.origin.y <= 64);
        assert!((0.0..=4.0).contains(&frame.entropy_bits));
    }
}
