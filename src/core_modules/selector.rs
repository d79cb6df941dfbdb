// THEORY:
// The `SegmentSelector` is the only state machine in the engine. It drives a
// `WindowScorer` over the current grid, then scans the combined score grid in
// row-major order for the best-scoring position that does not collide with
// any of the last few selections. The collision test intentionally uses
// strict inequalities, so two windows that are exactly edge-adjacent still
// count as overlapping; that 1-pixel-stricter-than-geometric behavior is part
// of the contract and must not be "fixed" here.
//
// The history is a bounded most-recent-first deque of plain coordinates. It
// transitions in exactly one way: truncate to `rotation_count - 1` entries,
// then prepend the winner. Over consecutive calls on a static canvas this
// realizes a round-robin rotation across the `rotation_count` most
// interesting disjoint regions.

use crate::core_modules::pixel_grid::PixelGrid;
use crate::core_modules::scorer::{WINDOW_SIZE, WindowScorer};
use crate::error::Result;
use std::collections::VecDeque;

/// Top-left coordinate of a 64x64 window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coord {
    pub x: u32,
    pub y: u32,
}

/// One selection result: the winning coordinate and the cropped segment.
pub struct Selection {
    pub origin: Coord,
    pub segment: PixelGrid,
}

/// Rotates through interesting windows of the canvas, excluding the most
/// recently shown ones.
pub struct SegmentSelector {
    scorer: WindowScorer,
    /// Most-recent-first; bounded by the rotation count passed to `select`.
    history: VecDeque<Coord>,
}

impl SegmentSelector {
    pub fn new(scorer: WindowScorer) -> Self {
        Self {
            scorer,
            history: VecDeque::new(),
        }
    }

    /// Previously selected coordinates, most recent first.
    pub fn history(&self) -> &VecDeque<Coord> {
        &self.history
    }

    /// Picks the highest-scoring 64x64 window that lies clear of the last
    /// `rotation_count` selections and returns its crop.
    ///
    /// If every position is excluded or scores zero, the default (0, 0)
    /// window is returned. Ties keep the earliest position in row-major scan
    /// order.
    pub fn select(&mut self, grid: &PixelGrid, rotation_count: usize) -> Result<Selection> {
        let scores = self.scorer.combined(grid)?;

        let mut best = Coord { x: 0, y: 0 };
        let mut best_score = 0.0_f64;

        for y in 0..scores.height() {
            for x in 0..scores.width() {
                // Strict inequalities: edge-adjacent windows are not exempt.
                let outside = self.history.iter().all(|last| {
                    x + WINDOW_SIZE < last.x
                        || x > last.x + WINDOW_SIZE
                        || y + WINDOW_SIZE < last.y
                        || y > last.y + WINDOW_SIZE
                });

                if outside && scores.get(x, y) > best_score {
                    best_score = scores.get(x, y);
                    best = Coord { x, y };
                }
            }
        }

        self.history.truncate(rotation_count.saturating_sub(1));
        self.history.push_front(best);

        let segment = grid.crop(best.x, best.y, WINDOW_SIZE, WINDOW_SIZE)?;
        Ok(Selection {
            origin: best,
            segment,
        })
    }
}
