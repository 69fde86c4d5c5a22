pub const DEFAULT_IOU_THRESHOLD: f64 = 0.3;

/// Axis-aligned rectangle in frame pixel space (origin at the frame's
/// top-left corner, units are frame pixels).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRegion {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square bounding box of a circle, clamped to the frame.
    pub fn around_circle(cx: f64, cy: f64, radius: f64, frame_w: u32, frame_h: u32) -> Self {
        let x1 = (cx - radius).floor().max(0.0) as i32;
        let y1 = (cy - radius).floor().max(0.0) as i32;
        let x2 = ((cx + radius).ceil() as i32).min(frame_w as i32);
        let y2 = ((cy + radius).ceil() as i32).min(frame_h as i32);
        Self {
            x: x1,
            y: y1,
            width: (x2 - x1).max(0),
            height: (y2 - y1).max(0),
        }
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    fn right(&self) -> i32 {
        self.x + self.width
    }

    fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Overlapping area with `other`; zero when they only touch.
    pub fn overlap_area(&self, other: &PixelRegion) -> i64 {
        let w = self.right().min(other.right()) - self.x.max(other.x);
        let h = self.bottom().min(other.bottom()) - self.y.max(other.y);
        if w <= 0 || h <= 0 {
            0
        } else {
            w as i64 * h as i64
        }
    }

    /// Intersection over union. Degenerate regions never overlap.
    pub fn iou(&self, other: &PixelRegion) -> f64 {
        let overlap = self.overlap_area(other);
        if overlap == 0 {
            return 0.0;
        }
        overlap as f64 / (self.area() + other.area() - overlap) as f64
    }

    /// Drops every region whose IoU with an earlier survivor exceeds
    /// `iou_threshold`, so earlier entries win ties.
    pub fn deduplicate(regions: &[PixelRegion], iou_threshold: f64) -> Vec<PixelRegion> {
        regions.iter().fold(Vec::with_capacity(regions.len()), |mut kept, candidate| {
            if kept.iter().all(|k: &PixelRegion| candidate.iou(k) <= iou_threshold) {
                kept.push(*candidate);
            }
            kept
        })
    }
}

/// Axis-aligned rectangle in presentation-surface space (origin at the
/// surface's top-left corner, units are surface points).
///
/// Coordinates may fall outside the surface under aspect-fill.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PresentationRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PresentationRegion {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Intersection with a `surface_w` x `surface_h` surface, or `None` when
    /// the region lies entirely off-surface.
    ///
    /// The pipeline never clips; this exists for sinks that want to.
    pub fn clipped_to(&self, surface_w: f64, surface_h: f64) -> Option<PresentationRegion> {
        let x1 = self.x.max(0.0);
        let y1 = self.y.max(0.0);
        let x2 = (self.x + self.width).min(surface_w);
        let y2 = (self.y + self.height).min(surface_h);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(PresentationRegion::new(x1, y1, x2 - x1, y2 - y1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn region(x: i32, y: i32, w: i32, h: i32) -> PixelRegion {
        PixelRegion::new(x, y, w, h)
    }

    // ── Overlap ──────────────────────────────────────────────────────

    #[rstest]
    #[case::same(region(10, 10, 60, 60), region(10, 10, 60, 60), 1.0)]
    #[case::disjoint(region(0, 0, 40, 40), region(90, 90, 40, 40), 0.0)]
    #[case::side_by_side(region(0, 0, 40, 40), region(40, 0, 40, 40), 0.0)]
    #[case::half_shifted(region(0, 0, 60, 60), region(30, 0, 60, 60), 1800.0 / 5400.0)]
    #[case::nested(region(0, 0, 40, 40), region(10, 10, 20, 20), 400.0 / 1600.0)]
    #[case::empty_width(region(0, 0, 0, 60), region(0, 0, 30, 30), 0.0)]
    #[case::empty_height(region(0, 0, 60, 0), region(0, 0, 30, 30), 0.0)]
    fn test_iou(#[case] a: PixelRegion, #[case] b: PixelRegion, #[case] expected: f64) {
        assert_relative_eq!(a.iou(&b), expected);
        assert_relative_eq!(b.iou(&a), expected);
    }

    #[test]
    fn test_overlap_area() {
        assert_eq!(region(0, 0, 10, 10).overlap_area(&region(5, 5, 10, 10)), 25);
        assert_eq!(region(0, 0, 10, 10).overlap_area(&region(10, 10, 5, 5)), 0);
    }

    // ── Deduplication ────────────────────────────────────────────────

    #[test]
    fn test_deduplicate_nothing_in_nothing_out() {
        assert!(PixelRegion::deduplicate(&[], DEFAULT_IOU_THRESHOLD).is_empty());
    }

    #[test]
    fn test_deduplicate_earlier_region_survives() {
        let strong = region(20, 20, 60, 60);
        let echo = region(24, 22, 60, 60);
        let result = PixelRegion::deduplicate(&[strong, echo], DEFAULT_IOU_THRESHOLD);
        assert_eq!(result, vec![strong]);
    }

    #[test]
    fn test_deduplicate_adjacent_coins_both_kept() {
        let coins = [region(0, 0, 40, 40), region(36, 0, 40, 40), region(200, 0, 40, 40)];
        let result = PixelRegion::deduplicate(&coins, DEFAULT_IOU_THRESHOLD);
        assert_eq!(result, coins.to_vec());
    }

    // ── Circle bounds ────────────────────────────────────────────────

    #[test]
    fn test_around_circle_interior() {
        let r = PixelRegion::around_circle(50.0, 40.0, 10.0, 200, 200);
        assert_eq!(r, region(40, 30, 20, 20));
    }

    #[test]
    fn test_around_circle_clamped_at_frame_edges() {
        let r = PixelRegion::around_circle(5.0, 95.0, 10.0, 100, 100);
        assert_eq!(r, region(0, 85, 15, 15));
    }

    // ── Presentation clipping ────────────────────────────────────────

    #[test]
    fn test_clipped_to_partially_outside() {
        let r = PresentationRegion::new(-10.0, 20.0, 30.0, 30.0);
        let clipped = r.clipped_to(100.0, 100.0).unwrap();
        assert_relative_eq!(clipped.x, 0.0);
        assert_relative_eq!(clipped.width, 20.0);
        assert_relative_eq!(clipped.height, 30.0);
    }

    #[test]
    fn test_clipped_to_fully_outside_is_none() {
        let r = PresentationRegion::new(120.0, 20.0, 30.0, 30.0);
        assert!(r.clipped_to(100.0, 100.0).is_none());
    }

    #[test]
    fn test_center() {
        let (cx, cy) = PresentationRegion::new(10.0, 20.0, 4.0, 6.0).center();
        assert_relative_eq!(cx, 12.0);
        assert_relative_eq!(cy, 23.0);
    }
}
