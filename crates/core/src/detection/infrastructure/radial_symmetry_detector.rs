//! Gradient-voting radial symmetry coin detector.
//!
//! Every strong edge votes along its gradient direction, both ways, at each
//! radius in the search range. Edges on a circular silhouette converge on
//! the circle's center, so accumulator peaks are coin candidates. A second
//! accumulator collects vote-weighted radii so each peak also carries a
//! radius estimate. Each candidate is then verified by walking rays out from
//! its center to locate the rim, fitting a circle to the rim points, and
//! rejecting shapes whose rim strays from that circle (squares, texture).

use std::f32::consts::TAU;

use ndarray::Array2;

use crate::detection::domain::coin_detector::{validate_frame, CoinDetector, DetectionError};
use crate::processing::frame_converter::luma;
use crate::shared::constants::{DEFAULT_SEARCH_RESOLUTION, MAX_COINS_PER_FRAME};
use crate::shared::frame::Frame;
use crate::shared::region::{PixelRegion, DEFAULT_IOU_THRESHOLD};

/// Rays cast from a candidate center during verification.
const PERIMETER_SAMPLES: usize = 32;

/// Spacing of gradient samples along a verification ray, in working pixels.
const RAY_STEP: f32 = 0.5;

/// Radial band searched for the rim, relative to the voted radius.
const RIM_BAND: (f32, f32) = (0.6, 1.5);

/// Minimum |cos| between a perimeter gradient and the radial direction.
const RADIAL_ALIGNMENT: f32 = 0.7;

/// Working images smaller than this on either side cannot hold a coin.
const MIN_WORKING_SIDE: usize = 8;

/// Candidates examined per frame, as a multiple of `max_coins`.
const VERIFY_BUDGET_FACTOR: usize = 4;

#[derive(Debug, Clone)]
pub struct RadialSymmetryConfig {
    /// Longest side of the working image. Larger frames are box-averaged
    /// down, which caps the per-frame cost.
    pub search_resolution: u32,
    /// Smallest coin radius as a fraction of the working image's shorter side.
    pub min_radius_frac: f32,
    /// Largest coin radius as a fraction of the working image's shorter side.
    pub max_radius_frac: f32,
    /// Absolute Sobel magnitude below which a frame is considered featureless.
    pub min_edge_strength: f32,
    /// Voting threshold as a fraction of the strongest gradient.
    pub grad_threshold: f32,
    /// Minimum accumulator value for a candidate (fraction of the maximum).
    pub min_vote_frac: f32,
    /// Non-maximum suppression radius in working pixels.
    pub nms_radius: f32,
    /// Fraction of visible rays that must find a radial edge.
    pub min_edge_coverage: f32,
    /// Largest RMS distance of rim points from their fitted circle, relative
    /// to its radius. A square's rim deviates by about 0.1.
    pub max_roundness_error: f32,
    pub max_coins: usize,
}

impl Default for RadialSymmetryConfig {
    fn default() -> Self {
        Self {
            search_resolution: DEFAULT_SEARCH_RESOLUTION,
            min_radius_frac: 0.04,
            max_radius_frac: 0.45,
            min_edge_strength: 40.0,
            grad_threshold: 0.2,
            min_vote_frac: 0.25,
            nms_radius: 4.0,
            min_edge_coverage: 0.6,
            max_roundness_error: 0.05,
            max_coins: MAX_COINS_PER_FRAME,
        }
    }
}

impl RadialSymmetryConfig {
    fn validate(&self) -> Result<(), &'static str> {
        if self.search_resolution < MIN_WORKING_SIDE as u32 * 2 {
            return Err("search_resolution must be >= 16");
        }
        if !(self.min_radius_frac > 0.0 && self.min_radius_frac < self.max_radius_frac) {
            return Err("min_radius_frac must be positive and below max_radius_frac");
        }
        if self.max_radius_frac > 0.5 {
            return Err("max_radius_frac must be <= 0.5");
        }
        if !(0.0..=1.0).contains(&self.grad_threshold) || !(0.0..=1.0).contains(&self.min_vote_frac)
        {
            return Err("grad_threshold and min_vote_frac must be within 0.0-1.0");
        }
        if !(self.min_edge_coverage > 0.0 && self.min_edge_coverage <= 1.0) {
            return Err("min_edge_coverage must be within (0.0, 1.0]");
        }
        if !(self.max_roundness_error > 0.0 && self.max_roundness_error < 1.0) {
            return Err("max_roundness_error must be within (0.0, 1.0)");
        }
        if self.nms_radius < 1.0 {
            return Err("nms_radius must be >= 1");
        }
        if self.max_coins == 0 {
            return Err("max_coins must be >= 1");
        }
        Ok(())
    }
}

/// A voting peak in working-image coordinates.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    x: f32,
    y: f32,
    radius: f32,
    score: f32,
}

pub struct RadialSymmetryDetector {
    config: RadialSymmetryConfig,
}

impl RadialSymmetryDetector {
    pub fn new(config: RadialSymmetryConfig) -> Result<Self, &'static str> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RadialSymmetryConfig {
        &self.config
    }
}

impl Default for RadialSymmetryDetector {
    fn default() -> Self {
        Self {
            config: RadialSymmetryConfig::default(),
        }
    }
}

impl CoinDetector for RadialSymmetryDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<PixelRegion>, DetectionError> {
        validate_frame(frame)?;
        let cfg = &self.config;

        let Some((intensity, scale)) = downsample(frame, cfg.search_resolution) else {
            return Ok(Vec::new());
        };

        let gradients = Gradients::sobel(&intensity);
        if gradients.max_magnitude < cfg.min_edge_strength {
            return Ok(Vec::new());
        }
        let edge_threshold = (cfg.grad_threshold * gradients.max_magnitude).max(cfg.min_edge_strength);

        let (h, w) = intensity.dim();
        let min_side = w.min(h) as f32;
        let r_min = (cfg.min_radius_frac * min_side).max(2.0);
        let r_max = cfg.max_radius_frac * min_side;
        if r_max <= r_min {
            return Ok(Vec::new());
        }

        let (votes, radius_votes) = cast_votes(&gradients, edge_threshold, r_min, r_max);
        let votes = smooth(&votes);
        let radius_votes = smooth(&radius_votes);
        let candidates = find_peaks(&votes, &radius_votes, cfg.min_vote_frac, cfg.nms_radius);

        let s = scale as f64;
        let regions: Vec<PixelRegion> = candidates
            .iter()
            .take(cfg.max_coins * VERIFY_BUDGET_FACTOR)
            .filter_map(|c| fit_rim(&gradients, c, edge_threshold))
            .filter(|fit| {
                fit.coverage >= cfg.min_edge_coverage
                    && fit.roundness_error <= cfg.max_roundness_error
            })
            .map(|fit| {
                PixelRegion::around_circle(
                    (fit.x as f64 + 0.5) * s,
                    (fit.y as f64 + 0.5) * s,
                    fit.radius as f64 * s,
                    frame.width(),
                    frame.height(),
                )
            })
            .collect();

        let mut regions = PixelRegion::deduplicate(&regions, DEFAULT_IOU_THRESHOLD);
        regions.truncate(cfg.max_coins);

        log::debug!(
            "Frame {}: {} candidates, {} coins (working {}x{}, scale {})",
            frame.index(),
            candidates.len(),
            regions.len(),
            w,
            h,
            scale
        );
        Ok(regions)
    }
}

/// Integer block size that brings the longer side within `search_resolution`.
fn working_scale(width: u32, height: u32, search_resolution: u32) -> usize {
    width.max(height).div_ceil(search_resolution).max(1) as usize
}

/// Box-averages the frame into a single-channel working image.
///
/// Returns `None` when the result would be too small to search.
fn downsample(frame: &Frame, search_resolution: u32) -> Option<(Array2<f32>, usize)> {
    let scale = working_scale(frame.width(), frame.height(), search_resolution);
    let w = frame.width() as usize / scale;
    let h = frame.height() as usize / scale;
    if w < MIN_WORKING_SIDE || h < MIN_WORKING_SIDE {
        return None;
    }

    let pixels = frame.as_ndarray()?;
    let offsets = frame.format().rgb_offsets();
    let norm = 1.0 / (scale * scale) as f32;

    let mut out = Array2::<f32>::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0u32;
            for sy in y * scale..(y + 1) * scale {
                for sx in x * scale..(x + 1) * scale {
                    sum += match offsets {
                        Some([r, g, b]) => luma(
                            pixels[[sy, sx, r]],
                            pixels[[sy, sx, g]],
                            pixels[[sy, sx, b]],
                        ) as u32,
                        None => pixels[[sy, sx, 0]] as u32,
                    };
                }
            }
            out[[y, x]] = sum as f32 * norm;
        }
    }
    Some((out, scale))
}

struct Gradients {
    gx: Array2<f32>,
    gy: Array2<f32>,
    max_magnitude: f32,
}

impl Gradients {
    /// 3x3 Sobel over the interior; border pixels keep a zero gradient.
    fn sobel(img: &Array2<f32>) -> Self {
        let (h, w) = img.dim();
        let mut gx = Array2::<f32>::zeros((h, w));
        let mut gy = Array2::<f32>::zeros((h, w));
        let mut max_magnitude = 0.0f32;

        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let p = |dy: usize, dx: usize| img[[y + dy - 1, x + dx - 1]];
                let sx = (p(0, 2) + 2.0 * p(1, 2) + p(2, 2)) - (p(0, 0) + 2.0 * p(1, 0) + p(2, 0));
                let sy = (p(2, 0) + 2.0 * p(2, 1) + p(2, 2)) - (p(0, 0) + 2.0 * p(0, 1) + p(0, 2));
                gx[[y, x]] = sx;
                gy[[y, x]] = sy;
                max_magnitude = max_magnitude.max((sx * sx + sy * sy).sqrt());
            }
        }

        Self {
            gx,
            gy,
            max_magnitude,
        }
    }

    fn at(&self, y: usize, x: usize) -> (f32, f32, f32) {
        let gx = self.gx[[y, x]];
        let gy = self.gy[[y, x]];
        (gx, gy, (gx * gx + gy * gy).sqrt())
    }

    /// Bilinear gradient at a sub-pixel position. Needs `x <= w - 2` and
    /// `y <= h - 2`.
    fn sample(&self, x: f32, y: f32) -> (f32, f32, f32) {
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;
        let lerp = |a: &Array2<f32>| {
            a[[y0, x0]] * (1.0 - fx) * (1.0 - fy)
                + a[[y0, x0 + 1]] * fx * (1.0 - fy)
                + a[[y0 + 1, x0]] * (1.0 - fx) * fy
                + a[[y0 + 1, x0 + 1]] * fx * fy
        };
        let gx = lerp(&self.gx);
        let gy = lerp(&self.gy);
        (gx, gy, (gx * gx + gy * gy).sqrt())
    }
}

/// Returns `(votes, radius-weighted votes)`.
fn cast_votes(
    gradients: &Gradients,
    threshold: f32,
    r_min: f32,
    r_max: f32,
) -> (Array2<f32>, Array2<f32>) {
    let (h, w) = gradients.gx.dim();
    let mut votes = Array2::<f32>::zeros((h, w));
    let mut radius_votes = Array2::<f32>::zeros((h, w));

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let (gx, gy, mag) = gradients.at(y, x);
            if mag < threshold {
                continue;
            }
            let dx = gx / mag;
            let dy = gy / mag;

            for sign in [-1.0f32, 1.0] {
                let mut r = r_min;
                while r <= r_max {
                    let vx = x as f32 + sign * dx * r;
                    let vy = y as f32 + sign * dy * r;
                    bilinear_add(&mut votes, vx, vy, mag);
                    bilinear_add(&mut radius_votes, vx, vy, mag * r);
                    r += 1.0;
                }
            }
        }
    }
    (votes, radius_votes)
}

/// Deposit a weighted vote using bilinear interpolation.
#[inline]
fn bilinear_add(accum: &mut Array2<f32>, x: f32, y: f32, weight: f32) {
    if x < 0.0 || y < 0.0 {
        return;
    }
    let (h, w) = accum.dim();
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    if x0 + 1 >= w || y0 + 1 >= h {
        return;
    }
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    accum[[y0, x0]] += weight * (1.0 - fx) * (1.0 - fy);
    accum[[y0, x0 + 1]] += weight * fx * (1.0 - fy);
    accum[[y0 + 1, x0]] += weight * (1.0 - fx) * fy;
    accum[[y0 + 1, x0 + 1]] += weight * fx * fy;
}

/// Separable [1, 2, 1] / 4 smoothing with clamped borders.
fn smooth(src: &Array2<f32>) -> Array2<f32> {
    let (h, w) = src.dim();
    let mut tmp = Array2::<f32>::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let left = src[[y, x.saturating_sub(1)]];
            let right = src[[y, (x + 1).min(w - 1)]];
            tmp[[y, x]] = 0.25 * left + 0.5 * src[[y, x]] + 0.25 * right;
        }
    }

    let mut out = Array2::<f32>::zeros((h, w));
    for y in 0..h {
        let up = y.saturating_sub(1);
        let down = (y + 1).min(h - 1);
        for x in 0..w {
            out[[y, x]] = 0.25 * tmp[[up, x]] + 0.5 * tmp[[y, x]] + 0.25 * tmp[[down, x]];
        }
    }
    out
}

/// Local maxima above `min_vote_frac` of the global maximum, strongest first.
///
/// Equal scores keep raster order, so results are deterministic.
fn find_peaks(
    votes: &Array2<f32>,
    radius_votes: &Array2<f32>,
    min_vote_frac: f32,
    nms_radius: f32,
) -> Vec<Candidate> {
    let (h, w) = votes.dim();
    let max_val = votes.iter().copied().fold(0.0f32, f32::max);
    if max_val <= 0.0 {
        return Vec::new();
    }
    let threshold = min_vote_frac * max_val;

    let mut peaks = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let val = votes[[y, x]];
            if val <= 0.0 || val < threshold || !is_local_max(votes, y, x, nms_radius) {
                continue;
            }
            let (cx, cy) = refine_centroid(votes, y, x);
            peaks.push(Candidate {
                x: cx,
                y: cy,
                radius: radius_votes[[y, x]] / val,
                score: val,
            });
        }
    }

    peaks.sort_by(|a, b| b.score.total_cmp(&a.score));
    peaks
}

fn is_local_max(votes: &Array2<f32>, y: usize, x: usize, nms_radius: f32) -> bool {
    let (h, w) = votes.dim();
    let val = votes[[y, x]];
    let idx = y * w + x;
    let r = nms_radius.ceil() as isize;
    let r_sq = nms_radius * nms_radius;

    for dy in -r..=r {
        for dx in -r..=r {
            if (dx == 0 && dy == 0) || (dx * dx + dy * dy) as f32 > r_sq {
                continue;
            }
            let ny = y as isize + dy;
            let nx = x as isize + dx;
            if ny < 0 || nx < 0 || ny >= h as isize || nx >= w as isize {
                continue;
            }
            let (ny, nx) = (ny as usize, nx as usize);
            let other = votes[[ny, nx]];
            if other > val || (other == val && ny * w + nx < idx) {
                return false;
            }
        }
    }
    true
}

/// Sub-pixel peak position from the 3x3 weighted centroid.
fn refine_centroid(votes: &Array2<f32>, y: usize, x: usize) -> (f32, f32) {
    let (h, w) = votes.dim();
    let mut sum = 0.0f32;
    let mut sx = 0.0f32;
    let mut sy = 0.0f32;
    for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
        for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
            let v = votes[[ny, nx]];
            sum += v;
            sx += v * nx as f32;
            sy += v * ny as f32;
        }
    }
    if sum <= 0.0 {
        return (x as f32, y as f32);
    }
    (sx / sum, sy / sum)
}

/// Circle fitted to the rim points found around a candidate, in working
/// image coordinates.
#[derive(Debug, Clone, Copy)]
struct RimFit {
    x: f32,
    y: f32,
    radius: f32,
    /// Fraction of visible rays that found a radial edge.
    coverage: f32,
    /// RMS distance of the rim points from the circle, over its radius.
    roundness_error: f32,
}

/// Walks `PERIMETER_SAMPLES` rays out from the candidate center, takes the
/// strongest radially oriented edge on each as a rim point, and fits a
/// circle through them.
///
/// `None` when too few rays stay inside the image or no circle fits.
fn fit_rim(gradients: &Gradients, candidate: &Candidate, threshold: f32) -> Option<RimFit> {
    let (h, w) = gradients.gx.dim();
    let r_lo = (candidate.radius * RIM_BAND.0).max(1.0);
    let r_hi = candidate.radius * RIM_BAND.1 + 1.0;
    let inside = |x: f32, y: f32| x >= 1.0 && y >= 1.0 && x <= (w - 2) as f32 && y <= (h - 2) as f32;

    let mut visible = 0usize;
    let mut points = Vec::with_capacity(PERIMETER_SAMPLES);
    for i in 0..PERIMETER_SAMPLES {
        let theta = i as f32 * TAU / PERIMETER_SAMPLES as f32;
        let (ux, uy) = (theta.cos(), theta.sin());
        let near = (candidate.x + ux * r_lo, candidate.y + uy * r_lo);
        let far = (candidate.x + ux * r_hi, candidate.y + uy * r_hi);
        if !inside(near.0, near.1) || !inside(far.0, far.1) {
            continue;
        }
        visible += 1;
        if let Some(d) = rim_distance(gradients, candidate, (ux, uy), (r_lo, r_hi), threshold) {
            points.push((ux * d, uy * d));
        }
    }

    if visible < PERIMETER_SAMPLES / 2 || points.len() < 3 {
        return None;
    }
    let (dx, dy, radius) = fit_circle(&points)?;
    let sq_error: f32 = points
        .iter()
        .map(|(px, py)| {
            let off = ((px - dx).powi(2) + (py - dy).powi(2)).sqrt() - radius;
            off * off
        })
        .sum();

    Some(RimFit {
        x: candidate.x + dx,
        y: candidate.y + dy,
        radius,
        coverage: points.len() as f32 / visible as f32,
        roundness_error: (sq_error / points.len() as f32).sqrt() / radius,
    })
}

/// Distance along one ray to its strongest radially oriented edge, refined
/// to sub-sample precision with a parabola through the peak.
fn rim_distance(
    gradients: &Gradients,
    candidate: &Candidate,
    (ux, uy): (f32, f32),
    (r_lo, r_hi): (f32, f32),
    threshold: f32,
) -> Option<f32> {
    let steps = ((r_hi - r_lo) / RAY_STEP) as usize + 1;
    let response: Vec<f32> = (0..steps)
        .map(|k| {
            let r = r_lo + k as f32 * RAY_STEP;
            let (gx, gy, mag) = gradients.sample(candidate.x + ux * r, candidate.y + uy * r);
            if mag >= threshold && (gx * ux + gy * uy).abs() >= RADIAL_ALIGNMENT * mag {
                mag
            } else {
                0.0
            }
        })
        .collect();

    let (k, &peak) = response
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))?;
    if peak <= 0.0 {
        return None;
    }
    let offset = if k > 0 && k + 1 < response.len() {
        let (before, after) = (response[k - 1], response[k + 1]);
        let curvature = before - 2.0 * peak + after;
        if curvature < 0.0 {
            (0.5 * (before - after) / curvature).clamp(-0.5, 0.5)
        } else {
            0.0
        }
    } else {
        0.0
    };
    Some(r_lo + (k as f32 + offset) * RAY_STEP)
}

/// Algebraic least-squares circle through `points`: solves
/// `x² + y² + a·x + b·y + c = 0` and returns `(cx, cy, radius)`.
fn fit_circle(points: &[(f32, f32)]) -> Option<(f32, f32, f32)> {
    let mut m = [[0.0f64; 3]; 3];
    let mut v = [0.0f64; 3];
    for &(x, y) in points {
        let (x, y) = (x as f64, y as f64);
        let row = [x, y, 1.0];
        let z = x * x + y * y;
        for i in 0..3 {
            for j in 0..3 {
                m[i][j] += row[i] * row[j];
            }
            v[i] -= row[i] * z;
        }
    }

    let det = det3(&m);
    if det.abs() < 1e-9 {
        return None;
    }
    // Cramer's rule.
    let solve = |col: usize| {
        let mut mc = m;
        for (r, value) in v.iter().enumerate() {
            mc[r][col] = *value;
        }
        det3(&mc) / det
    };
    let (a, b, c) = (solve(0), solve(1), solve(2));
    let (cx, cy) = (-a / 2.0, -b / 2.0);
    let r_sq = cx * cx + cy * cy - c;
    if !r_sq.is_finite() || r_sq <= 0.0 {
        return None;
    }
    Some((cx as f32, cy as f32, r_sq.sqrt() as f32))
}

fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::infrastructure::synthetic_source::{render_discs, Disc};
    use crate::shared::frame::PixelFormat;
    use rstest::rstest;
    use std::time::Duration;

    fn disc_frame(width: u32, height: u32, discs: &[Disc], format: PixelFormat) -> Frame {
        render_discs(width, height, discs, format, 0, Duration::ZERO)
    }

    fn assert_near(region: &PixelRegion, expected: (i32, i32, i32, i32), tol: i32) {
        let (x, y, w, h) = expected;
        assert!(
            (region.x - x).abs() <= tol
                && (region.y - y).abs() <= tol
                && (region.width - w).abs() <= tol * 2
                && (region.height - h).abs() <= tol * 2,
            "region {region:?} not within {tol}px of {expected:?}"
        );
    }

    #[rstest]
    #[case::gray(PixelFormat::Gray8)]
    #[case::rgb(PixelFormat::Rgb8)]
    #[case::bgra(PixelFormat::Bgra8)]
    fn test_uniform_frame_yields_nothing(#[case] format: PixelFormat) {
        let frame = disc_frame(320, 240, &[], format);
        let mut detector = RadialSymmetryDetector::default();
        assert!(detector.detect(&frame).unwrap().is_empty());
    }

    #[rstest]
    #[case::gray(PixelFormat::Gray8)]
    #[case::rgb(PixelFormat::Rgb8)]
    #[case::bgra(PixelFormat::Bgra8)]
    fn test_single_coin_found(#[case] format: PixelFormat) {
        let frame = disc_frame(200, 200, &[Disc::still(100.0, 100.0, 30.0)], format);
        let mut detector = RadialSymmetryDetector::default();
        let regions = detector.detect(&frame).unwrap();
        assert_eq!(regions.len(), 1, "{regions:?}");
        assert_near(&regions[0], (70, 70, 60, 60), 4);
    }

    #[test]
    fn test_two_separate_coins_found() {
        let discs = [Disc::still(60.0, 60.0, 22.0), Disc::still(180.0, 120.0, 22.0)];
        let frame = disc_frame(240, 180, &discs, PixelFormat::Rgb8);
        let mut detector = RadialSymmetryDetector::default();
        let mut regions = detector.detect(&frame).unwrap();
        assert_eq!(regions.len(), 2, "{regions:?}");
        regions.sort_by_key(|r| r.x);
        assert_near(&regions[0], (38, 38, 44, 44), 4);
        assert_near(&regions[1], (158, 98, 44, 44), 4);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let discs = [Disc::still(70.0, 50.0, 18.0), Disc::still(150.0, 110.0, 25.0)];
        let frame = disc_frame(220, 160, &discs, PixelFormat::Rgb8);
        let mut detector = RadialSymmetryDetector::default();
        let first = detector.detect(&frame).unwrap();
        let second = detector.detect(&frame).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_regions_stay_inside_frame() {
        let frame = disc_frame(200, 200, &[Disc::still(100.0, 100.0, 30.0)], PixelFormat::Rgb8);
        let mut detector = RadialSymmetryDetector::default();
        for r in detector.detect(&frame).unwrap() {
            assert!(r.x >= 0 && r.y >= 0);
            assert!(r.x + r.width <= 200 && r.y + r.height <= 200);
        }
    }

    #[test]
    fn test_large_frame_searched_at_bounded_resolution() {
        assert_eq!(working_scale(1920, 1080, 160), 12);
        assert_eq!(working_scale(100, 60, 160), 1);

        let frame = disc_frame(1280, 720, &[Disc::still(640.0, 360.0, 120.0)], PixelFormat::Rgb8);
        let (img, scale) = downsample(&frame, 160).unwrap();
        assert_eq!(scale, 8);
        assert_eq!(img.dim(), (90, 160));

        let mut detector = RadialSymmetryDetector::default();
        let regions = detector.detect(&frame).unwrap();
        assert_eq!(regions.len(), 1);
        assert_near(&regions[0], (520, 240, 240, 240), 16);
    }

    #[test]
    fn test_tiny_frame_yields_nothing() {
        let frame = disc_frame(6, 6, &[], PixelFormat::Gray8);
        let mut detector = RadialSymmetryDetector::default();
        assert!(detector.detect(&frame).unwrap().is_empty());
    }

    #[rstest]
    #[case::large(60..140)]
    #[case::small(70..130)]
    #[case::off_center(40..110)]
    fn test_square_is_not_a_coin(#[case] side: std::ops::Range<usize>) {
        let mut data = vec![30u8; 200 * 200];
        for y in side.clone() {
            for x in side.clone() {
                data[y * 200 + x] = 200;
            }
        }
        let frame = Frame::new(data, 200, 200, PixelFormat::Gray8, 0, Duration::ZERO);
        let mut detector = RadialSymmetryDetector::default();
        assert!(detector.detect(&frame).unwrap().is_empty());
    }

    #[test]
    fn test_fit_circle_recovers_offset_circle() {
        let points: Vec<(f32, f32)> = (0..24)
            .map(|i| {
                let t = i as f32 * TAU / 24.0;
                (3.0 + 10.0 * t.cos(), -2.0 + 10.0 * t.sin())
            })
            .collect();
        let (cx, cy, r) = fit_circle(&points).unwrap();
        assert!((cx - 3.0).abs() < 1e-3 && (cy + 2.0).abs() < 1e-3, "({cx}, {cy})");
        assert!((r - 10.0).abs() < 1e-3, "{r}");
    }

    #[test]
    fn test_fit_circle_rejects_collinear_points() {
        let points = [(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)];
        assert!(fit_circle(&points).is_none());
    }

    #[test]
    fn test_rim_fit_separates_disc_from_square() {
        let disc = disc_frame(100, 100, &[Disc::still(50.0, 50.0, 20.0)], PixelFormat::Gray8);
        let mut square = vec![30u8; 100 * 100];
        for y in 30..70 {
            for x in 30..70 {
                square[y * 100 + x] = 200;
            }
        }
        let square = Frame::new(square, 100, 100, PixelFormat::Gray8, 0, Duration::ZERO);

        let roundness = |frame: &Frame| {
            let (img, _) = downsample(frame, 160).unwrap();
            let gradients = Gradients::sobel(&img);
            let candidate = Candidate {
                x: 49.5,
                y: 49.5,
                radius: 21.0,
                score: 1.0,
            };
            fit_rim(&gradients, &candidate, 40.0).unwrap()
        };

        let round = roundness(&disc);
        assert!(round.roundness_error < 0.035, "{round:?}");
        assert!(round.coverage > 0.9, "{round:?}");
        assert!((round.radius - 20.0).abs() < 1.0, "{round:?}");

        let boxy = roundness(&square);
        assert!(boxy.roundness_error > 0.07, "{boxy:?}");
    }

    #[test]
    fn test_corrupt_buffer_is_a_failure() {
        let frame = Frame::new(vec![0u8; 100], 20, 20, PixelFormat::Rgb8, 0, Duration::ZERO);
        let mut detector = RadialSymmetryDetector::default();
        assert_eq!(
            detector.detect(&frame),
            Err(DetectionError::Corrupt {
                expected: 1200,
                actual: 100
            })
        );
    }

    #[test]
    fn test_unknown_layout_is_a_failure() {
        let frame = disc_frame(20, 20, &[], PixelFormat::Other(7));
        let mut detector = RadialSymmetryDetector::default();
        assert_eq!(
            detector.detect(&frame),
            Err(DetectionError::UnreadableFormat(PixelFormat::Other(7)))
        );
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(RadialSymmetryConfig::default().validate().is_ok());
    }

    #[rstest]
    #[case::tiny_resolution(RadialSymmetryConfig { search_resolution: 8, ..Default::default() })]
    #[case::inverted_radii(RadialSymmetryConfig { min_radius_frac: 0.3, max_radius_frac: 0.2, ..Default::default() })]
    #[case::radius_too_large(RadialSymmetryConfig { max_radius_frac: 0.8, ..Default::default() })]
    #[case::zero_coverage(RadialSymmetryConfig { min_edge_coverage: 0.0, ..Default::default() })]
    #[case::zero_roundness(RadialSymmetryConfig { max_roundness_error: 0.0, ..Default::default() })]
    #[case::no_coins(RadialSymmetryConfig { max_coins: 0, ..Default::default() })]
    fn test_invalid_config_rejected(#[case] config: RadialSymmetryConfig) {
        assert!(RadialSymmetryDetector::new(config).is_err());
    }
}
