// ==============================================================================
// inverse.rs — FORCE -> SLIP INVERSE MAPPING (precomputed lookup table)
// ==============================================================================
// Answers "what (kappa, alpha) produces this (Fx, Fy), and is it achievable"
// without running a nonlinear solver on the hot path.
//
// Build (once per bucket): discretize (Fz, temperature) into buckets, sample
// a dense (kappa, alpha) grid at the bucket-center operating point through
// the full steady-state + combined-slip pipeline, and keep the convex hull
// of the achieved force points as the feasibility boundary. Each cell also
// records the wear it was built at; a query whose wear has drifted past a
// threshold rebuilds the cell. Rebuilds are atomic: the new cell is built
// completely, then swapped into the map.
//
// Query: nearest grid sample under the Euclidean force-space norm, then a
// few clamped Gauss-Newton steps using a finite-difference Jacobian taken
// from the neighboring samples. Requests outside the hull are projected onto
// the boundary and answered with the closest achievable point, flagged
// infeasible, never fabricated.
// ==============================================================================

use std::collections::HashMap;

use log::debug;
use nalgebra::{Matrix2, Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::combined::{CombinedSlipConfig, allocate};
use crate::params::ParameterSet;
use crate::steady_state::uncombined_forces;
use crate::types::FZ_MIN;

#[derive(Debug, Clone, Copy)]
pub struct InverseTableConfig {
    pub fz_bucket: f32,    // load bucket width [N]
    pub temp_bucket: f32,  // temperature bucket width [°C]
    pub kappa_range: f32,  // grid spans ±kappa_range
    pub alpha_range: f32,  // grid spans ±alpha_range [rad]
    pub grid_n: usize,     // samples per axis (odd keeps zero slip on-grid)
    pub wear_rebuild_threshold: f32,
}

impl Default for InverseTableConfig {
    fn default() -> Self {
        Self {
            fz_bucket: 500.0,
            temp_bucket: 10.0,
            kappa_range: 0.3,
            alpha_range: 0.45,
            grid_n: 61,
            wear_rebuild_threshold: 0.05,
        }
    }
}

/// Discretized operating point. Buckets are centered: key = round(value/width).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub fz: i32,
    pub temp: i32,
}

#[derive(Debug, Clone, Copy)]
struct GridSample {
    kappa: f32,
    alpha: f32,
    force: Point2<f32>,
}

/// One fully built bucket: the sampled grid plus its feasibility boundary.
pub struct TableCell {
    fz_center: f32,
    temp_center: f32,
    wear_at_build: f32,
    grid_n: usize,
    samples: Vec<GridSample>, // row-major, kappa index outer
    hull: Vec<Point2<f32>>,   // CCW convex hull of achieved forces
}

/// Result of one inverse query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InverseSolution {
    /// Achieved force at the returned slip (equals the request when feasible,
    /// up to grid interpolation error; the boundary point otherwise).
    pub fx: f32,
    pub fy: f32,
    /// Generating slip pair.
    pub kappa: f32,
    pub alpha: f32,
    /// False when the request lies outside the achievable region.
    pub feasible: bool,
}

pub struct InverseTable {
    cfg: InverseTableConfig,
    cells: HashMap<BucketKey, TableCell>,
}

impl InverseTable {
    pub fn new(cfg: InverseTableConfig) -> Self {
        Self {
            cfg,
            cells: HashMap::new(),
        }
    }

    pub fn bucket_key(&self, fz: f32, temp: f32) -> BucketKey {
        BucketKey {
            fz: (fz / self.cfg.fz_bucket).round() as i32,
            temp: (temp / self.cfg.temp_bucket).round() as i32,
        }
    }

    pub fn built_cells(&self) -> usize {
        self.cells.len()
    }

    /// Inverse query. Builds (or rebuilds, on material wear drift) the bucket
    /// cell on demand, then looks up the request.
    pub fn solve(
        &mut self,
        p: &ParameterSet,
        combined: &CombinedSlipConfig,
        fz: f32,
        temp: f32,
        wear: f32,
        fx_req: f32,
        fy_req: f32,
    ) -> InverseSolution {
        let key = self.bucket_key(fz, temp);

        let stale = match self.cells.get(&key) {
            Some(cell) => (cell.wear_at_build - wear).abs() > self.cfg.wear_rebuild_threshold,
            None => true,
        };
        if stale {
            let cell = build_cell(p, combined, &self.cfg, key, wear);
            // complete-or-fail: the old cell stays visible until this insert
            self.cells.insert(key, cell);
        }

        let cell = &self.cells[&key];
        lookup(p, combined, &self.cfg, cell, Point2::new(fx_req, fy_req))
    }
}

fn build_cell(
    p: &ParameterSet,
    combined: &CombinedSlipConfig,
    cfg: &InverseTableConfig,
    key: BucketKey,
    wear: f32,
) -> TableCell {
    let n = cfg.grid_n.max(3);
    let fz_center = key.fz as f32 * cfg.fz_bucket;
    let temp_center = key.temp as f32 * cfg.temp_bucket;

    let mut samples = Vec::with_capacity(n * n);
    for i in 0..n {
        let kappa = lerp(-cfg.kappa_range, cfg.kappa_range, i as f32 / (n - 1) as f32);
        for j in 0..n {
            let alpha = lerp(-cfg.alpha_range, cfg.alpha_range, j as f32 / (n - 1) as f32);
            let force = evaluate(p, combined, fz_center, temp_center, wear, kappa, alpha);
            samples.push(GridSample {
                kappa,
                alpha,
                force,
            });
        }
    }

    let hull = convex_hull(samples.iter().map(|s| s.force));

    debug!(
        "built inverse cell fz={fz_center:.0}N temp={temp_center:.0}C wear={wear:.3} \
         ({n}x{n} grid, {} hull vertices)",
        hull.len()
    );

    TableCell {
        fz_center,
        temp_center,
        wear_at_build: wear,
        grid_n: n,
        samples,
        hull,
    }
}

/// Forward model at the cell's operating point: force law + allocator.
fn evaluate(
    p: &ParameterSet,
    combined: &CombinedSlipConfig,
    fz: f32,
    temp: f32,
    wear: f32,
    kappa: f32,
    alpha: f32,
) -> Point2<f32> {
    let unc = uncombined_forces(p, fz, kappa, alpha, temp, wear);
    let grip = crate::steady_state::grip_scaling(p, temp, wear);
    let (fx, fy) = allocate(p, combined, &unc, kappa, alpha, fz, grip);
    Point2::new(fx, fy)
}

fn lookup(
    p: &ParameterSet,
    combined: &CombinedSlipConfig,
    cfg: &InverseTableConfig,
    cell: &TableCell,
    request: Point2<f32>,
) -> InverseSolution {
    // A bucket centered below the contact threshold produces no force at all.
    if cell.fz_center < FZ_MIN {
        let feasible = request.coords.norm() < 1.0;
        return InverseSolution {
            fx: 0.0,
            fy: 0.0,
            kappa: 0.0,
            alpha: 0.0,
            feasible,
        };
    }

    let feasible = point_in_hull(&cell.hull, request);
    let target = if feasible {
        request
    } else {
        project_to_hull(&cell.hull, request)
    };

    // Nearest grid sample in force space.
    let n = cell.grid_n;
    let mut best = 0usize;
    let mut best_d2 = f32::INFINITY;
    for (idx, s) in cell.samples.iter().enumerate() {
        let d2 = (s.force - target).norm_squared();
        if d2 < best_d2 {
            best_d2 = d2;
            best = idx;
        }
    }
    let (bi, bj) = (best / n, best % n);

    // Local refinement: finite-difference Jacobian from the neighboring
    // samples, then a few Gauss-Newton steps clamped to one grid cell each.
    let dk = 2.0 * cfg.kappa_range / (n - 1) as f32;
    let da = 2.0 * cfg.alpha_range / (n - 1) as f32;

    let at = |i: usize, j: usize| cell.samples[i * n + j].force;
    let (ik0, ik1) = neighbor_pair(bi, n);
    let (ja0, ja1) = neighbor_pair(bj, n);
    let dfk = (at(ik1, bj) - at(ik0, bj)) / ((ik1 - ik0) as f32 * dk);
    let dfa = (at(bi, ja1) - at(bi, ja0)) / ((ja1 - ja0) as f32 * da);
    let jac = Matrix2::from_columns(&[dfk, dfa]);

    let start = &cell.samples[best];
    let mut kappa = start.kappa;
    let mut alpha = start.alpha;
    let mut force = start.force;

    if let Some(inv) = jac.try_inverse() {
        for _ in 0..3 {
            let step: Vector2<f32> = inv * (target - force);
            kappa = (kappa + step.x.clamp(-dk, dk)).clamp(-cfg.kappa_range, cfg.kappa_range);
            alpha = (alpha + step.y.clamp(-da, da)).clamp(-cfg.alpha_range, cfg.alpha_range);
            force = evaluate(
                p,
                combined,
                cell.fz_center,
                cell.temp_center,
                cell.wear_at_build,
                kappa,
                alpha,
            );
        }
    }

    InverseSolution {
        fx: force.x,
        fy: force.y,
        kappa,
        alpha,
        feasible,
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Central-difference neighbor indices, one-sided at the grid edges.
#[inline]
fn neighbor_pair(i: usize, n: usize) -> (usize, usize) {
    (i.saturating_sub(1), (i + 1).min(n - 1))
}

// --------------------------------------------------------------------------
// 2-D convex hull (Andrew's monotone chain) + point queries
// --------------------------------------------------------------------------

#[inline]
fn cross(o: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// CCW convex hull. Collinear points are dropped.
fn convex_hull(points: impl Iterator<Item = Point2<f32>>) -> Vec<Point2<f32>> {
    let mut pts: Vec<Point2<f32>> = points.filter(|p| p.x.is_finite() && p.y.is_finite()).collect();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup_by(|a, b| (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6);

    if pts.len() < 3 {
        return pts;
    }

    let mut hull: Vec<Point2<f32>> = Vec::with_capacity(pts.len() + 1);

    // lower chain
    for &pt in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], pt) <= 0.0 {
            hull.pop();
        }
        hull.push(pt);
    }
    // upper chain
    let lower_len = hull.len() + 1;
    for &pt in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(hull[hull.len() - 2], hull[hull.len() - 1], pt) <= 0.0
        {
            hull.pop();
        }
        hull.push(pt);
    }
    hull.pop(); // last point repeats the first
    hull
}

fn point_in_hull(hull: &[Point2<f32>], pt: Point2<f32>) -> bool {
    if hull.len() < 3 {
        return false;
    }
    // tolerance scaled to the hull extent; forces are in the thousands of N
    let span = hull
        .iter()
        .map(|h| h.coords.norm())
        .fold(0.0f32, f32::max)
        .max(1.0);
    let eps = -1e-5 * span * span;
    for i in 0..hull.len() {
        let a = hull[i];
        let b = hull[(i + 1) % hull.len()];
        if cross(a, b, pt) < eps {
            return false;
        }
    }
    true
}

/// Closest point on the hull boundary to an exterior point.
fn project_to_hull(hull: &[Point2<f32>], pt: Point2<f32>) -> Point2<f32> {
    if hull.is_empty() {
        return Point2::origin();
    }
    if hull.len() == 1 {
        return hull[0];
    }

    let mut best = hull[0];
    let mut best_d2 = f32::INFINITY;
    for i in 0..hull.len() {
        let a = hull[i];
        let b = hull[(i + 1) % hull.len()];
        let ab = b - a;
        let len2 = ab.norm_squared();
        let t = if len2 > 1e-12 {
            ((pt - a).dot(&ab) / len2).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let q = a + ab * t;
        let d2 = (pt - q).norm_squared();
        if d2 < best_d2 {
            best_d2 = d2;
            best = q;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> ParameterSet {
        ParameterSet::default()
    }

    #[test]
    fn hull_of_square_contains_center() {
        let pts = [
            Point2::new(-1.0, -1.0),
            Point2::new(1.0, -1.0),
            Point2::new(1.0, 1.0),
            Point2::new(-1.0, 1.0),
            Point2::new(0.0, 0.0),
        ];
        let hull = convex_hull(pts.iter().copied());
        assert_eq!(hull.len(), 4);
        assert!(point_in_hull(&hull, Point2::new(0.2, -0.3)));
        assert!(!point_in_hull(&hull, Point2::new(1.5, 0.0)));
    }

    #[test]
    fn projection_lands_on_boundary() {
        let pts = [
            Point2::new(-1.0, -1.0),
            Point2::new(1.0, -1.0),
            Point2::new(1.0, 1.0),
            Point2::new(-1.0, 1.0),
        ];
        let hull = convex_hull(pts.iter().copied());
        let q = project_to_hull(&hull, Point2::new(0.0, 3.0));
        assert_relative_eq!(q.y, 1.0, epsilon = 1e-5);
        assert!(q.x.abs() <= 1.0 + 1e-5);
    }

    #[test]
    fn cells_are_cached_and_bucketed() {
        let p = params();
        let combined = CombinedSlipConfig::default();
        let mut table = InverseTable::new(InverseTableConfig {
            grid_n: 21,
            ..InverseTableConfig::default()
        });

        table.solve(&p, &combined, 4500.0, 85.0, 0.0, 500.0, 500.0);
        assert_eq!(table.built_cells(), 1);
        // same bucket, no new cell
        table.solve(&p, &combined, 4600.0, 87.0, 0.0, -500.0, 200.0);
        assert_eq!(table.built_cells(), 1);
        // different load bucket
        table.solve(&p, &combined, 3000.0, 85.0, 0.0, 500.0, 500.0);
        assert_eq!(table.built_cells(), 2);
    }

    #[test]
    fn wear_drift_rebuilds_in_place() {
        let p = params();
        let combined = CombinedSlipConfig::default();
        let mut table = InverseTable::new(InverseTableConfig {
            grid_n: 21,
            ..InverseTableConfig::default()
        });
        table.solve(&p, &combined, 4500.0, 85.0, 0.0, 1000.0, 0.0);
        let before = table.built_cells();
        // past the threshold: rebuilt, not duplicated
        table.solve(&p, &combined, 4500.0, 85.0, 0.2, 1000.0, 0.0);
        assert_eq!(table.built_cells(), before);
    }

    #[test]
    fn interior_request_round_trips() {
        let p = params();
        let combined = CombinedSlipConfig::default();
        let mut table = InverseTable::new(InverseTableConfig::default());

        let sol = table.solve(&p, &combined, 4500.0, 85.0, 0.0, 800.0, -2000.0);
        assert!(sol.feasible);

        // the forward model at the returned slip reproduces the request
        let f = evaluate(&p, &combined, 4500.0, 90.0, 0.0, sol.kappa, sol.alpha);
        assert!((f.x - 800.0).abs() < 150.0, "fx = {}", f.x);
        assert!((f.y + 2000.0).abs() < 150.0, "fy = {}", f.y);
    }

    #[test]
    fn unreachable_request_reports_boundary() {
        let p = params();
        let combined = CombinedSlipConfig::default();
        let mut table = InverseTable::new(InverseTableConfig::default());

        // peak |Fy| at 4500 N and optimal temperature is D = 5940 N; ask for
        // 20% more than that
        let sol = table.solve(&p, &combined, 4500.0, 85.0, 0.0, 0.0, 5940.0 * 1.2);
        assert!(!sol.feasible);
        assert_relative_eq!(sol.fy, 5940.0, max_relative = 0.04);
        assert!(sol.fx.abs() < 400.0);
    }
}
