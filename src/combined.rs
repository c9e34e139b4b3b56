// ==============================================================================
// combined.rs — COMBINED-SLIP ALLOCATOR (friction ellipse weighting)
// ==============================================================================
// Semi-empirical cosine weighting: each axis's force shrinks as the OTHER
// axis's slip grows,
//
//     Fx = Fx0 * cos(r_Bx1 * |alpha|)
//     Fy = Fy0 * cos(r_By1 * |kappa|)
//
// The weighting functions are the sole mechanism bounding the combined
// demand; no secondary renormalization is applied on top (|cos| <= 1 already
// guarantees |Fx| <= |Fx0| and |Fy| <= |Fy0|). An optional hard clamp of the
// resultant to the peak-mu circle exists as an opt-in extension point for
// callers that want a literal force circle; it is off in the default config.
// ==============================================================================

use crate::params::ParameterSet;
use crate::steady_state::UncombinedForces;

#[derive(Debug, Clone, Copy)]
pub struct CombinedSlipConfig {
    /// Opt-in secondary clamp of the resultant to mu_peak * Fz.
    pub circle_clamp: bool,
}

impl Default for CombinedSlipConfig {
    fn default() -> Self {
        Self { circle_clamp: false }
    }
}

/// Weighting applied to Fx0 as lateral slip grows.
#[inline]
pub fn weight_gx(p: &ParameterSet, alpha: f32) -> f32 {
    (p.r_bx1 * alpha.abs()).cos()
}

/// Weighting applied to Fy0 as longitudinal slip grows.
#[inline]
pub fn weight_gy(p: &ParameterSet, kappa: f32) -> f32 {
    (p.r_by1 * kappa.abs()).cos()
}

/// Apply the combined-slip weighting to the pure-slip forces.
pub fn allocate(
    p: &ParameterSet,
    cfg: &CombinedSlipConfig,
    unc: &UncombinedForces,
    kappa: f32,
    alpha: f32,
    fz: f32,
    grip: f32,
) -> (f32, f32) {
    let mut fx = unc.fx0 * weight_gx(p, alpha);
    let mut fy = unc.fy0 * weight_gy(p, kappa);

    if cfg.circle_clamp && fz > 0.0 {
        let mu_peak = (p.p_dx1 * p.lambda_mux).max(p.p_dy1.abs() * p.lambda_muy) * grip;
        let radius = (mu_peak * fz).max(1e-6);
        let n = (fx * fx + fy * fy).sqrt() / radius;
        if n > 1.0 {
            fx /= n;
            fy /= n;
        }
    }

    (fx, fy)
}
