// ==============================================================================
// steady_state.rs — MAGIC-FORMULA FORCE LAW (pure, no state)
// ==============================================================================
// Reduced-coefficient Magic Formula:
//
//     F = D * sin(C * atan(B*x - E*(B*x - atan(B*x))))
//
// with B (stiffness), C (shape), D (peak), E (curvature) derived per axis
// from the parameter set and the normalized load deviation dfz. The peak is
// additionally scaled by a temperature bell curve and a wear degradation
// factor; both are clamped so a ruined tire still has half its grip rather
// than none.
//
// Sign convention (SAE): positive slip angle -> negative lateral force. The
// lateral B comes out negative with the default coefficients; D uses |p_Dy1|.
//
// This is the unit the inverse table samples a few thousand times per cell,
// so it stays allocation-free and side-effect-free.
// ==============================================================================

use crate::params::ParameterSet;
use crate::types::FZ_MIN;

/// Uncombined (pure-slip) forces, before the combined-slip weighting.
#[derive(Debug, Clone, Copy, Default)]
pub struct UncombinedForces {
    pub fx0: f32,
    pub fy0: f32,
}

#[inline]
fn magic_formula(b: f32, c: f32, d: f32, e: f32, x: f32) -> f32 {
    let bx = b * x;
    d * (c * (bx - e * (bx - bx.atan())).atan()).sin()
}

/// Combined temperature/wear grip multiplier, in [0.25, 1.0].
///
/// Temperature: bell curve peaked at `temp_opt`, width `temp_range`, floor
/// 0.5. Wear: `(1 - wear)^wear_exponent`, floor 0.5, so grip degrades
/// monotonically as wear accumulates.
pub fn grip_scaling(p: &ParameterSet, temperature: f32, wear: f32) -> f32 {
    let dt = temperature - p.temp_opt;
    let temp_factor =
        (1.0 - p.grip_temp_factor * dt * dt / (p.temp_range * p.temp_range)).clamp(0.5, 1.0);

    let wear_factor = (1.0 - wear.clamp(0.0, 1.0))
        .powf(p.wear_exponent)
        .clamp(0.5, 1.0);

    temp_factor * wear_factor
}

/// Pure longitudinal force Fx0(kappa) at the given load and grip multiplier.
pub fn longitudinal_force(p: &ParameterSet, fz: f32, kappa: f32, grip: f32) -> f32 {
    if fz < FZ_MIN {
        return 0.0;
    }
    let dfz = (fz - p.fz0) / p.fz0;

    let b = p.p_kx1 * (1.0 + p.p_kx2 * dfz) / (p.p_cx1 * p.p_dx1);
    let c = p.p_cx1;
    let d = p.p_dx1 * fz * (1.0 + p.p_dx2 * dfz) * p.lambda_mux * grip;
    let e = p.p_ex1;

    magic_formula(b, c, d, e, kappa)
}

/// Pure lateral force Fy0(alpha) at the given load and grip multiplier.
pub fn lateral_force(p: &ParameterSet, fz: f32, alpha: f32, grip: f32) -> f32 {
    if fz < FZ_MIN {
        return 0.0;
    }
    let dfz = (fz - p.fz0) / p.fz0;

    let b = p.p_ky1 / (p.p_cy1 * p.p_dy1 * p.p_ky2);
    let c = p.p_cy1;
    let d = p.p_dy1.abs() * fz * (1.0 + p.p_dy2 * dfz) * p.lambda_muy * grip;
    let e = p.p_ey1;

    magic_formula(b, c, d, e, alpha)
}

/// Both pure-slip forces in one call.
pub fn uncombined_forces(
    p: &ParameterSet,
    fz: f32,
    kappa: f32,
    alpha: f32,
    temperature: f32,
    wear: f32,
) -> UncombinedForces {
    if fz < FZ_MIN {
        return UncombinedForces::default();
    }
    let grip = grip_scaling(p, temperature, wear);
    UncombinedForces {
        fx0: longitudinal_force(p, fz, kappa, grip),
        fy0: lateral_force(p, fz, alpha, grip),
    }
}

/// Aligning moment from the lateral force via an exponentially decaying
/// pneumatic trail: trail(|alpha|) = trail0 * exp(-|alpha|/falloff),
/// Mz = -Fy * trail, clamped to ±mz_max.
pub fn aligning_moment(p: &ParameterSet, fy: f32, alpha: f32) -> f32 {
    let trail = p.trail0 * (-alpha.abs() / p.trail_falloff).exp();
    (-fy * trail).clamp(-p.mz_max, p.mz_max)
}

/// Peak lateral force magnitude at this load/grip. For C > 1 the formula
/// reaches its peak factor D exactly at finite slip.
pub fn peak_lateral_force(p: &ParameterSet, fz: f32, grip: f32) -> f32 {
    if fz < FZ_MIN {
        return 0.0;
    }
    let dfz = (fz - p.fz0) / p.fz0;
    (p.p_dy1.abs() * fz * (1.0 + p.p_dy2 * dfz) * p.lambda_muy * grip).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rstest::rstest;

    fn params() -> ParameterSet {
        ParameterSet::default()
    }

    #[test]
    fn no_load_no_force() {
        let p = params();
        let f = uncombined_forces(&p, 0.0, 0.1, 0.1, p.temp_opt, 0.0);
        assert_eq!(f.fx0, 0.0);
        assert_eq!(f.fy0, 0.0);
        // below the contact threshold too
        let f = uncombined_forces(&p, 30.0, 0.1, 0.1, p.temp_opt, 0.0);
        assert_eq!(f.fx0, 0.0);
        assert_eq!(f.fy0, 0.0);
    }

    #[test]
    fn zero_slip_zero_force() {
        let p = params();
        let f = uncombined_forces(&p, 4500.0, 0.0, 0.0, p.temp_opt, 0.0);
        assert_abs_diff_eq!(f.fx0, 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(f.fy0, 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(aligning_moment(&p, f.fy0, 0.0), 0.0, epsilon = 1e-3);
    }

    #[rstest]
    #[case(0.02)]
    #[case(0.08)]
    #[case(0.25)]
    fn force_law_is_odd(#[case] slip: f32) {
        let p = params();
        let grip = grip_scaling(&p, p.temp_opt, 0.0);
        assert_relative_eq!(
            longitudinal_force(&p, 4500.0, -slip, grip),
            -longitudinal_force(&p, 4500.0, slip, grip),
            max_relative = 1e-5
        );
        assert_relative_eq!(
            lateral_force(&p, 4500.0, -slip, grip),
            -lateral_force(&p, 4500.0, slip, grip),
            max_relative = 1e-5
        );
    }

    #[test]
    fn lateral_force_matches_closed_form_at_small_angle() {
        // Hand-evaluated with the default coefficients at Fz = Fz0:
        //   B = 20/(1.3 * -1.1 * 1.5) = -9.3240, D = 1.1*4500*1.2 = 5940
        //   Fy(0.05) = 5940 * sin(1.3 * atan(-0.4902)) ≈ -3316 N
        let p = params();
        let fy = lateral_force(&p, 4500.0, 0.05, 1.0);
        assert_relative_eq!(fy, -3316.0, max_relative = 0.01);
    }

    #[test]
    fn lateral_peak_reaches_peak_factor() {
        let p = params();
        let grip = grip_scaling(&p, p.temp_opt, 0.0);
        let mut peak = 0.0f32;
        for i in 0..=400 {
            let alpha = 0.4 * i as f32 / 400.0;
            peak = peak.max(lateral_force(&p, 4500.0, alpha, grip).abs());
        }
        assert_relative_eq!(peak, peak_lateral_force(&p, 4500.0, grip), max_relative = 0.01);
    }

    #[test]
    fn grip_scaling_bell_and_floors() {
        let p = params();
        assert_relative_eq!(grip_scaling(&p, p.temp_opt, 0.0), 1.0);
        // symmetric around the optimum
        assert_relative_eq!(
            grip_scaling(&p, p.temp_opt - 20.0, 0.0),
            grip_scaling(&p, p.temp_opt + 20.0, 0.0),
            max_relative = 1e-6
        );
        // floors: ice-cold and fully worn still keep a quarter of the grip
        assert!(grip_scaling(&p, -100.0, 5.0) >= 0.25 - 1e-6);
        // more wear, less grip
        assert!(grip_scaling(&p, p.temp_opt, 0.2) < grip_scaling(&p, p.temp_opt, 0.1));
    }

    #[test]
    fn aligning_moment_opposes_lateral_force() {
        let p = params();
        let fy = lateral_force(&p, 4500.0, 0.05, 1.0);
        let mz = aligning_moment(&p, fy, 0.05);
        // fy is negative at positive alpha, so the moment is positive
        assert!(fy < 0.0);
        assert!(mz > 0.0);
        assert!(mz.abs() <= p.mz_max);
        // trail shrinks with slip angle
        let mz_big = aligning_moment(&p, fy, 0.4);
        assert!(mz_big.abs() < mz.abs());
    }
}
