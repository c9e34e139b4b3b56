// ==============================================================================
// transient.rs — TRANSIENT SLIP (first-order carcass lag)
// ==============================================================================
// Contact-patch deflection takes finite distance to build up, so the slip
// the carcass actually transmits lags the kinematic slip:
//
//     u' = -Vx * u / sigma_k + Vx * kappa        kappa' = u / sigma_k
//     v' = -Vx * v / sigma_a + Vx * tan(alpha)   alpha' = atan(v / sigma_a)
//
// Relaxation lengths come from slip stiffness over carcass stiffness, so a
// stiffer carcass responds faster and a heavier-loaded tire slower:
//
//     sigma_k = p_Kx1 * Fz / C_Fx      sigma_a = p_Ky1 * Fz / C_Fy
//
// The lag is integrated with the exact exponential step
// (decay = exp(-|Vx| * dt / sigma)), which is monotone and overshoot-free
// for any dt. An explicit Euler step diverges once dt*Vx/sigma passes 2,
// which a lap simulator hits easily at straight-line speed.
//
// At near-zero rolling speed the relaxation dynamics degenerate (tau -> inf,
// slip ratios blow up), so below V_LOW the effective slip is taken directly
// from the command and the deflections snap to their steady values. That
// branch is required behavior, not an approximation of convenience.
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::params::ParameterSet;
use crate::types::{KinematicInput, SlipCommand};

/// Below this rolling speed the lag is bypassed (direct slip computation).
pub const V_LOW: f32 = 0.5;

/// Floor for the relaxation lengths, so a light wheel still relaxes.
const SIGMA_MIN: f32 = 0.02;

/// Floor for |Vx| in slip-ratio denominators.
const VX_EPS: f32 = 0.01;

/// Carcass deflection state plus the derived effective slip. Owned by one
/// tire instance; mutated only through [`integrate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransientState {
    pub u: f32,         // longitudinal deflection [m]
    pub v: f32,         // lateral deflection [m]
    pub kappa_eff: f32, // effective slip ratio
    pub alpha_eff: f32, // effective slip angle [rad]
}

/// Commanded slip for one step, with the slip velocities the thermal model
/// needs for the dissipation term.
#[derive(Debug, Clone, Copy)]
pub struct SlipVelocities {
    pub vsx: f32,       // longitudinal slip velocity [m/s]
    pub vsy: f32,       // lateral slip velocity [m/s]
    pub kappa_cmd: f32, // commanded slip ratio
    pub alpha_cmd: f32, // commanded slip angle [rad]
}

/// Resolve the step's slip command into slip velocities + slip quantities.
pub fn command_slip(p: &ParameterSet, input: &KinematicInput) -> SlipVelocities {
    let vx_abs = input.vx.abs().max(VX_EPS);
    match input.slip {
        SlipCommand::FromVelocities => {
            let vsx = input.vx - input.omega * p.re;
            let vsy = input.vy;
            SlipVelocities {
                vsx,
                vsy,
                kappa_cmd: -vsx / vx_abs,
                alpha_cmd: -vsy.atan2(vx_abs),
            }
        }
        SlipCommand::Direct { kappa, alpha } => SlipVelocities {
            vsx: -kappa * vx_abs,
            vsy: -alpha.tan() * vx_abs,
            kappa_cmd: kappa,
            alpha_cmd: alpha,
        },
    }
}

fn relaxation_lengths(p: &ParameterSet, fz: f32) -> (f32, f32) {
    let sigma_k = (p.p_kx1 * fz / p.c_fx).max(SIGMA_MIN);
    let sigma_a = (p.p_ky1 * fz / p.c_fy).max(SIGMA_MIN);
    (sigma_k, sigma_a)
}

/// Advance the deflection state one timestep. Pure: returns the next state,
/// the caller commits it.
pub fn integrate(
    p: &ParameterSet,
    state: TransientState,
    slip: &SlipVelocities,
    vx: f32,
    fz: f32,
    dt: f32,
) -> TransientState {
    let (sigma_k, sigma_a) = relaxation_lengths(p, fz.max(0.0));
    let vx_abs = vx.abs();

    let u_target = slip.kappa_cmd * sigma_k;
    let v_target = slip.alpha_cmd.tan() * sigma_a;

    if vx_abs < V_LOW {
        // Degenerate kinematics: no meaningful relaxation distance is being
        // rolled through, answer with the commanded slip directly.
        return TransientState {
            u: u_target,
            v: v_target,
            kappa_eff: slip.kappa_cmd,
            alpha_eff: slip.alpha_cmd,
        };
    }

    let decay_k = (-vx_abs * dt / sigma_k).exp();
    let decay_a = (-vx_abs * dt / sigma_a).exp();

    let u = u_target + (state.u - u_target) * decay_k;
    let v = v_target + (state.v - v_target) * decay_a;

    TransientState {
        u,
        v,
        kappa_eff: u / sigma_k,
        alpha_eff: (v / sigma_a).atan(),
    }
}
