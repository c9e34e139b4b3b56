// ==============================================================================
// tire.rs — TIRE INSTANCE (orchestrates the per-step pipeline)
// ==============================================================================
// One Tire owns one parameter set plus all mutable per-tire state. The fixed
// sub-step order is enforced here and only here:
//
//   validate input
//   -> resolve commanded slip
//   -> transient integrator            (previous deflection state)
//   -> steady-state force law          (current temperature/wear)
//   -> combined-slip allocator
//   -> aligning moment
//   -> thermal/wear update             (this step's dissipation)
//
// Every sub-result lands in a local first and the state is committed in one
// place at the end, so a rejected input leaves the tire untouched.
//
// Four instances per vehicle; each is independent and plain owned data, so
// the corners can be stepped on separate threads as long as each instance is
// driven by one caller at a time.
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::combined::{CombinedSlipConfig, allocate};
use crate::error::TireError;
use crate::inverse::{InverseSolution, InverseTable, InverseTableConfig};
use crate::params::ParameterSet;
use crate::steady_state::{aligning_moment, grip_scaling, longitudinal_force, uncombined_forces};
use crate::thermal::{self, ThermalWearState};
use crate::transient::{self, TransientState};
use crate::types::{FZ_MIN, ForceResult, KinematicInput};

/// One timestep's outputs plus a read-only view of the updated state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StepOutput {
    pub forces: ForceResult,
    pub kappa_eff: f32,
    pub alpha_eff: f32,
    pub temperature: f32,
    pub wear: f32,
}

/// Serializable state snapshot for an external logger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TireSnapshot {
    pub temperature: f32,
    pub wear: f32,
    pub kappa_eff: f32,
    pub alpha_eff: f32,
    pub last_forces: ForceResult,
}

/// Peak available longitudinal force under a given lateral demand.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MaxForceInfo {
    pub max_fx: f32,       // peak Fx with the combined-slip weighting applied [N]
    pub optimal_kappa: f32,
    pub max_fx_pure: f32,  // peak Fx with no lateral slip [N]
    pub limited_by_lateral: bool,
}

pub struct Tire {
    params: ParameterSet,
    combined: CombinedSlipConfig,
    transient: TransientState,
    thermal: ThermalWearState,
    inverse: InverseTable,
    last_forces: ForceResult,
}

impl Tire {
    pub fn new(params: ParameterSet) -> Result<Self, TireError> {
        Self::with_configs(
            params,
            CombinedSlipConfig::default(),
            InverseTableConfig::default(),
        )
    }

    pub fn with_configs(
        params: ParameterSet,
        combined: CombinedSlipConfig,
        inverse: InverseTableConfig,
    ) -> Result<Self, TireError> {
        params.validate()?;
        let thermal = ThermalWearState::new(params.ambient_temp);
        Ok(Self {
            params,
            combined,
            transient: TransientState::default(),
            thermal,
            inverse: InverseTable::new(inverse),
            last_forces: ForceResult::default(),
        })
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, TireError> {
        Self::new(ParameterSet::from_file(path)?)
    }

    /// Advance the tire one timestep and return the transmitted forces.
    pub fn step(&mut self, input: &KinematicInput) -> Result<StepOutput, TireError> {
        input.validate()?;

        let slip = transient::command_slip(&self.params, input);
        let next_transient = transient::integrate(
            &self.params,
            self.transient,
            &slip,
            input.vx,
            input.fz,
            input.dt,
        );

        // Current thermal state feeds the force law; this step's dissipation
        // only lands in the state afterwards.
        let forces = if input.fz < FZ_MIN {
            // airborne / unloaded: no force without load
            ForceResult::default()
        } else {
            let unc = uncombined_forces(
                &self.params,
                input.fz,
                next_transient.kappa_eff,
                next_transient.alpha_eff,
                self.thermal.temperature,
                self.thermal.wear,
            );
            let grip = grip_scaling(&self.params, self.thermal.temperature, self.thermal.wear);
            let (fx, fy) = allocate(
                &self.params,
                &self.combined,
                &unc,
                next_transient.kappa_eff,
                next_transient.alpha_eff,
                input.fz,
                grip,
            );
            let mz = aligning_moment(&self.params, fy, next_transient.alpha_eff);
            ForceResult { fx, fy, mz }
        };

        let next_thermal = thermal::update(&self.params, self.thermal, &forces, &slip, input.dt);

        // commit
        self.transient = next_transient;
        self.thermal = next_thermal;
        self.last_forces = forces;

        Ok(StepOutput {
            forces,
            kappa_eff: next_transient.kappa_eff,
            alpha_eff: next_transient.alpha_eff,
            temperature: next_thermal.temperature,
            wear: next_thermal.wear,
        })
    }

    /// Inverse query: the slip state that yields the requested force, and
    /// whether the request is achievable at all. `temperature` defaults to
    /// the tire's current internal temperature.
    pub fn request_forces(
        &mut self,
        fz: f32,
        fx_req: f32,
        fy_req: f32,
        temperature: Option<f32>,
    ) -> Result<InverseSolution, TireError> {
        if !fz.is_finite() || fz < 0.0 {
            return Err(TireError::invalid_input(format!(
                "Fz must be finite and >= 0, got {fz}"
            )));
        }
        if !(fx_req.is_finite() && fy_req.is_finite()) {
            return Err(TireError::invalid_input("requested forces must be finite"));
        }
        let temp = temperature.unwrap_or(self.thermal.temperature);
        if !temp.is_finite() {
            return Err(TireError::invalid_input("temperature must be finite"));
        }

        if fz < FZ_MIN {
            let feasible = fx_req == 0.0 && fy_req == 0.0;
            return Ok(InverseSolution {
                fx: 0.0,
                fy: 0.0,
                kappa: 0.0,
                alpha: 0.0,
                feasible,
            });
        }

        Ok(self.inverse.solve(
            &self.params,
            &self.combined,
            fz,
            temp,
            self.thermal.wear,
            fx_req,
            fy_req,
        ))
    }

    /// Sweep kappa for the peak available Fx under the current lateral slip,
    /// the way the velocity-profile planner asks "how hard can I still
    /// accelerate mid-corner".
    pub fn max_longitudinal_force(
        &self,
        fz: f32,
        alpha: f32,
        temperature: Option<f32>,
    ) -> MaxForceInfo {
        let temp = temperature.unwrap_or(self.thermal.temperature);
        let grip = grip_scaling(&self.params, temp, self.thermal.wear);
        let limited_by_lateral = alpha.abs() > 0.01;
        let gx = crate::combined::weight_gx(&self.params, alpha);

        let mut max_fx = 0.0f32;
        let mut max_fx_pure = 0.0f32;
        let mut optimal_kappa = 0.0f32;

        const SWEEP_N: usize = 50;
        for i in 0..SWEEP_N {
            let kappa = 0.01 + (0.30 - 0.01) * i as f32 / (SWEEP_N - 1) as f32;
            let fx_pure = longitudinal_force(&self.params, fz, kappa, grip);
            let fx = if limited_by_lateral { fx_pure * gx } else { fx_pure };
            max_fx_pure = max_fx_pure.max(fx_pure);
            if fx > max_fx {
                max_fx = fx;
                optimal_kappa = kappa;
            }
        }

        MaxForceInfo {
            max_fx,
            optimal_kappa,
            max_fx_pure,
            limited_by_lateral,
        }
    }

    /// Slip ratio at which the available Fx peaks.
    pub fn optimal_slip_ratio(&self, fz: f32, alpha: f32, temperature: Option<f32>) -> f32 {
        self.max_longitudinal_force(fz, alpha, temperature).optimal_kappa
    }

    /// Zero the transient and thermal/wear state. Parameters and any inverse
    /// cells already built are kept.
    pub fn reset(&mut self) {
        self.transient = TransientState::default();
        self.thermal = ThermalWearState::new(self.params.ambient_temp);
        self.last_forces = ForceResult::default();
    }

    // ----- read-only accessors for the external logger -----

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn temperature(&self) -> f32 {
        self.thermal.temperature
    }

    pub fn wear(&self) -> f32 {
        self.thermal.wear
    }

    pub fn last_forces(&self) -> ForceResult {
        self.last_forces
    }

    /// Effective (lagged) slip from the last step: (kappa', alpha').
    pub fn effective_slip(&self) -> (f32, f32) {
        (self.transient.kappa_eff, self.transient.alpha_eff)
    }

    pub fn snapshot(&self) -> TireSnapshot {
        TireSnapshot {
            temperature: self.thermal.temperature,
            wear: self.thermal.wear,
            kappa_eff: self.transient.kappa_eff,
            alpha_eff: self.transient.alpha_eff,
            last_forces: self.last_forces,
        }
    }
}
