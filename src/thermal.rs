// ==============================================================================
// thermal.rs — TEMPERATURE + WEAR STATE
// ==============================================================================
// Dissipated slip power heats the tread; Newton cooling pulls it back toward
// ambient. Wear integrates the same power, normalized by the reference power
// Fz0*V0 so the exponent acts on a dimensionless quantity, and never goes
// down. Both feed back into the force law on the NEXT evaluation only; the
// step pipeline reads this state, computes forces, then calls update().
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::params::ParameterSet;
use crate::transient::SlipVelocities;
use crate::types::ForceResult;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalWearState {
    pub temperature: f32, // [°C], never below ambient
    pub wear: f32,        // dimensionless, monotonically non-decreasing
}

impl ThermalWearState {
    pub fn new(ambient: f32) -> Self {
        Self {
            temperature: ambient,
            wear: 0.0,
        }
    }
}

/// Slip power dissipated in the contact patch, both axes [W].
pub fn slip_power(forces: &ForceResult, slip: &SlipVelocities) -> f32 {
    (forces.fx * slip.vsx).abs() + (forces.fy * slip.vsy).abs()
}

/// Advance temperature and wear one timestep. Pure: returns the next state.
pub fn update(
    p: &ParameterSet,
    state: ThermalWearState,
    forces: &ForceResult,
    slip: &SlipVelocities,
    dt: f32,
) -> ThermalWearState {
    let power = slip_power(forces, slip);

    let heating = p.heating_coeff * power;
    let cooling = p.cooling_rate * (state.temperature - p.ambient_temp);
    let temperature = (state.temperature + dt * (heating - cooling)).max(p.ambient_temp);

    let e_norm = power / (p.fz0 * p.v0);
    let wear = state.wear + p.wear_constant * e_norm.powf(p.wear_exponent) * dt;

    ThermalWearState { temperature, wear }
}
