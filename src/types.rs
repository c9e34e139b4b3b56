//! Core shared types for the tire model (engine-agnostic).

use serde::{Deserialize, Serialize};

use crate::error::TireError;

/// Normal load below which the contact patch carries nothing useful and all
/// forces are zero.
pub const FZ_MIN: f32 = 50.0;

/// How the commanded slip for one step is supplied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum SlipCommand {
    /// Derive slip from the kinematics: `Vsx = Vx - omega * R_e`, `Vsy = Vy`.
    FromVelocities,
    /// Slip ratio / angle given directly (e.g. a prescribed test sweep).
    Direct { kappa: f32, alpha: f32 },
}

/// Kinematic state of one wheel for one timestep. Produced externally.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KinematicInput {
    pub fz: f32,    // normal load [N]
    pub vx: f32,    // longitudinal velocity at the contact patch [m/s]
    pub vy: f32,    // lateral velocity [m/s]
    pub omega: f32, // wheel angular velocity [rad/s]
    pub slip: SlipCommand,
    pub dt: f32,    // timestep [s]
}

impl KinematicInput {
    /// All-or-nothing gate: runs before any state mutation.
    pub fn validate(&self) -> Result<(), TireError> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(TireError::invalid_input(format!(
                "dt must be finite and > 0, got {}",
                self.dt
            )));
        }
        if !self.fz.is_finite() || self.fz < 0.0 {
            return Err(TireError::invalid_input(format!(
                "Fz must be finite and >= 0, got {}",
                self.fz
            )));
        }
        if !(self.vx.is_finite() && self.vy.is_finite() && self.omega.is_finite()) {
            return Err(TireError::invalid_input("Vx/Vy/omega must be finite"));
        }
        if let SlipCommand::Direct { kappa, alpha } = self.slip {
            if !(kappa.is_finite() && alpha.is_finite()) {
                return Err(TireError::invalid_input("kappa/alpha must be finite"));
            }
        }
        Ok(())
    }
}

/// Forces and moment from one evaluation. Returned per call, never stored as
/// authoritative state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ForceResult {
    pub fx: f32, // longitudinal force [N]
    pub fy: f32, // lateral force [N]
    pub mz: f32, // aligning moment [N·m]
}
