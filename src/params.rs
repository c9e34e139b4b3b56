// ==============================================================================
// params.rs — TIRE PARAMETER SET (one compound/construction)
// ==============================================================================
// Immutable after construction; shared read-only by every component of one
// tire instance. Defaults describe a racing slick (Hoosier-class) at a
// 4500 N nominal load.
//
// File format (".tire"): one `key = value` pair per line, `%` starts a
// comment line, blank lines ignored. Keys use the conventional Magic-Formula
// spelling (p_Cx1, r_By1, ...). Unknown keys are skipped with a warning so a
// richer file can feed this reduced model.
// ==============================================================================

use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::TireError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    // ----- geometry / reference -----
    pub r0: f32,   // unloaded radius [m]
    pub re: f32,   // effective rolling radius [m]
    pub fz0: f32,  // nominal load [N]
    pub v0: f32,   // reference velocity [m/s]

    // ----- carcass stiffnesses (relaxation behaviour) -----
    pub c_fx: f32, // longitudinal carcass stiffness [N/m]
    pub c_fy: f32, // lateral carcass stiffness [N/m]

    // ----- longitudinal shape -----
    pub p_cx1: f32, // shape factor
    pub p_dx1: f32, // peak factor
    pub p_dx2: f32, // load dependency of peak factor
    pub p_ex1: f32, // curvature factor
    pub p_kx1: f32, // slip stiffness factor
    pub p_kx2: f32, // load dependency of slip stiffness

    // ----- lateral shape -----
    pub p_cy1: f32,
    pub p_dy1: f32,
    pub p_dy2: f32,
    pub p_ey1: f32,
    pub p_ky1: f32, // cornering stiffness factor
    pub p_ky2: f32, // load at which cornering stiffness peaks

    // ----- combined slip -----
    pub r_bx1: f32, // Fx reduction rate with |alpha|
    pub r_by1: f32, // Fy reduction rate with |kappa|

    // ----- thermal -----
    pub temp_opt: f32,         // optimal operating temperature [°C]
    pub temp_range: f32,       // effective range of the grip bell curve [°C]
    pub grip_temp_factor: f32, // grip loss per normalized deviation²
    pub ambient_temp: f32,     // [°C]; also the initial temperature
    pub heating_coeff: f32,    // [°C/s per W of slip power]
    pub cooling_rate: f32,     // [1/s], cooling ∝ (T - ambient)

    // ----- wear -----
    pub wear_constant: f32, // wear rate constant
    pub wear_exponent: f32, // sensitivity of wear (and grip loss) to slip

    // ----- grip scaling -----
    pub lambda_mux: f32,
    pub lambda_muy: f32,

    // ----- aligning moment (pneumatic trail) -----
    pub trail0: f32,         // trail at zero slip angle [m]
    pub trail_falloff: f32,  // |alpha| scale of the exponential decay [rad]
    pub mz_max: f32,         // clamp [N·m]
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            r0: 0.330,
            re: 0.315,
            fz0: 4500.0,
            v0: 30.0,

            c_fx: 500_000.0,
            c_fy: 180_000.0,

            p_cx1: 1.65,
            p_dx1: 1.35,
            p_dx2: -0.1,
            p_ex1: 0.5,
            p_kx1: 25.0,
            p_kx2: -0.2,

            p_cy1: 1.3,
            p_dy1: -1.1,
            p_dy2: -0.1,
            p_ey1: -0.8,
            p_ky1: 20.0,
            p_ky2: 1.5,

            r_bx1: 12.0,
            r_by1: 10.0,

            temp_opt: 85.0,
            temp_range: 30.0,
            grip_temp_factor: 0.2,
            ambient_temp: 20.0,
            heating_coeff: 8.0e-4,
            cooling_rate: 0.06,

            wear_constant: 0.05,
            wear_exponent: 2.0,

            lambda_mux: 1.2,
            lambda_muy: 1.2,

            trail0: 0.08,
            trail_falloff: 0.35,
            mz_max: 4500.0,
        }
    }
}

impl ParameterSet {
    /// Parse the `key = value` text format. Starts from the defaults, so a
    /// partial file only overrides what it names.
    pub fn parse(text: &str) -> Result<Self, TireError> {
        let mut p = Self::default();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('%') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(TireError::ParseError {
                    line: idx + 1,
                    reason: format!("expected `key = value`, got `{line}`"),
                });
            };

            let key = key.trim();
            let value: f32 = value.trim().parse().map_err(|e| TireError::ParseError {
                line: idx + 1,
                reason: format!("bad number for `{key}`: {e}"),
            })?;

            if !p.set(key, value) {
                warn!("ignoring unknown tire parameter `{key}`");
            }
        }

        p.validate()?;
        Ok(p)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TireError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    fn set(&mut self, key: &str, v: f32) -> bool {
        match key {
            "R_0" => self.r0 = v,
            "R_e" => self.re = v,
            "F_z0" => self.fz0 = v,
            "V_0" => self.v0 = v,
            "C_Fx" => self.c_fx = v,
            "C_Fy" => self.c_fy = v,
            "p_Cx1" => self.p_cx1 = v,
            "p_Dx1" => self.p_dx1 = v,
            "p_Dx2" => self.p_dx2 = v,
            "p_Ex1" => self.p_ex1 = v,
            "p_Kx1" => self.p_kx1 = v,
            "p_Kx2" => self.p_kx2 = v,
            "p_Cy1" => self.p_cy1 = v,
            "p_Dy1" => self.p_dy1 = v,
            "p_Dy2" => self.p_dy2 = v,
            "p_Ey1" => self.p_ey1 = v,
            "p_Ky1" => self.p_ky1 = v,
            "p_Ky2" => self.p_ky2 = v,
            "r_Bx1" => self.r_bx1 = v,
            "r_By1" => self.r_by1 = v,
            "temp_opt" => self.temp_opt = v,
            "temp_range" => self.temp_range = v,
            "grip_temp_factor" => self.grip_temp_factor = v,
            "ambient_temp" => self.ambient_temp = v,
            "heating_coeff" => self.heating_coeff = v,
            "cooling_rate" => self.cooling_rate = v,
            "wear_constant" => self.wear_constant = v,
            "wear_exponent" => self.wear_exponent = v,
            "lambda_mux" => self.lambda_mux = v,
            "lambda_muy" => self.lambda_muy = v,
            "trail0" => self.trail0 = v,
            "trail_falloff" => self.trail_falloff = v,
            "mz_max" => self.mz_max = v,
            _ => return false,
        }
        true
    }

    /// Reject parameter sets that would poison the model (NaN anywhere, zero
    /// where a divisor is needed, wrong signs on physical quantities).
    pub fn validate(&self) -> Result<(), TireError> {
        fn positive(key: &'static str, v: f32) -> Result<(), TireError> {
            if !v.is_finite() || v <= 0.0 {
                return Err(TireError::InvalidParameter {
                    key,
                    reason: format!("must be finite and > 0, got {v}"),
                });
            }
            Ok(())
        }
        fn finite(key: &'static str, v: f32) -> Result<(), TireError> {
            if !v.is_finite() {
                return Err(TireError::InvalidParameter {
                    key,
                    reason: "must be finite".into(),
                });
            }
            Ok(())
        }

        positive("R_0", self.r0)?;
        positive("R_e", self.re)?;
        positive("F_z0", self.fz0)?;
        positive("V_0", self.v0)?;
        positive("C_Fx", self.c_fx)?;
        positive("C_Fy", self.c_fy)?;
        positive("p_Cx1", self.p_cx1)?;
        positive("p_Dx1", self.p_dx1)?;
        positive("p_Kx1", self.p_kx1)?;
        positive("p_Cy1", self.p_cy1)?;
        positive("p_Ky1", self.p_ky1)?;
        positive("p_Ky2", self.p_ky2)?;
        positive("temp_range", self.temp_range)?;
        positive("lambda_mux", self.lambda_mux)?;
        positive("lambda_muy", self.lambda_muy)?;
        positive("trail_falloff", self.trail_falloff)?;

        // p_Dy1 is negative by SAE convention but must not be zero (it
        // divides the lateral stiffness factor).
        if !self.p_dy1.is_finite() || self.p_dy1 == 0.0 {
            return Err(TireError::InvalidParameter {
                key: "p_Dy1",
                reason: format!("must be finite and non-zero, got {}", self.p_dy1),
            });
        }

        finite("p_Dx2", self.p_dx2)?;
        finite("p_Ex1", self.p_ex1)?;
        finite("p_Kx2", self.p_kx2)?;
        finite("p_Dy2", self.p_dy2)?;
        finite("p_Ey1", self.p_ey1)?;
        finite("r_Bx1", self.r_bx1)?;
        finite("r_By1", self.r_by1)?;
        finite("temp_opt", self.temp_opt)?;
        finite("grip_temp_factor", self.grip_temp_factor)?;
        finite("ambient_temp", self.ambient_temp)?;
        finite("heating_coeff", self.heating_coeff)?;
        finite("cooling_rate", self.cooling_rate)?;
        finite("wear_constant", self.wear_constant)?;
        finite("wear_exponent", self.wear_exponent)?;
        finite("trail0", self.trail0)?;
        finite("mz_max", self.mz_max)?;

        if self.wear_constant < 0.0 || self.cooling_rate < 0.0 || self.heating_coeff < 0.0 {
            return Err(TireError::InvalidParameter {
                key: "wear_constant/cooling_rate/heating_coeff",
                reason: "must be >= 0".into(),
            });
        }

        Ok(())
    }
}
