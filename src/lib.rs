//! mf-tire - Magic-Formula racing tire core (engine-agnostic)
//!
//! Steady-state force law, transient slip lag, thermal/wear state and a
//! precomputed force -> slip inverse table. Consumed by a lap-time simulator
//! that owns the vehicle, the track and the logging; this crate only turns
//! kinematic state into forces and keeps the tire's internal state.

pub mod combined;
pub mod error;
pub mod inverse;
pub mod params;
pub mod steady_state;
pub mod thermal;
pub mod tire;
pub mod transient;
pub mod types;

pub use combined::CombinedSlipConfig;
pub use error::TireError;
pub use inverse::{InverseSolution, InverseTable, InverseTableConfig};
pub use params::ParameterSet;
pub use thermal::ThermalWearState;
pub use tire::{MaxForceInfo, StepOutput, Tire, TireSnapshot};
pub use transient::TransientState;
pub use types::{ForceResult, KinematicInput, SlipCommand};
