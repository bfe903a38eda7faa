//! Free (torque-free) rotation of a rigid body with unequal principal
//! moments of inertia: the classical Euler top and its intermediate-axis
//! ("tennis-racket") instability.
//!
//! The orientation is advanced with a quaternion exponential-map step driven
//! by the conserved world-frame angular momentum, and a nonlinear projection
//! then pulls the body-frame momentum back onto the intersection of the
//! momentum sphere and the energy ellipsoid, so neither conserved quantity
//! drifts over long horizons.
//!
//! [`Simulation`] is the entry point: construct it from [`SimOptions`],
//! call [`run`](Simulation::run) with a step and wall-clock budget from a
//! frame loop, and poll [`state`](Simulation::state) for the observables.

pub mod attitude;
pub mod corrector;
pub mod quat;
pub mod sim;

pub use attitude::AttitudeState;
pub use corrector::{CorrectionError, EllipsoidProjector, ProjectionOptions};
pub use sim::{DivergencePolicy, SimError, SimOptions, Simulation};
